//! Vorbis-style audio identification header.
//!
//! The header is a fixed 30-byte record, little-endian throughout:
//!
//! ```text
//! 0      type code (1)
//! 1..7   "vorbis"
//! 7..11  version (0)
//! 11     channels
//! 12..16 sample rate
//! 16..28 bitrate upper / nominal / lower (signed)
//! 28     blocksize exponents (low nibble = short, high nibble = long)
//! 29     framing bit
//! ```

use crate::av::{CodecData, CodecType, HeaderRole};
use crate::error::{Result, XiphError};
use crate::utils::ByteReader;
use bytes::{BufMut, Bytes, BytesMut};


/// Magic following the type code of every header packet.
pub const VORBIS_MAGIC: &[u8; 6] = b"vorbis";

/// Type codes of the three header packets.
pub const HEADER_CODES: [(u8, HeaderRole); 3] = [
    (0x01, HeaderRole::Identification),
    (0x03, HeaderRole::Comments),
    (0x05, HeaderRole::Setup),
];

/// Encoded size of the identification header.
pub const IDENTIFICATION_SIZE: usize = 30;

const MIN_BLOCKSIZE_EXP: u8 = 6;
const MAX_BLOCKSIZE_EXP: u8 = 13;

/// Decoded Vorbis identification header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VorbisInfo {
    /// Audio channel count, never zero.
    pub channels: u8,
    /// Samples per second, never zero.
    pub sample_rate: u32,
    /// Upper bitrate hint, 0 if unset.
    pub bitrate_upper: i32,
    /// Nominal bitrate hint, 0 if unset.
    pub bitrate_nominal: i32,
    /// Lower bitrate hint, 0 if unset.
    pub bitrate_lower: i32,
    blocksize0_exp: u8,
    blocksize1_exp: u8,
}

impl VorbisInfo {
    /// Creates a header with unset bitrate hints and 256/2048 block sizes.
    pub fn new(channels: u8, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
            bitrate_upper: 0,
            bitrate_nominal: 0,
            bitrate_lower: 0,
            blocksize0_exp: 8,
            blocksize1_exp: 11,
        }
    }

    /// Sets the three bitrate hints.
    pub fn with_bitrates(mut self, upper: i32, nominal: i32, lower: i32) -> Self {
        self.bitrate_upper = upper;
        self.bitrate_nominal = nominal;
        self.bitrate_lower = lower;
        self
    }

    /// Sets the short and long block sizes in samples.
    ///
    /// Both must be powers of two between 64 and 8192, short <= long.
    pub fn with_blocksizes(mut self, blocksize0: usize, blocksize1: usize) -> Result<Self> {
        let exp0 = blocksize_exponent(blocksize0)?;
        let exp1 = blocksize_exponent(blocksize1)?;
        check_blocksize_exponents(exp0, exp1)?;
        self.blocksize0_exp = exp0;
        self.blocksize1_exp = exp1;
        Ok(self)
    }

    /// Short block size in samples.
    pub fn blocksize0(&self) -> usize {
        1 << self.blocksize0_exp
    }

    /// Long block size in samples.
    pub fn blocksize1(&self) -> usize {
        1 << self.blocksize1_exp
    }

    /// Playback time of a granule position (a sample count).
    pub fn granule_to_seconds(&self, granule: u64) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        granule as f64 / self.sample_rate as f64
    }

    /// Decodes a full identification packet, type code and magic included.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let code = reader.read_u8()?;
        let magic = reader.read_slice(VORBIS_MAGIC.len())?;
        if code != HEADER_CODES[0].0 || magic != VORBIS_MAGIC {
            return Err(XiphError::MalformedMagic {
                codec: CodecType::Vorbis,
                expected: HeaderRole::Identification,
            });
        }

        let version = reader.read_u32_le()?;
        if version != 0 {
            return Err(XiphError::UnsupportedVersion {
                codec: CodecType::Vorbis,
                version,
            });
        }

        let channels = reader.read_u8()?;
        let sample_rate = reader.read_u32_le()?;
        let bitrate_upper = reader.read_i32_le()?;
        let bitrate_nominal = reader.read_i32_le()?;
        let bitrate_lower = reader.read_i32_le()?;
        let blocksizes = reader.read_u8()?;
        let framing = reader.read_u8()?;

        check_stream_params(channels, sample_rate)?;

        let blocksize0_exp = blocksizes & 0x0F;
        let blocksize1_exp = blocksizes >> 4;
        check_blocksize_exponents(blocksize0_exp, blocksize1_exp)?;

        if framing != 1 {
            return Err(XiphError::InvalidFraming(framing));
        }

        Ok(Self {
            channels,
            sample_rate,
            bitrate_upper,
            bitrate_nominal,
            bitrate_lower,
            blocksize0_exp,
            blocksize1_exp,
        })
    }

    /// Encodes the identification packet.
    ///
    /// Fails on values the decoder would reject.
    pub fn to_bytes(&self) -> Result<Bytes> {
        check_stream_params(self.channels, self.sample_rate)?;
        check_blocksize_exponents(self.blocksize0_exp, self.blocksize1_exp)?;

        let mut buf = BytesMut::with_capacity(IDENTIFICATION_SIZE);
        buf.put_u8(HEADER_CODES[0].0);
        buf.put_slice(VORBIS_MAGIC);
        buf.put_u32_le(0);
        buf.put_u8(self.channels);
        buf.put_u32_le(self.sample_rate);
        buf.put_i32_le(self.bitrate_upper);
        buf.put_i32_le(self.bitrate_nominal);
        buf.put_i32_le(self.bitrate_lower);
        buf.put_u8((self.blocksize1_exp << 4) | self.blocksize0_exp);
        buf.put_u8(1);
        Ok(buf.freeze())
    }
}

impl CodecData for VorbisInfo {
    fn codec_type(&self) -> CodecType {
        CodecType::Vorbis
    }
    fn width(&self) -> Option<u32> {
        None
    }
    fn height(&self) -> Option<u32> {
        None
    }
    fn sample_rate(&self) -> Option<u32> {
        Some(self.sample_rate)
    }
    fn channels(&self) -> Option<u8> {
        Some(self.channels)
    }
}

fn blocksize_exponent(size: usize) -> Result<u8> {
    if !size.is_power_of_two() {
        return Err(XiphError::InvalidData(format!(
            "block size {} is not a power of two",
            size
        )));
    }
    u8::try_from(size.trailing_zeros())
        .map_err(|_| XiphError::InvalidData(format!("block size {} is too large", size)))
}

fn check_stream_params(channels: u8, sample_rate: u32) -> Result<()> {
    if channels == 0 || sample_rate == 0 {
        return Err(XiphError::InvalidData(format!(
            "vorbis header with {} channels at {} Hz",
            channels, sample_rate
        )));
    }
    Ok(())
}

fn check_blocksize_exponents(exp0: u8, exp1: u8) -> Result<()> {
    let range = MIN_BLOCKSIZE_EXP..=MAX_BLOCKSIZE_EXP;
    if !range.contains(&exp0) || !range.contains(&exp1) || exp0 > exp1 {
        return Err(XiphError::InvalidData(format!(
            "invalid vorbis block sizes 2^{} / 2^{}",
            exp0, exp1
        )));
    }
    Ok(())
}
