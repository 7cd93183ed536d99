//! Theora-style video identification header.
//!
//! A fixed 42-byte record with big-endian multi-byte fields. Frame
//! dimensions are stored in 16x16 macroblocks; the picture region inside the
//! frame is stored in pixels. The last two bytes pack the quality hint, the
//! key-frame granule shift and the pixel format.

use crate::av::{CodecData, CodecType, HeaderRole};
use crate::error::{Result, XiphError};
use crate::utils::{put_u24_be, BitReader, BitWriter, ByteReader};
use bytes::{BufMut, Bytes, BytesMut};

#[cfg(test)]
mod tests;

/// Magic following the type code of every header packet.
pub const THEORA_MAGIC: &[u8; 6] = b"theora";

/// Type codes of the three header packets.
pub const HEADER_CODES: [(u8, HeaderRole); 3] = [
    (0x80, HeaderRole::Identification),
    (0x81, HeaderRole::Comments),
    (0x82, HeaderRole::Setup),
];

/// Encoded size of the identification header.
pub const IDENTIFICATION_SIZE: usize = 42;

/// The only supported major bitstream version.
pub const VERSION_MAJOR: u8 = 3;

const MACROBLOCK_SHIFT: u32 = 4;

/// Largest value the packed 5-bit granule shift field holds.
pub const MAX_KEYFRAME_GRANULE_SHIFT: u8 = 31;

/// Chroma subsampling of the coded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 4:2:0 subsampling.
    Yuv420,
    /// Reserved code 1.
    Reserved,
    /// 4:2:2 subsampling.
    Yuv422,
    /// No subsampling.
    Yuv444,
}

impl PixelFormat {
    fn from_bits(bits: u32) -> Self {
        match bits & 0x03 {
            0 => PixelFormat::Yuv420,
            1 => PixelFormat::Reserved,
            2 => PixelFormat::Yuv422,
            _ => PixelFormat::Yuv444,
        }
    }

    fn bits(&self) -> u32 {
        match self {
            PixelFormat::Yuv420 => 0,
            PixelFormat::Reserved => 1,
            PixelFormat::Yuv422 => 2,
            PixelFormat::Yuv444 => 3,
        }
    }
}

/// Colour space hint of the coded pictures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColourSpace {
    /// No colour space given.
    Unspecified,
    /// ITU-R Rec. 470M
    Rec470M,
    /// ITU-R Rec. 470BG
    Rec470BG,
    /// Reserved code, kept as read.
    Reserved(u8),
}

impl From<u8> for ColourSpace {
    fn from(value: u8) -> Self {
        match value {
            0 => ColourSpace::Unspecified,
            1 => ColourSpace::Rec470M,
            2 => ColourSpace::Rec470BG,
            other => ColourSpace::Reserved(other),
        }
    }
}

impl From<ColourSpace> for u8 {
    fn from(value: ColourSpace) -> Self {
        match value {
            ColourSpace::Unspecified => 0,
            ColourSpace::Rec470M => 1,
            ColourSpace::Rec470BG => 2,
            ColourSpace::Reserved(other) => other,
        }
    }
}

/// Decoded Theora identification header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TheoraInfo {
    /// Minor bitstream version.
    pub version_minor: u8,
    /// Bitstream revision.
    pub version_revision: u8,
    /// Coded frame width in macroblocks.
    pub frame_width_mbs: u16,
    /// Coded frame height in macroblocks.
    pub frame_height_mbs: u16,
    /// Displayed picture width in pixels.
    pub picture_width: u32,
    /// Displayed picture height in pixels.
    pub picture_height: u32,
    /// Picture offset from the left of the frame.
    pub picture_x: u8,
    /// Picture offset from the bottom of the frame.
    pub picture_y: u8,
    /// Frame rate numerator.
    pub frame_rate_numerator: u32,
    /// Frame rate denominator.
    pub frame_rate_denominator: u32,
    /// Pixel aspect ratio numerator, 0 if unknown.
    pub pixel_aspect_numerator: u32,
    /// Pixel aspect ratio denominator, 0 if unknown.
    pub pixel_aspect_denominator: u32,
    /// Colour space hint.
    pub colour_space: ColourSpace,
    /// Nominal bitrate in bits per second, 0 if unset.
    pub nominal_bitrate: u32,
    /// 6-bit quality hint.
    pub quality: u8,
    /// 5-bit shift splitting granule positions into key frame and offset.
    pub keyframe_granule_shift: u8,
    /// Chroma subsampling.
    pub pixel_format: PixelFormat,
}

impl TheoraInfo {
    /// Creates a 3.2.1 header for a picture of the given pixel size at 25 fps.
    ///
    /// The coded frame is the picture rounded up to whole macroblocks.
    pub fn new(width: u32, height: u32) -> Self {
        let to_mbs = |pixels: u32| ((pixels + 15) >> MACROBLOCK_SHIFT).min(u16::MAX as u32) as u16;
        Self {
            version_minor: 2,
            version_revision: 1,
            frame_width_mbs: to_mbs(width),
            frame_height_mbs: to_mbs(height),
            picture_width: width,
            picture_height: height,
            picture_x: 0,
            picture_y: 0,
            frame_rate_numerator: 25,
            frame_rate_denominator: 1,
            pixel_aspect_numerator: 1,
            pixel_aspect_denominator: 1,
            colour_space: ColourSpace::Unspecified,
            nominal_bitrate: 0,
            quality: 32,
            keyframe_granule_shift: 6,
            pixel_format: PixelFormat::Yuv420,
        }
    }

    /// Sets the frame rate as a fraction.
    pub fn with_frame_rate(mut self, numerator: u32, denominator: u32) -> Self {
        self.frame_rate_numerator = numerator;
        self.frame_rate_denominator = denominator;
        self
    }

    /// Sets the key-frame granule shift; the field is 5 bits wide.
    pub fn with_keyframe_granule_shift(mut self, shift: u8) -> Result<Self> {
        if shift > MAX_KEYFRAME_GRANULE_SHIFT {
            return Err(XiphError::InvalidData(format!(
                "key-frame granule shift {} does not fit in 5 bits",
                shift
            )));
        }
        self.keyframe_granule_shift = shift;
        Ok(self)
    }

    /// Coded frame width in pixels.
    pub fn frame_width(&self) -> u32 {
        (self.frame_width_mbs as u32) << MACROBLOCK_SHIFT
    }

    /// Coded frame height in pixels.
    pub fn frame_height(&self) -> u32 {
        (self.frame_height_mbs as u32) << MACROBLOCK_SHIFT
    }

    /// Frames per second, 0.0 when the denominator is zero.
    pub fn frame_rate(&self) -> f64 {
        if self.frame_rate_denominator == 0 {
            return 0.0;
        }
        self.frame_rate_numerator as f64 / self.frame_rate_denominator as f64
    }

    /// Pixel aspect ratio; 0/0 in the header means unspecified and yields `None`.
    pub fn pixel_aspect(&self) -> Option<(u32, u32)> {
        if self.pixel_aspect_numerator == 0 || self.pixel_aspect_denominator == 0 {
            return None;
        }
        Some((self.pixel_aspect_numerator, self.pixel_aspect_denominator))
    }

    /// Frame number encoded by a granule position: the key frame number in
    /// the high bits plus the frame offset since that key frame in the low bits.
    pub fn granule_to_frame(&self, granule: u64) -> u64 {
        let shift = self.keyframe_granule_shift as u32;
        let keyframe = granule.checked_shr(shift).unwrap_or(0);
        let offset = granule - keyframe.checked_shl(shift).unwrap_or(0);
        keyframe + offset
    }

    /// Presentation time of the frame a granule position names.
    pub fn granule_to_seconds(&self, granule: u64) -> f64 {
        let rate = self.frame_rate();
        if rate == 0.0 {
            return 0.0;
        }
        self.granule_to_frame(granule) as f64 / rate
    }

    /// Decodes a full identification packet, type code and magic included.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let code = reader.read_u8()?;
        let magic = reader.read_slice(THEORA_MAGIC.len())?;
        if code != HEADER_CODES[0].0 || magic != THEORA_MAGIC {
            return Err(XiphError::MalformedMagic {
                codec: CodecType::Theora,
                expected: HeaderRole::Identification,
            });
        }

        let version_major = reader.read_u8()?;
        if version_major != VERSION_MAJOR {
            return Err(XiphError::UnsupportedVersion {
                codec: CodecType::Theora,
                version: version_major as u32,
            });
        }
        let version_minor = reader.read_u8()?;
        let version_revision = reader.read_u8()?;

        let frame_width_mbs = reader.read_u16_be()?;
        let frame_height_mbs = reader.read_u16_be()?;
        let picture_width = reader.read_u24_be()?;
        let picture_height = reader.read_u24_be()?;
        let picture_x = reader.read_u8()?;
        let picture_y = reader.read_u8()?;
        let frame_rate_numerator = reader.read_u32_be()?;
        let frame_rate_denominator = reader.read_u32_be()?;
        let pixel_aspect_numerator = reader.read_u24_be()?;
        let pixel_aspect_denominator = reader.read_u24_be()?;
        let colour_space = ColourSpace::from(reader.read_u8()?);
        let nominal_bitrate = reader.read_u24_be()?;

        let mut packed = BitReader::new(reader.read_slice(2)?);
        let quality = packed.read_bits(6)? as u8;
        let keyframe_granule_shift = packed.read_bits(5)? as u8;
        let pixel_format = PixelFormat::from_bits(packed.read_bits(2)?);

        Ok(Self {
            version_minor,
            version_revision,
            frame_width_mbs,
            frame_height_mbs,
            picture_width,
            picture_height,
            picture_x,
            picture_y,
            frame_rate_numerator,
            frame_rate_denominator,
            pixel_aspect_numerator,
            pixel_aspect_denominator,
            colour_space,
            nominal_bitrate,
            quality,
            keyframe_granule_shift,
            pixel_format,
        })
    }

    /// Encodes the identification packet.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(IDENTIFICATION_SIZE);
        buf.put_u8(HEADER_CODES[0].0);
        buf.put_slice(THEORA_MAGIC);
        buf.put_u8(VERSION_MAJOR);
        buf.put_u8(self.version_minor);
        buf.put_u8(self.version_revision);
        buf.put_u16(self.frame_width_mbs);
        buf.put_u16(self.frame_height_mbs);
        put_u24_be(&mut buf, self.picture_width, "picture width")?;
        put_u24_be(&mut buf, self.picture_height, "picture height")?;
        buf.put_u8(self.picture_x);
        buf.put_u8(self.picture_y);
        buf.put_u32(self.frame_rate_numerator);
        buf.put_u32(self.frame_rate_denominator);
        put_u24_be(&mut buf, self.pixel_aspect_numerator, "pixel aspect numerator")?;
        put_u24_be(&mut buf, self.pixel_aspect_denominator, "pixel aspect denominator")?;
        buf.put_u8(self.colour_space.into());
        put_u24_be(&mut buf, self.nominal_bitrate, "nominal bitrate")?;

        let mut packed = BitWriter::new();
        packed.write_bits(self.quality as u32, 6)?;
        packed.write_bits(self.keyframe_granule_shift as u32, 5)?;
        packed.write_bits(self.pixel_format.bits(), 2)?;
        packed.write_bits(0, 3)?;
        buf.put_slice(&packed.finish());

        Ok(buf.freeze())
    }
}

impl CodecData for TheoraInfo {
    fn codec_type(&self) -> CodecType {
        CodecType::Theora
    }
    fn width(&self) -> Option<u32> {
        Some(self.frame_width())
    }
    fn height(&self) -> Option<u32> {
        Some(self.frame_height())
    }
    fn sample_rate(&self) -> Option<u32> {
        None
    }
    fn channels(&self) -> Option<u8> {
        None
    }
}
