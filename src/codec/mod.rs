/// Shared tag/value comment block
pub mod comment;
/// Theora-style video identification header
pub mod theora;
/// Vorbis-style audio identification header
pub mod vorbis;

pub use comment::CommentBlock;
pub use theora::{ColourSpace, PixelFormat, TheoraInfo};
pub use vorbis::VorbisInfo;

use crate::av::{CodecData, CodecType, HeaderRole};
use crate::error::{Result, XiphError};
use crate::utils::to_bytes;
use bytes::{BufMut, Bytes, BytesMut};

/// Length of the type code plus six-byte magic that opens every header packet.
pub const HEADER_PREFIX_SIZE: usize = 7;

/// Type codes and magic identifying one codec family's header packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSignature {
    /// Family the signature identifies.
    pub codec: CodecType,
    /// Six-byte magic following the type code.
    pub magic: &'static [u8; 6],
    /// Type code of each header packet.
    pub codes: [(u8, HeaderRole); 3],
    /// Whether the comment block ends with a framing byte.
    pub comment_framing: bool,
}

/// Signatures of every supported family.
pub const SIGNATURES: [HeaderSignature; 2] = [
    HeaderSignature {
        codec: CodecType::Vorbis,
        magic: vorbis::VORBIS_MAGIC,
        codes: vorbis::HEADER_CODES,
        comment_framing: true,
    },
    HeaderSignature {
        codec: CodecType::Theora,
        magic: theora::THEORA_MAGIC,
        codes: theora::HEADER_CODES,
        comment_framing: false,
    },
];

impl HeaderSignature {
    /// Signature of `codec`.
    pub fn of(codec: CodecType) -> &'static HeaderSignature {
        match codec {
            CodecType::Vorbis => &SIGNATURES[0],
            CodecType::Theora => &SIGNATURES[1],
        }
    }

    /// Type code announcing `role`.
    pub fn code(&self, role: HeaderRole) -> u8 {
        self.codes
            .iter()
            .find(|(_, r)| *r == role)
            .map(|(code, _)| *code)
            .unwrap_or_default()
    }

    /// The header role `data` announces, if it carries this family's prefix.
    pub fn role_of(&self, data: &[u8]) -> Option<HeaderRole> {
        if data.len() < HEADER_PREFIX_SIZE || &data[1..HEADER_PREFIX_SIZE] != self.magic {
            return None;
        }
        self.codes
            .iter()
            .find(|(code, _)| *code == data[0])
            .map(|(_, role)| *role)
    }

    fn prefix(&self, role: HeaderRole) -> [u8; HEADER_PREFIX_SIZE] {
        let mut prefix = [0u8; HEADER_PREFIX_SIZE];
        prefix[0] = self.code(role);
        prefix[1..].copy_from_slice(self.magic);
        prefix
    }

    fn expect(&self, data: &[u8], role: HeaderRole) -> Result<()> {
        if self.role_of(data) != Some(role) {
            return Err(XiphError::MalformedMagic {
                codec: self.codec,
                expected: role,
            });
        }
        Ok(())
    }
}

/// First header packet of a logical stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentificationHeader {
    /// Audio stream parameters.
    Vorbis(VorbisInfo),
    /// Video stream parameters.
    Theora(TheoraInfo),
}

impl IdentificationHeader {
    /// Decodes the identification packet of a `codec` stream.
    pub fn decode(codec: CodecType, data: &[u8]) -> Result<Self> {
        match codec {
            CodecType::Vorbis => VorbisInfo::decode(data).map(IdentificationHeader::Vorbis),
            CodecType::Theora => TheoraInfo::decode(data).map(IdentificationHeader::Theora),
        }
    }

    /// Encodes the identification packet.
    pub fn to_bytes(&self) -> Result<Bytes> {
        match self {
            IdentificationHeader::Vorbis(info) => info.to_bytes(),
            IdentificationHeader::Theora(info) => info.to_bytes(),
        }
    }

    /// The audio parameters, if this is a Vorbis header.
    pub fn as_vorbis(&self) -> Option<&VorbisInfo> {
        match self {
            IdentificationHeader::Vorbis(info) => Some(info),
            _ => None,
        }
    }

    /// The video parameters, if this is a Theora header.
    pub fn as_theora(&self) -> Option<&TheoraInfo> {
        match self {
            IdentificationHeader::Theora(info) => Some(info),
            _ => None,
        }
    }

    fn as_codec_data(&self) -> &dyn CodecData {
        match self {
            IdentificationHeader::Vorbis(info) => info,
            IdentificationHeader::Theora(info) => info,
        }
    }
}

impl CodecData for IdentificationHeader {
    fn codec_type(&self) -> CodecType {
        self.as_codec_data().codec_type()
    }
    fn width(&self) -> Option<u32> {
        self.as_codec_data().width()
    }
    fn height(&self) -> Option<u32> {
        self.as_codec_data().height()
    }
    fn sample_rate(&self) -> Option<u32> {
        self.as_codec_data().sample_rate()
    }
    fn channels(&self) -> Option<u8> {
        self.as_codec_data().channels()
    }
}

/// Third header packet; codebooks and other codec setup, kept opaque.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupHeader {
    /// Packet contents after the family prefix.
    pub body: Bytes,
}

impl SetupHeader {
    /// Wraps a setup body without its family prefix.
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self { body: body.into() }
    }

    /// Decodes a setup packet of a `codec` stream, keeping the body after the prefix.
    pub fn decode(codec: CodecType, data: &[u8]) -> Result<Self> {
        HeaderSignature::of(codec).expect(data, HeaderRole::Setup)?;
        Ok(Self::new(to_bytes(&data[HEADER_PREFIX_SIZE..])))
    }

    /// Encodes the setup packet with the family prefix of `codec`.
    pub fn to_bytes(&self, codec: CodecType) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_PREFIX_SIZE + self.body.len());
        buf.put_slice(&HeaderSignature::of(codec).prefix(HeaderRole::Setup));
        buf.put_slice(&self.body);
        buf.freeze()
    }
}

/// Decodes a family's comment header packet.
pub fn decode_comments(codec: CodecType, data: &[u8]) -> Result<CommentBlock> {
    let signature = HeaderSignature::of(codec);
    signature.expect(data, HeaderRole::Comments)?;
    CommentBlock::decode(data, HEADER_PREFIX_SIZE, signature.comment_framing)
}

/// Encodes a comment block as a family's comment header packet.
pub fn encode_comments(codec: CodecType, comments: &CommentBlock) -> Result<Bytes> {
    let signature = HeaderSignature::of(codec);
    let mut buf = comments.encode_with(HEADER_PREFIX_SIZE, |buf| {
        if signature.comment_framing {
            buf.put_u8(1);
        }
    })?;
    buf[..HEADER_PREFIX_SIZE].copy_from_slice(&signature.prefix(HeaderRole::Comments));
    Ok(buf.freeze())
}

/// The three mandatory header packets of one logical stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeaders {
    /// First header packet.
    pub identification: IdentificationHeader,
    /// Second header packet.
    pub comments: CommentBlock,
    /// Third header packet.
    pub setup: SetupHeader,
}

impl StreamHeaders {
    /// Groups the three headers of one stream.
    pub fn new(identification: IdentificationHeader, comments: CommentBlock, setup: SetupHeader) -> Self {
        Self {
            identification,
            comments,
            setup,
        }
    }

    /// Family given by the identification header.
    pub fn codec_type(&self) -> CodecType {
        self.identification.codec_type()
    }

    /// Serializes the headers in stream order: identification, comments, setup.
    pub fn to_packets(&self) -> Result<[Bytes; 3]> {
        let codec = self.codec_type();
        Ok([
            self.identification.to_bytes()?,
            encode_comments(codec, &self.comments)?,
            self.setup.to_bytes(codec),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_role_of() {
        let vorbis = HeaderSignature::of(CodecType::Vorbis);
        assert_eq!(vorbis.role_of(b"\x03vorbis"), Some(HeaderRole::Comments));
        assert_eq!(vorbis.role_of(b"\x05vorbis\x00"), Some(HeaderRole::Setup));
        assert_eq!(vorbis.role_of(b"\x02vorbis"), None);
        assert_eq!(vorbis.role_of(b"\x03vorb"), None);

        let theora = HeaderSignature::of(CodecType::Theora);
        assert_eq!(theora.role_of(b"\x81theora"), Some(HeaderRole::Comments));
        assert_eq!(theora.role_of(b"\x81vorbis"), None);
    }

    #[test]
    fn test_vorbis_comment_packet_has_framing_byte() {
        let mut comments = CommentBlock::new("xiphkit");
        comments.add_comment("TITLE", "x");
        let packet = encode_comments(CodecType::Vorbis, &comments).unwrap();
        assert_eq!(&packet[..7], b"\x03vorbis");
        assert_eq!(packet[packet.len() - 1], 1);
        assert_eq!(decode_comments(CodecType::Vorbis, &packet).unwrap(), comments);
    }

    #[test]
    fn test_theora_comment_packet_has_no_footer() {
        let comments = CommentBlock::new("v");
        let packet = encode_comments(CodecType::Theora, &comments).unwrap();
        // prefix, vendor length, vendor, count
        assert_eq!(packet.len(), 7 + 4 + 1 + 4);
        assert_eq!(&packet[..7], b"\x81theora");
        assert_eq!(decode_comments(CodecType::Theora, &packet).unwrap(), comments);
    }

    #[test]
    fn test_decode_comments_checks_role() {
        let setup = SetupHeader::new(vec![1, 2, 3]).to_bytes(CodecType::Vorbis);
        assert!(matches!(
            decode_comments(CodecType::Vorbis, &setup),
            Err(XiphError::MalformedMagic {
                expected: HeaderRole::Comments,
                ..
            })
        ));
    }

    #[test]
    fn test_setup_prefix_is_stripped_and_restored() {
        let packet = SetupHeader::new(vec![0xAA, 0xBB]).to_bytes(CodecType::Theora);
        assert_eq!(&packet[..], b"\x82theora\xAA\xBB");
        let setup = SetupHeader::decode(CodecType::Theora, &packet).unwrap();
        assert_eq!(&setup.body[..], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_stream_headers_to_packets() {
        let headers = StreamHeaders::new(
            IdentificationHeader::Vorbis(VorbisInfo::new(1, 22_050)),
            CommentBlock::new("v"),
            SetupHeader::new(vec![0x42]),
        );
        let [id, comments, setup] = headers.to_packets().unwrap();
        assert_eq!(id.len(), vorbis::IDENTIFICATION_SIZE);
        assert_eq!(comments[0], 0x03);
        assert_eq!(setup[0], 0x05);
        assert_eq!(headers.identification.sample_rate(), Some(22_050));
    }
}
