use crate::av::{CodecType, HeaderRole};
use crate::codec::{HeaderSignature, SIGNATURES};
use crate::format::ogg::skeleton::FISHEAD_MAGIC;

/// Smallest begin-of-stream packet considered a header candidate.
pub const MIN_HEADER_CANDIDATE_LEN: usize = 16;

/// What a packet turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// A header packet of a known family.
    Header {
        /// Family whose signature matched.
        codec: CodecType,
        /// Header the type code announces.
        role: HeaderRole,
    },
    /// Begin-of-stream packet of a skeleton timing stream.
    Skeleton,
    /// Codec payload, or a packet no signature matched.
    Data,
}

/// Sniffs packets against a table of codec family signatures.
#[derive(Debug, Clone, Copy)]
pub struct PacketClassifier {
    signatures: &'static [HeaderSignature],
}

impl Default for PacketClassifier {
    fn default() -> Self {
        Self::new(&SIGNATURES)
    }
}

impl PacketClassifier {
    /// Creates a classifier over a custom signature table.
    pub fn new(signatures: &'static [HeaderSignature]) -> Self {
        Self { signatures }
    }

    /// Identifies the first packet of a logical stream.
    ///
    /// Only begin-of-stream packets of at least 16 bytes are candidates.
    pub fn sniff(&self, data: &[u8], begin_of_stream: bool) -> PacketKind {
        if !begin_of_stream || data.len() < MIN_HEADER_CANDIDATE_LEN {
            return PacketKind::Data;
        }
        if data.starts_with(FISHEAD_MAGIC) {
            return PacketKind::Skeleton;
        }
        self.signatures
            .iter()
            .find_map(|signature| {
                signature.role_of(data).map(|role| PacketKind::Header {
                    codec: signature.codec,
                    role,
                })
            })
            .unwrap_or(PacketKind::Data)
    }

    /// Classifies a later packet of a stream whose family is already known.
    pub fn classify(&self, codec: CodecType, data: &[u8]) -> PacketKind {
        self.signatures
            .iter()
            .find(|signature| signature.codec == codec)
            .and_then(|signature| signature.role_of(data))
            .map_or(PacketKind::Data, |role| PacketKind::Header { codec, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{TheoraInfo, VorbisInfo};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sniff_identification_headers() {
        let classifier = PacketClassifier::default();
        let vorbis = VorbisInfo::new(2, 44_100).to_bytes().unwrap();
        assert_eq!(
            classifier.sniff(&vorbis, true),
            PacketKind::Header {
                codec: CodecType::Vorbis,
                role: HeaderRole::Identification
            }
        );

        let theora = TheoraInfo::new(16, 16).to_bytes().unwrap();
        assert_eq!(
            classifier.sniff(&theora, true),
            PacketKind::Header {
                codec: CodecType::Theora,
                role: HeaderRole::Identification
            }
        );
    }

    #[test]
    fn test_sniff_requires_begin_of_stream_and_length() {
        let classifier = PacketClassifier::default();
        let vorbis = VorbisInfo::new(2, 44_100).to_bytes().unwrap();
        assert_eq!(classifier.sniff(&vorbis, false), PacketKind::Data);
        assert_eq!(classifier.sniff(&vorbis[..15], true), PacketKind::Data);
        assert_eq!(classifier.sniff(&[0u8; 32], true), PacketKind::Data);
    }

    #[test]
    fn test_sniff_skeleton() {
        let classifier = PacketClassifier::default();
        let mut fishead = FISHEAD_MAGIC.to_vec();
        fishead.resize(64, 0);
        assert_eq!(classifier.sniff(&fishead, true), PacketKind::Skeleton);
    }

    #[test]
    fn test_classify_within_family() {
        let classifier = PacketClassifier::default();
        assert_eq!(
            classifier.classify(CodecType::Theora, b"\x82theora\x00"),
            PacketKind::Header {
                codec: CodecType::Theora,
                role: HeaderRole::Setup
            }
        );
        // a vorbis header on a theora stream is just data
        assert_eq!(classifier.classify(CodecType::Theora, b"\x03vorbis\x00"), PacketKind::Data);
        assert_eq!(classifier.classify(CodecType::Vorbis, &[0x00, 0x12, 0x34]), PacketKind::Data);
    }

    #[test]
    fn test_custom_signature_table() {
        static VORBIS_ONLY: [HeaderSignature; 1] = [SIGNATURES[0]];
        let classifier = PacketClassifier::new(&VORBIS_ONLY);
        let theora = TheoraInfo::new(16, 16).to_bytes().unwrap();
        assert_eq!(classifier.sniff(&theora, true), PacketKind::Data);
    }
}
