use bytes::Bytes;

/// Magic of the skeleton head packet.
pub const FISHEAD_MAGIC: &[u8; 8] = b"fishead\0";
/// Magic of a per-stream descriptor packet.
pub const FISBONE_MAGIC: &[u8; 8] = b"fisbone\0";

/// Packets of a skeleton timing stream, passed through unparsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkeletonStream {
    /// Begin-of-stream `fishead` packet.
    pub fishead: Bytes,
    /// Every later non-empty packet (`fisbone` descriptors and anything else).
    pub descriptors: Vec<Bytes>,
}

impl SkeletonStream {
    /// Creates a skeleton from its head packet.
    pub fn new(fishead: impl Into<Bytes>) -> Self {
        Self {
            fishead: fishead.into(),
            descriptors: Vec::new(),
        }
    }

    /// Appends a descriptor packet.
    pub fn with_descriptor(mut self, packet: impl Into<Bytes>) -> Self {
        self.descriptors.push(packet.into());
        self
    }

    /// Records a later packet of the stream; empty end-of-stream markers are dropped.
    pub fn push(&mut self, packet: Bytes) {
        if !packet.is_empty() {
            self.descriptors.push(packet);
        }
    }

    /// Descriptor packets starting with the fisbone magic.
    pub fn fisbones(&self) -> impl Iterator<Item = &Bytes> {
        self.descriptors
            .iter()
            .filter(|packet| packet.starts_with(FISBONE_MAGIC))
    }

    /// Major and minor skeleton version from the `fishead` packet.
    pub fn version(&self) -> Option<(u16, u16)> {
        let raw = self.fishead.get(8..12)?;
        Some((
            u16::from_le_bytes([raw[0], raw[1]]),
            u16::from_le_bytes([raw[2], raw[3]]),
        ))
    }
}
