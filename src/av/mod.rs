/// Codec family carried by a logical stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecType {
    /// Vorbis-style audio
    Vorbis,
    /// Theora-style video
    Theora,
}

impl CodecType {
    /// Whether the family carries video.
    pub fn is_video(&self) -> bool {
        matches!(self, CodecType::Theora)
    }
}

/// Position of a header packet in the mandatory three-packet sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HeaderRole {
    /// Codec parameters; always the first packet.
    Identification,
    /// Vendor string and tag/value comments.
    Comments,
    /// Codec setup data such as codebooks.
    Setup,
}

/// Stream parameters exposed by an identification header.
pub trait CodecData {
    /// Codec family of the stream.
    fn codec_type(&self) -> CodecType;
    /// Coded frame width in pixels, for video.
    fn width(&self) -> Option<u32>;
    /// Coded frame height in pixels, for video.
    fn height(&self) -> Option<u32>;
    /// Samples per second, for audio.
    fn sample_rate(&self) -> Option<u32>;
    /// Channel count, for audio.
    fn channels(&self) -> Option<u8>;
}

mod packet;
pub use packet::*;
