use crate::av::{CodecType, HeaderRole};
use thiserror::Error;

/// Errors raised by header codecs, the demuxer and the multiplexer.
#[derive(Error, Debug)]
pub enum XiphError {
    /// Failure of the underlying byte stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Page framing or checksum failure.
    #[error("ogg framing error: {0}")]
    Ogg(#[from] ogg::OggReadError),

    /// A header packet lacks the type code and magic of the role expected next.
    #[error("malformed magic: expected {codec:?} {expected:?} header")]
    MalformedMagic {
        /// Family of the stream.
        codec: CodecType,
        /// Header role due at this point.
        expected: HeaderRole,
    },

    /// Bitstream version this crate does not read.
    #[error("unsupported {codec:?} version {version}")]
    UnsupportedVersion {
        /// Family of the header.
        codec: CodecType,
        /// Version found.
        version: u32,
    },

    /// Framing byte other than 1.
    #[error("invalid framing bit: {0:#04x}")]
    InvalidFraming(u8),

    /// Payload for a serial that never began.
    #[error("unknown stream {serial} at packet {packet}")]
    UnknownStream {
        /// Serial of the packet.
        serial: u32,
        /// Ordinal of the packet in the source.
        packet: u64,
    },

    /// The container has no stream of the requested family.
    #[error("not a {0:?} container")]
    NotAContainerOfExpectedType(CodecType),

    /// A packet ended inside a field.
    #[error("truncated packet: needed {needed} bytes, {available} available")]
    TruncatedPacket {
        /// Bytes the read required.
        needed: usize,
        /// Bytes the packet had.
        available: usize,
    },

    /// A stream ended before its third header.
    #[error("stream {serial} ended before its headers were complete")]
    IncompleteHeaders {
        /// Serial of the stream.
        serial: u32,
    },

    /// Two streams share a serial.
    #[error("stream {0} is already registered")]
    DuplicateStream(u32),

    /// A stream was given a granule position below its last one.
    #[error("granule position on stream {serial} went back from {previous} to {granule}")]
    GranuleRegression {
        /// Serial of the stream.
        serial: u32,
        /// Last granule position written.
        previous: u64,
        /// Rejected granule position.
        granule: u64,
    },

    /// A value is out of range for its field.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Another error, tagged with where it was raised.
    #[error("stream {serial} packet {packet}: {source}")]
    InStream {
        /// Serial of the stream.
        serial: u32,
        /// Ordinal of the packet in the source.
        packet: u64,
        /// The wrapped error.
        #[source]
        source: Box<XiphError>,
    },
}

impl XiphError {
    /// Attaches the logical stream and packet ordinal the error was raised on.
    pub fn in_stream(self, serial: u32, packet: u64) -> Self {
        match self {
            err @ XiphError::InStream { .. } => err,
            err => XiphError::InStream {
                serial,
                packet,
                source: Box::new(err),
            },
        }
    }

    /// The underlying error with any stream context peeled off.
    pub fn root(&self) -> &XiphError {
        match self {
            XiphError::InStream { source, .. } => source.root(),
            err => err,
        }
    }
}

/// Result alias using [`XiphError`].
pub type Result<T> = std::result::Result<T, XiphError>;
