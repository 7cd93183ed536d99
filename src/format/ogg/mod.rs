//! Ogg logical stream handling.
//!
//! The demuxer and multiplexer work on whole packets; page framing is left to
//! a [`PacketSource`](crate::format::PacketSource) or
//! [`PacketSink`](crate::format::PacketSink), such as the adapters in [`io`].

/// Header packet recognition.
pub mod classify;
/// Container copy.
pub mod copy;
/// Demultiplexer and header discovery.
pub mod demuxer;
/// Page framing adapters.
pub mod io;
/// Multiplexer and container layout.
pub mod muxer;
/// Skeleton pass-through.
pub mod skeleton;

pub use classify::{PacketClassifier, PacketKind};
pub use copy::copy_container;
pub use demuxer::{ContainerHeaders, Demuxer, HeaderState};
pub use io::{OggPacketReader, OggPacketWriter};
pub use muxer::{ContainerLayout, Multiplexer};
pub use skeleton::SkeletonStream;
