#![doc(html_root_url = "https://docs.rs/xiphkit/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # xiphkit - Ogg logical stream toolkit
//!
//! `xiphkit` reads and writes Ogg containers carrying a primary Vorbis or
//! Theora stream, any number of companion audio streams and an optional
//! skeleton stream. It decodes and encodes the identification and comment
//! headers of both codec families and leaves codec payload untouched.
//!
//! ## Features
//!
//! ### Header codecs
//! - Vorbis identification header (30 bytes, little-endian)
//! - Theora identification header (42 bytes, big-endian, packed tail field)
//! - Shared tag/value comment block with case-folded tags
//!
//! ### Container handling
//! - Demultiplexing with per-stream header validation and arrival-order payload
//! - Two-phase multiplexing with granule-driven page flushes
//! - Skeleton pass-through and container copy
//! - Page framing through the `ogg` crate
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! xiphkit = "0.1.0"
//! ```
//!
//! ### Writing and reading a container
//!
//! ```rust
//! use std::io::Cursor;
//! use xiphkit::av::{CodecType, Packet};
//! use xiphkit::codec::{CommentBlock, IdentificationHeader, SetupHeader, StreamHeaders, VorbisInfo};
//! use xiphkit::config::MuxerConfig;
//! use xiphkit::format::ogg::{ContainerLayout, Demuxer, Multiplexer, OggPacketReader, OggPacketWriter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let headers = StreamHeaders::new(
//!     IdentificationHeader::Vorbis(VorbisInfo::new(2, 44_100)),
//!     CommentBlock::new("xiphkit"),
//!     SetupHeader::new(vec![0u8; 16]),
//! );
//!
//! let writer = OggPacketWriter::new(Cursor::new(Vec::new()));
//! let mut muxer = Multiplexer::open(writer, ContainerLayout::new(headers), MuxerConfig::default())?;
//! let serial = muxer.primary_serial();
//! muxer.write_packet(Packet::new(vec![0u8; 64]).with_serial(serial).with_granule(1024))?;
//! let bytes = muxer.finish()?.into_inner().into_inner();
//!
//! let mut demuxer = Demuxer::new(OggPacketReader::new(Cursor::new(bytes)), CodecType::Vorbis);
//! let opened = demuxer.open_headers()?;
//! assert_eq!(opened.primary.comments.vendor(), "xiphkit");
//! while let Some(packet) = demuxer.next_payload(None)? {
//!     assert_eq!(packet.serial, serial);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - `av`: packet model and codec family tags
//! - `codec`: identification, comment and setup header codecs
//! - `format`: packet source/sink boundary and the Ogg demuxer and multiplexer
//! - `config`: session policy knobs, with environment overrides
//! - `error`: the crate error type
//! - `utils`: bit and byte level readers and writers
//!
/// Packet model and codec family tags
pub mod av;

/// Header codecs for the supported codec families
pub mod codec;

/// Error types and utilities
pub mod error;

/// Container formats and the packet boundary
pub mod format;

/// Common utilities and helper functions
pub mod utils;

/// Configuration module
pub mod config;

pub use error::{Result, XiphError};
