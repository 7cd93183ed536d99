//! # Utility Functions and Types
//!
//! Helpers shared by the header codecs:
//!
//! - Bit-level reading and writing of packed fields
//! - A length-checked byte cursor for fixed-layout headers
//!
//! ## Bit Operations
//!
//! ```rust
//! use xiphkit::utils::{BitReader, BitWriter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut writer = BitWriter::new();
//! writer.write_bits(0b101, 3)?;
//! let packed = writer.finish();
//!
//! let mut reader = BitReader::new(&packed);
//! assert_eq!(reader.read_bits(3)?, 0b101);
//! # Ok(())
//! # }
//! ```

/// Bit manipulation and checked byte reading utilities
pub mod bits;

pub use bits::*;
