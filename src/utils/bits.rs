use crate::error::{Result, XiphError};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// A bit-level reader for big-endian packed header fields.
///
/// Theora identification headers pack several sub-byte fields into their
/// trailing bytes, most significant bit first.
///
/// Example:
/// ```
/// use xiphkit::utils::BitReader;
///
/// let data = [0b10110011];
/// let mut reader = BitReader::new(&data);
///
/// assert_eq!(reader.read_bit().unwrap(), true);    // 1
/// assert_eq!(reader.read_bits(3).unwrap(), 0b011); // 011
/// ```
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_offset: usize,
    bit_offset: u8,
}

impl<'a> BitReader<'a> {
    /// Creates a new BitReader from a byte slice
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            byte_offset: 0,
            bit_offset: 0,
        }
    }

    /// Reads a single bit from the stream.
    ///
    /// Returns error if end of data is reached.
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.byte_offset >= self.data.len() {
            return Err(XiphError::TruncatedPacket {
                needed: self.byte_offset + 1,
                available: self.data.len(),
            });
        }

        let bit = (self.data[self.byte_offset] >> (7 - self.bit_offset)) & 1;
        self.bit_offset += 1;

        if self.bit_offset == 8 {
            self.bit_offset = 0;
            self.byte_offset += 1;
        }

        Ok(bit == 1)
    }

    /// Reads n bits and returns them as a number, most significant bit first.
    ///
    /// Returns error if n > 32 or end of data is reached.
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n > 32 {
            return Err(XiphError::InvalidData(format!(
                "cannot read {} bits at once",
                n
            )));
        }

        let mut value = 0u32;
        for _ in 0..n {
            value = (value << 1) | self.read_bit()? as u32;
        }

        Ok(value)
    }
}

/// Counterpart of [`BitReader`]: packs fields most significant bit first.
#[derive(Debug, Default)]
pub struct BitWriter {
    data: Vec<u8>,
    bit_offset: u8,
}

impl BitWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one bit, most significant first.
    pub fn write_bit(&mut self, bit: bool) {
        if self.bit_offset == 0 {
            self.data.push(0);
        }
        if bit {
            if let Some(last) = self.data.last_mut() {
                *last |= 1 << (7 - self.bit_offset);
            }
        }
        self.bit_offset = (self.bit_offset + 1) % 8;
    }

    /// Writes the low `n` bits of `value`. Fails if `value` does not fit.
    pub fn write_bits(&mut self, value: u32, n: u32) -> Result<()> {
        if n > 32 {
            return Err(XiphError::InvalidData(format!(
                "cannot write {} bits at once",
                n
            )));
        }
        if n < 32 && value >> n != 0 {
            return Err(XiphError::InvalidData(format!(
                "value {} does not fit in {} bits",
                value, n
            )));
        }
        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
        Ok(())
    }

    /// Pads the current byte with zero bits and returns the packed bytes.
    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}

/// Length-checked cursor over a header packet.
///
/// Every accessor fails with [`XiphError::TruncatedPacket`] instead of
/// panicking when the packet is shorter than the field being read.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    len: usize,
}

impl<'a> ByteReader<'a> {
    /// Starts reading at the first byte of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            buf: data,
            len: data.len(),
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.len - self.buf.len()
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(XiphError::TruncatedPacket {
                needed: self.position() + n,
                available: self.len,
            });
        }
        Ok(())
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    /// Reads a little-endian u32.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    /// Reads a little-endian i32.
    pub fn read_i32_le(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.buf.get_i32_le())
    }

    /// Reads a big-endian u16.
    pub fn read_u16_be(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.buf.get_u16())
    }

    /// Reads a big-endian 24-bit value.
    pub fn read_u24_be(&mut self) -> Result<u32> {
        self.ensure(3)?;
        Ok(self.buf.get_uint(3) as u32)
    }

    /// Reads a big-endian u32.
    pub fn read_u32_be(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32())
    }

    /// Borrows the next `n` bytes.
    pub fn read_slice(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    /// Advances past `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_slice(n).map(|_| ())
    }
}

/// Appends a 24-bit big-endian value, rejecting anything wider.
pub fn put_u24_be(buf: &mut BytesMut, value: u32, field: &str) -> Result<()> {
    if value > 0x00FF_FFFF {
        return Err(XiphError::InvalidData(format!(
            "{} {} does not fit in 24 bits",
            field, value
        )));
    }
    buf.put_uint(value as u64, 3);
    Ok(())
}

/// Appends a little-endian length prefix followed by the bytes.
pub fn put_length_prefixed(buf: &mut BytesMut, data: &[u8]) -> Result<()> {
    let len = u32::try_from(data.len()).map_err(|_| {
        XiphError::InvalidData(format!("{} byte string is too long", data.len()))
    })?;
    buf.put_u32_le(len);
    buf.put_slice(data);
    Ok(())
}

/// Copies `data` into an owned buffer.
pub fn to_bytes(data: &[u8]) -> Bytes {
    Bytes::copy_from_slice(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_read_bits() {
        // Simple pattern within a byte
        let data = [0b10110011];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(5).unwrap(), 0b10011);

        // Cross-byte boundary
        let data = [0b10110011, 0b01011010];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(8).unwrap(), 0b10011010);

        // Reading zero bits
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(0).unwrap(), 0);

        // Too many bits at once
        assert!(reader.read_bits(33).is_err());
    }

    #[test]
    fn test_packed_theora_tail() {
        // quality 0b101010, shift 0b00110, pixel format 0b10, padding 000
        let data = [0b1010_1000, 0b1101_0000];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(6).unwrap(), 0b101010);
        assert_eq!(reader.read_bits(5).unwrap(), 0b00110);
        assert_eq!(reader.read_bits(2).unwrap(), 0b10);
        assert_eq!(reader.read_bits(3).unwrap(), 0);
        assert!(reader.read_bit().is_err());
    }

    #[test]
    fn test_writer_rejects_wide_values() {
        let mut writer = BitWriter::new();
        assert!(writer.write_bits(0b1000000, 6).is_err());
        writer.write_bits(0b111111, 6).unwrap();
        writer.write_bits(0, 2).unwrap();
        assert_eq!(writer.finish(), vec![0xFC]);
    }

    #[test]
    fn test_byte_reader_truncation() {
        let data = [0x01, 0x02, 0x03];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u8().unwrap(), 1);
        match reader.read_u32_le() {
            Err(XiphError::TruncatedPacket { needed, available }) => {
                assert_eq!(needed, 5);
                assert_eq!(available, 3);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
        assert_eq!(reader.read_u16_be().unwrap(), 0x0203);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_u24_round_trip() {
        let mut buf = BytesMut::new();
        put_u24_be(&mut buf, 0x0A0B0C, "width").unwrap();
        assert_eq!(&buf[..], &[0x0A, 0x0B, 0x0C]);
        assert!(put_u24_be(&mut buf, 0x0100_0000, "width").is_err());
        let mut reader = ByteReader::new(&buf);
        assert_eq!(reader.read_u24_be().unwrap(), 0x0A0B0C);
    }

    #[quickcheck]
    fn prop_writer_matches_reader(fields: Vec<(u32, u8)>) -> bool {
        let fields: Vec<(u32, u32)> = fields
            .into_iter()
            .map(|(value, width)| {
                let width = (width % 32) as u32 + 1;
                let mask = if width == 32 { u32::MAX } else { (1 << width) - 1 };
                (value & mask, width)
            })
            .collect();

        let mut writer = BitWriter::new();
        for &(value, width) in &fields {
            if writer.write_bits(value, width).is_err() {
                return false;
            }
        }
        let packed = writer.finish();
        let mut reader = BitReader::new(&packed);
        fields
            .iter()
            .all(|&(value, width)| reader.read_bits(width).ok() == Some(value))
    }
}
