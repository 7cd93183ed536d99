//! Page framing through the `ogg` crate.
//!
//! These adapters connect the demuxer and multiplexer to real Ogg byte
//! streams; CRC, lacing and page headers are all handled by `ogg`.

use crate::av::Packet;
use crate::error::Result;
use crate::format::{PacketSink, PacketSource, PageBoundary};
use ::ogg::{PacketReader, PacketWriteEndInfo, PacketWriter};
use std::io::{Read, Seek, Write};

/// Granule position written when no packet finishes on a page.
const UNKNOWN_GRANULE: u64 = u64::MAX;

/// First serial id handed out by [`OggPacketWriter::allocate_serial`].
const FIRST_SERIAL: u32 = 0x0000_1000;

/// Reads packets out of an Ogg byte stream.
pub struct OggPacketReader<R: Read + Seek> {
    inner: PacketReader<R>,
}

impl<R: Read + Seek> OggPacketReader<R> {
    /// Wraps a byte reader.
    pub fn new(reader: R) -> Self {
        Self {
            inner: PacketReader::new(reader),
        }
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R: Read + Seek> PacketSource for OggPacketReader<R> {
    fn read_packet(&mut self) -> Result<Option<Packet>> {
        let Some(packet) = self.inner.read_packet()? else {
            return Ok(None);
        };

        let serial = packet.stream_serial();
        let begin_of_stream = packet.first_in_stream();
        let end_of_stream = packet.last_in_stream();
        let granule = packet.absgp_page();
        let ends_page = packet.last_in_page();

        let mut out = Packet::new(packet.data)
            .with_serial(serial)
            .with_begin_of_stream(begin_of_stream)
            .with_end_of_stream(end_of_stream);
        if ends_page && granule != UNKNOWN_GRANULE {
            out = out.with_granule(granule);
        }
        Ok(Some(out))
    }
}

/// Frames packets into Ogg pages on a byte sink.
pub struct OggPacketWriter<'a, W: Write> {
    inner: PacketWriter<'a, W>,
    next_serial: u32,
}

impl<'a, W: Write> OggPacketWriter<'a, W> {
    /// Wraps a byte writer.
    pub fn new(writer: W) -> Self {
        Self {
            inner: PacketWriter::new(writer),
            next_serial: FIRST_SERIAL,
        }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

impl<'a, W: Write> PacketSink for OggPacketWriter<'a, W> {
    fn write_packet(&mut self, packet: Packet, boundary: PageBoundary) -> Result<()> {
        let end = match boundary {
            PageBoundary::Continue => PacketWriteEndInfo::NormalPacket,
            PageBoundary::EndPage => PacketWriteEndInfo::EndPage,
            PageBoundary::EndStream => PacketWriteEndInfo::EndStream,
        };
        let granule = packet.granule_position.unwrap_or(UNKNOWN_GRANULE);
        self.inner
            .write_packet(packet.data.to_vec(), packet.serial, end, granule)?;
        Ok(())
    }

    fn allocate_serial(&mut self) -> u32 {
        let serial = self.next_serial;
        self.next_serial = self.next_serial.wrapping_add(1);
        serial
    }
}
