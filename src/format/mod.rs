use crate::av::Packet;
use crate::Result;
use std::collections::VecDeque;

/// Ogg logical stream demultiplexing and multiplexing
pub mod ogg;

/// Where a written packet leaves the page it was added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageBoundary {
    /// More packets may follow on the same page.
    Continue,
    /// The page ends after this packet.
    EndPage,
    /// The page ends after this packet and the logical stream is finished.
    EndStream,
}

/// Supplies packets in physical arrival order.
///
/// Implemented by page framers; returns `Ok(None)` once the stream is exhausted.
pub trait PacketSource {
    /// Next packet, or `None` at the end of input.
    fn read_packet(&mut self) -> Result<Option<Packet>>;
}

/// Accepts packets for page framing.
pub trait PacketSink {
    /// Adds a packet to its stream's current page.
    fn write_packet(&mut self, packet: Packet, boundary: PageBoundary) -> Result<()>;

    /// Hands out a serial id for a new logical stream.
    fn allocate_serial(&mut self) -> u32;
}

impl<S: PacketSource + ?Sized> PacketSource for &mut S {
    fn read_packet(&mut self) -> Result<Option<Packet>> {
        (**self).read_packet()
    }
}

impl<S: PacketSink + ?Sized> PacketSink for &mut S {
    fn write_packet(&mut self, packet: Packet, boundary: PageBoundary) -> Result<()> {
        (**self).write_packet(packet, boundary)
    }

    fn allocate_serial(&mut self) -> u32 {
        (**self).allocate_serial()
    }
}

/// In-memory packet queue: records written packets and replays them in order.
///
/// Page boundaries are not kept as such; a packet that ended a page carries
/// the page's granule position, as it would after real framing.
#[derive(Debug, Default)]
pub struct MemoryPackets {
    packets: VecDeque<Packet>,
    next_serial: u32,
}

impl MemoryPackets {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer that yields `packets` in order.
    pub fn from_packets(packets: impl IntoIterator<Item = Packet>) -> Self {
        Self {
            packets: packets.into_iter().collect(),
            next_serial: 0,
        }
    }

    /// Packets not yet read.
    pub fn packets(&self) -> impl Iterator<Item = &Packet> {
        self.packets.iter()
    }

    /// Number of packets not yet read.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Whether every packet has been read.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Consumes the buffer, returning the packets not yet read.
    pub fn into_packets(self) -> Vec<Packet> {
        self.packets.into()
    }
}

impl PacketSource for MemoryPackets {
    fn read_packet(&mut self) -> Result<Option<Packet>> {
        Ok(self.packets.pop_front())
    }
}

impl PacketSink for MemoryPackets {
    fn write_packet(&mut self, packet: Packet, boundary: PageBoundary) -> Result<()> {
        let end_of_stream = packet.end_of_stream || boundary == PageBoundary::EndStream;
        self.packets.push_back(packet.with_end_of_stream(end_of_stream));
        Ok(())
    }

    fn allocate_serial(&mut self) -> u32 {
        self.next_serial = self.next_serial.wrapping_add(1);
        self.next_serial
    }
}

pub use self::ogg::{Demuxer, Multiplexer, OggPacketReader, OggPacketWriter};
