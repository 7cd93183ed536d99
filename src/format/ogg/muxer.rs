use super::skeleton::SkeletonStream;
use crate::av::Packet;
use crate::codec::StreamHeaders;
use crate::config::MuxerConfig;
use crate::error::{Result, XiphError};
use crate::format::{PacketSink, PageBoundary};
use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};

/// Logical streams to write into one container.
#[derive(Debug, Clone)]
pub struct ContainerLayout {
    primary: StreamHeaders,
    primary_serial: Option<u32>,
    companions: Vec<(StreamHeaders, Option<u32>)>,
    skeleton: Option<(SkeletonStream, Option<u32>)>,
}

impl ContainerLayout {
    /// Creates a layout with only a primary stream.
    pub fn new(primary: StreamHeaders) -> Self {
        Self {
            primary,
            primary_serial: None,
            companions: Vec::new(),
            skeleton: None,
        }
    }

    /// Fixes the primary serial instead of allocating one.
    pub fn with_primary_serial(mut self, serial: u32) -> Self {
        self.primary_serial = Some(serial);
        self
    }

    /// Adds a companion stream; without a serial one is allocated by the sink.
    pub fn with_companion(mut self, headers: StreamHeaders, serial: Option<u32>) -> Self {
        self.companions.push((headers, serial));
        self
    }

    /// Adds a skeleton stream, written first and closed last.
    pub fn with_skeleton(mut self, skeleton: SkeletonStream, serial: Option<u32>) -> Self {
        self.skeleton = Some((skeleton, serial));
        self
    }
}

/// Buffers one logical stream's packets until its current page is flushed.
#[derive(Debug)]
struct StreamWriter {
    serial: u32,
    pending: Vec<Bytes>,
    pending_bytes: usize,
    granule: Option<u64>,
    started: bool,
}

impl StreamWriter {
    fn new(serial: u32) -> Self {
        Self {
            serial,
            pending: Vec::new(),
            pending_bytes: 0,
            // header pages carry granule zero
            granule: Some(0),
            started: false,
        }
    }

    fn push(&mut self, data: Bytes) {
        self.pending_bytes += data.len();
        self.pending.push(data);
    }

    /// Writes pending packets as one page; the last one carries the granule.
    fn flush<K: PacketSink>(&mut self, sink: &mut K, end: PageBoundary) -> Result<()> {
        let count = self.pending.len();
        if count == 0 {
            return Ok(());
        }
        log::trace!(
            "flushing {} packets ({} bytes) on stream {}",
            count,
            self.pending_bytes,
            self.serial
        );

        for (i, data) in std::mem::take(&mut self.pending).into_iter().enumerate() {
            let last = i + 1 == count;
            let mut packet = Packet::new(data)
                .with_serial(self.serial)
                .with_begin_of_stream(!self.started);
            self.started = true;
            let boundary = if last {
                if let Some(granule) = self.granule {
                    packet = packet.with_granule(granule);
                }
                end
            } else {
                PageBoundary::Continue
            };
            sink.write_packet(packet, boundary)?;
        }
        self.pending_bytes = 0;
        Ok(())
    }

    fn write_header<K: PacketSink>(&mut self, sink: &mut K, packets: &[Bytes]) -> Result<()> {
        for packet in packets {
            self.push(packet.clone());
        }
        self.flush(sink, PageBoundary::EndPage)
    }

    fn write_payload<K: PacketSink>(
        &mut self,
        sink: &mut K,
        packet: Packet,
        threshold: usize,
    ) -> Result<()> {
        if let Some(granule) = packet.granule_position {
            if self.granule != Some(granule) {
                self.flush(sink, PageBoundary::EndPage)?;
                self.granule = Some(granule);
            }
        }
        self.push(packet.data);
        if self.pending_bytes > threshold {
            self.flush(sink, PageBoundary::EndPage)?;
        }
        Ok(())
    }

    /// Ends the stream, writing an empty end-of-stream packet if nothing is pending.
    fn close<K: PacketSink>(&mut self, sink: &mut K) -> Result<()> {
        if self.pending.is_empty() {
            self.push(Bytes::new());
        }
        self.flush(sink, PageBoundary::EndStream)?;
        log::debug!("closed stream {}", self.serial);
        Ok(())
    }
}

/// A registered stream with its serialized header packets.
#[derive(Debug)]
struct Registered {
    writer: StreamWriter,
    headers: [Bytes; 3],
}

/// Writes logical streams into a container.
///
/// Writing is two-phase: headers are registered when the multiplexer is
/// opened and payload packets are queued with [`Multiplexer::write_packet`].
/// Nothing reaches the sink until [`Multiplexer::finish`], which emits the
/// skeleton head, the identification headers, skeleton descriptors, the
/// remaining headers and then the queued payload, before closing every stream.
pub struct Multiplexer<K: PacketSink> {
    sink: K,
    config: MuxerConfig,
    streams: Vec<Registered>,
    index: HashMap<u32, usize>,
    skeleton: Option<(StreamWriter, SkeletonStream)>,
    queue: VecDeque<Packet>,
    last_granule: HashMap<u32, u64>,
}

impl<K: PacketSink> Multiplexer<K> {
    /// Writes every header packet of `layout` and returns a muxer ready for payload.
    pub fn open(mut sink: K, layout: ContainerLayout, config: MuxerConfig) -> Result<Self> {
        let ContainerLayout {
            primary,
            primary_serial,
            companions,
            skeleton,
        } = layout;

        let mut taken = HashSet::new();
        let requested = std::iter::once(primary_serial)
            .chain(companions.iter().map(|(_, serial)| *serial))
            .chain(skeleton.iter().map(|(_, serial)| *serial))
            .flatten();
        for serial in requested {
            if !taken.insert(serial) {
                return Err(XiphError::DuplicateStream(serial));
            }
        }

        let mut assign = |requested: Option<u32>, sink: &mut K| match requested {
            Some(serial) => serial,
            None => loop {
                let serial = sink.allocate_serial();
                if taken.insert(serial) {
                    break serial;
                }
            },
        };

        let mut streams = Vec::with_capacity(companions.len() + 1);
        let primary_serial = assign(primary_serial, &mut sink);
        log::debug!("primary {:?} stream {}", primary.codec_type(), primary_serial);
        streams.push(Registered {
            writer: StreamWriter::new(primary_serial),
            headers: primary.to_packets()?,
        });
        for (headers, serial) in companions {
            let serial = assign(serial, &mut sink);
            log::debug!("companion {:?} stream {}", headers.codec_type(), serial);
            streams.push(Registered {
                writer: StreamWriter::new(serial),
                headers: headers.to_packets()?,
            });
        }
        let skeleton = skeleton.map(|(skeleton, serial)| {
            let serial = assign(serial, &mut sink);
            log::debug!("skeleton stream {}", serial);
            (StreamWriter::new(serial), skeleton)
        });

        let index = streams
            .iter()
            .enumerate()
            .map(|(i, stream)| (stream.writer.serial, i))
            .collect();

        Ok(Self {
            sink,
            config,
            streams,
            index,
            skeleton,
            queue: VecDeque::new(),
            last_granule: HashMap::new(),
        })
    }

    /// Serial of the primary stream.
    pub fn primary_serial(&self) -> u32 {
        self.streams[0].writer.serial
    }

    /// Companion serials in registration order.
    pub fn companion_serials(&self) -> Vec<u32> {
        self.streams[1..]
            .iter()
            .map(|stream| stream.writer.serial)
            .collect()
    }

    /// Serial of the skeleton stream, if the layout had one.
    pub fn skeleton_serial(&self) -> Option<u32> {
        self.skeleton.as_ref().map(|(writer, _)| writer.serial)
    }

    /// Number of payload packets waiting for [`Multiplexer::finish`].
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Queues a payload packet for the stream named by its serial.
    pub fn write_packet(&mut self, packet: Packet) -> Result<()> {
        let serial = packet.serial;
        if !self.index.contains_key(&serial) {
            return Err(XiphError::UnknownStream {
                serial,
                packet: self.queue.len() as u64,
            });
        }
        if let Some(granule) = packet.granule_position {
            if let Some(&previous) = self.last_granule.get(&serial) {
                if granule < previous {
                    return Err(XiphError::GranuleRegression {
                        serial,
                        previous,
                        granule,
                    });
                }
            }
            self.last_granule.insert(serial, granule);
        }
        self.queue.push_back(packet);
        Ok(())
    }

    /// Writes everything out and returns the sink.
    pub fn finish(mut self) -> Result<K> {
        let sink = &mut self.sink;

        if let Some((writer, skeleton)) = self.skeleton.as_mut() {
            writer.write_header(sink, std::slice::from_ref(&skeleton.fishead))?;
        }
        for stream in &mut self.streams {
            stream.writer.write_header(sink, &stream.headers[..1])?;
        }
        if let Some((writer, skeleton)) = self.skeleton.as_mut() {
            writer.write_header(sink, &skeleton.descriptors)?;
        }
        for stream in &mut self.streams {
            stream.writer.write_header(sink, &stream.headers[1..])?;
        }

        log::debug!("writing {} payload packets", self.queue.len());
        let threshold = self.config.flush_threshold;
        while let Some(packet) = self.queue.pop_front() {
            let Some(&i) = self.index.get(&packet.serial) else {
                return Err(XiphError::UnknownStream {
                    serial: packet.serial,
                    packet: 0,
                });
            };
            self.streams[i].writer.write_payload(sink, packet, threshold)?;
        }

        for stream in &mut self.streams {
            stream.writer.close(sink)?;
        }
        if let Some((writer, _)) = self.skeleton.as_mut() {
            writer.close(sink)?;
        }
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CommentBlock, IdentificationHeader, SetupHeader, TheoraInfo, VorbisInfo};
    use crate::format::ogg::skeleton::{FISBONE_MAGIC, FISHEAD_MAGIC};
    use crate::format::MemoryPackets;
    use pretty_assertions::assert_eq;

    fn audio(vendor: &str) -> StreamHeaders {
        StreamHeaders::new(
            IdentificationHeader::Vorbis(VorbisInfo::new(2, 48_000)),
            CommentBlock::new(vendor),
            SetupHeader::new(vec![0x42; 4]),
        )
    }

    fn video() -> StreamHeaders {
        StreamHeaders::new(
            IdentificationHeader::Theora(TheoraInfo::new(32, 32)),
            CommentBlock::new("video"),
            SetupHeader::new(vec![0x01]),
        )
    }

    fn payload_granules(packets: &[Packet], serial: u32) -> Vec<Option<u64>> {
        packets
            .iter()
            .filter(|p| p.serial == serial && !p.is_empty() && p.data[0] == 0xEE)
            .map(|p| p.granule_position)
            .collect()
    }

    #[test]
    fn test_granule_changes_flush_pages() {
        let mut mux =
            Multiplexer::open(MemoryPackets::new(), ContainerLayout::new(audio("a")), MuxerConfig::default())
                .unwrap();
        let serial = mux.primary_serial();
        for granule in [5, 5, 12, 12, 20] {
            mux.write_packet(Packet::new(vec![0xEE; 8]).with_serial(serial).with_granule(granule))
                .unwrap();
        }
        let packets = mux.finish().unwrap().into_packets();

        let granules = payload_granules(&packets, serial);
        assert_eq!(
            granules,
            vec![None, Some(5), None, Some(12), Some(20)]
        );
        assert_eq!(granules.iter().flatten().count(), 3);
        assert!(packets.last().unwrap().end_of_stream);
    }

    #[test]
    fn test_header_order() {
        let mut fishead = FISHEAD_MAGIC.to_vec();
        fishead.resize(64, 0);
        let mut fisbone = FISBONE_MAGIC.to_vec();
        fisbone.resize(52, 0);
        let skeleton = SkeletonStream::new(fishead).with_descriptor(fisbone);

        let layout = ContainerLayout::new(video())
            .with_primary_serial(10)
            .with_companion(audio("a"), Some(20))
            .with_skeleton(skeleton, Some(5));
        let mux = Multiplexer::open(MemoryPackets::new(), layout, MuxerConfig::default()).unwrap();
        assert_eq!(mux.companion_serials(), vec![20]);
        assert_eq!(mux.skeleton_serial(), Some(5));

        let packets = mux.finish().unwrap().into_packets();
        let order: Vec<(u32, u8, bool)> = packets
            .iter()
            .map(|p| (p.serial, p.data.first().copied().unwrap_or(0), p.begin_of_stream))
            .collect();
        assert_eq!(
            order,
            vec![
                (5, b'f', true),
                (10, 0x80, true),
                (20, 0x01, true),
                (5, b'f', false),
                (10, 0x81, false),
                (10, 0x82, false),
                (20, 0x03, false),
                (20, 0x05, false),
                (10, 0, false),
                (20, 0, false),
                (5, 0, false),
            ]
        );
        assert!(packets[8..].iter().all(|p| p.end_of_stream && p.is_empty()));
    }

    #[test]
    fn test_companion_payload_uses_its_own_stream() {
        let layout = ContainerLayout::new(audio("a")).with_companion(audio("b"), None);
        let mut mux = Multiplexer::open(MemoryPackets::new(), layout, MuxerConfig::default()).unwrap();
        let primary = mux.primary_serial();
        let companion = mux.companion_serials()[0];
        assert_ne!(primary, companion);

        mux.write_packet(Packet::new(vec![0xEE]).with_serial(companion).with_granule(7))
            .unwrap();
        let packets = mux.finish().unwrap().into_packets();
        assert_eq!(payload_granules(&packets, companion), vec![Some(7)]);
        assert!(payload_granules(&packets, primary).is_empty());
    }

    #[test]
    fn test_flush_threshold() {
        let config = MuxerConfig::default().with_flush_threshold(10);
        let mut mux = Multiplexer::open(MemoryPackets::new(), ContainerLayout::new(audio("a")), config)
            .unwrap();
        let serial = mux.primary_serial();
        for _ in 0..3 {
            mux.write_packet(Packet::new(vec![0xEE; 6]).with_serial(serial)).unwrap();
        }
        let packets = mux.finish().unwrap().into_packets();
        // header pages carry granule zero; the page closed by the threshold does too
        assert_eq!(payload_granules(&packets, serial), vec![None, Some(0), Some(0)]);
    }

    #[test]
    fn test_unknown_stream_rejected() {
        let mut mux =
            Multiplexer::open(MemoryPackets::new(), ContainerLayout::new(audio("a")), MuxerConfig::default())
                .unwrap();
        let err = mux.write_packet(Packet::new(vec![1]).with_serial(mux.primary_serial() + 100));
        assert!(matches!(err, Err(XiphError::UnknownStream { .. })));
        assert_eq!(mux.queued(), 0);
    }

    #[test]
    fn test_granule_regression_rejected() {
        let mut mux =
            Multiplexer::open(MemoryPackets::new(), ContainerLayout::new(audio("a")), MuxerConfig::default())
                .unwrap();
        let serial = mux.primary_serial();
        mux.write_packet(Packet::new(vec![1]).with_serial(serial).with_granule(10))
            .unwrap();
        assert!(matches!(
            mux.write_packet(Packet::new(vec![1]).with_serial(serial).with_granule(9)),
            Err(XiphError::GranuleRegression {
                previous: 10,
                granule: 9,
                ..
            })
        ));
    }

    #[test]
    fn test_unreadable_header_rejected_on_open() {
        let headers = StreamHeaders::new(
            IdentificationHeader::Vorbis(VorbisInfo::new(0, 44_100)),
            CommentBlock::new("v"),
            SetupHeader::new(vec![0x42]),
        );
        assert!(matches!(
            Multiplexer::open(MemoryPackets::new(), ContainerLayout::new(headers), MuxerConfig::default()),
            Err(XiphError::InvalidData(_))
        ));
    }

    #[test]
    fn test_duplicate_serial_rejected() {
        let layout = ContainerLayout::new(audio("a"))
            .with_primary_serial(3)
            .with_companion(audio("b"), Some(3));
        assert!(matches!(
            Multiplexer::open(MemoryPackets::new(), layout, MuxerConfig::default()),
            Err(XiphError::DuplicateStream(3))
        ));
    }

    #[test]
    fn test_allocation_skips_explicit_serials() {
        // MemoryPackets allocates 1, 2, ...
        let layout = ContainerLayout::new(audio("a"))
            .with_primary_serial(1)
            .with_companion(audio("b"), None);
        let mux = Multiplexer::open(MemoryPackets::new(), layout, MuxerConfig::default()).unwrap();
        assert_eq!(mux.companion_serials(), vec![2]);
    }
}
