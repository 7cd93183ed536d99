use super::classify::{PacketClassifier, PacketKind};
use super::skeleton::SkeletonStream;
use crate::av::{CodecData, CodecType, HeaderRole, Packet};
use crate::codec::{decode_comments, CommentBlock, IdentificationHeader, SetupHeader, StreamHeaders};
use crate::config::DemuxerConfig;
use crate::error::{Result, XiphError};
use crate::format::PacketSource;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Header progress of one logical stream. Streams not yet seen have no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    /// Identification header seen.
    AwaitingComments,
    /// Comment header seen.
    AwaitingSetup,
    /// All three headers seen.
    Ready,
}

/// Header sets discovered while opening a container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerHeaders {
    /// Serial of the primary stream.
    pub primary_serial: u32,
    /// Headers of the primary stream.
    pub primary: StreamHeaders,
    /// Companion streams whose three headers are complete.
    pub companions: BTreeMap<u32, StreamHeaders>,
    /// Serial of the skeleton stream, if any.
    pub skeleton_serial: Option<u32>,
    /// Skeleton packets seen during discovery.
    pub skeleton: Option<SkeletonStream>,
}

/// One logical stream being demultiplexed.
#[derive(Debug)]
struct LogicalStream {
    serial: u32,
    codec: CodecType,
    state: HeaderState,
    identification: Option<IdentificationHeader>,
    comments: Option<CommentBlock>,
    headers: Option<StreamHeaders>,
    last_granule: Option<u64>,
}

impl LogicalStream {
    fn new(serial: u32, identification: IdentificationHeader) -> Self {
        Self {
            serial,
            codec: identification.codec_type(),
            state: HeaderState::AwaitingComments,
            identification: Some(identification),
            comments: None,
            headers: None,
            last_granule: None,
        }
    }

    /// Feeds the next header packet through the state machine.
    fn advance(&mut self, classifier: &PacketClassifier, data: &[u8]) -> Result<()> {
        let expected = match self.state {
            HeaderState::AwaitingComments => HeaderRole::Comments,
            HeaderState::AwaitingSetup => HeaderRole::Setup,
            HeaderState::Ready => return Ok(()),
        };
        let role = match classifier.classify(self.codec, data) {
            PacketKind::Header { role, .. } => Some(role),
            _ => None,
        };
        if role != Some(expected) {
            return Err(XiphError::MalformedMagic {
                codec: self.codec,
                expected,
            });
        }

        match self.state {
            HeaderState::AwaitingComments => {
                self.comments = Some(decode_comments(self.codec, data)?);
                self.state = HeaderState::AwaitingSetup;
            }
            _ => {
                let setup = SetupHeader::decode(self.codec, data)?;
                let (Some(identification), Some(comments)) =
                    (self.identification.take(), self.comments.take())
                else {
                    return Err(XiphError::IncompleteHeaders {
                        serial: self.serial,
                    });
                };
                self.headers = Some(StreamHeaders::new(identification, comments, setup));
                self.state = HeaderState::Ready;
            }
        }
        Ok(())
    }

    fn track_granule(&mut self, granule: Option<u64>) {
        let Some(granule) = granule else {
            return;
        };
        if let Some(previous) = self.last_granule {
            if granule < previous {
                log::warn!(
                    "granule position on stream {} went back from {} to {}",
                    self.serial,
                    previous,
                    granule
                );
            }
        }
        self.last_granule = Some(granule);
    }
}

/// What routing did with a raw packet.
enum Routed {
    Payload(Packet),
    Header,
    Consumed,
}

/// Splits an interleaved container into logical streams.
///
/// Opening reads packets until the primary stream (the first one of the
/// requested codec family) has its three headers, buffering any payload seen
/// on the way so [`Demuxer::next_payload`] still returns packets in arrival
/// order.
pub struct Demuxer<S: PacketSource> {
    source: S,
    target: CodecType,
    config: DemuxerConfig,
    classifier: PacketClassifier,
    streams: HashMap<u32, LogicalStream>,
    primary: Option<u32>,
    skeleton_serial: Option<u32>,
    skeleton: Option<SkeletonStream>,
    ignored: HashSet<u32>,
    lookahead: VecDeque<Packet>,
    packets_read: u64,
    opened: bool,
}

impl<S: PacketSource> Demuxer<S> {
    /// Demuxes a container whose primary stream is of the `target` family.
    pub fn new(source: S, target: CodecType) -> Self {
        Self::with_config(source, target, DemuxerConfig::default())
    }

    /// Creates a demuxer with explicit settings.
    pub fn with_config(source: S, target: CodecType, config: DemuxerConfig) -> Self {
        Self {
            source,
            target,
            config,
            classifier: PacketClassifier::default(),
            streams: HashMap::new(),
            primary: None,
            skeleton_serial: None,
            skeleton: None,
            ignored: HashSet::new(),
            lookahead: VecDeque::new(),
            packets_read: 0,
            opened: false,
        }
    }

    /// Replaces the header classifier.
    pub fn with_classifier(mut self, classifier: PacketClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Reads header packets until the primary stream is ready.
    ///
    /// Fails with [`XiphError::NotAContainerOfExpectedType`] if no stream of
    /// the target family shows up. Calling it again returns the current
    /// header sets without reading.
    pub fn open_headers(&mut self) -> Result<ContainerHeaders> {
        if self.opened {
            return self.headers();
        }

        let mut primary_payloads = 0usize;
        loop {
            if self.discovery_done(primary_payloads) {
                log::debug!(
                    "header discovery done after {} packets, {} buffered",
                    self.packets_read,
                    self.lookahead.len()
                );
                break;
            }
            let Some(packet) = self.source.read_packet()? else {
                break;
            };
            // every begin-of-stream packet precedes the first data page
            if self.primary.is_none() && !packet.begin_of_stream {
                log::debug!(
                    "no {:?} stream among the first {} packets",
                    self.target,
                    self.packets_read
                );
                return Err(XiphError::NotAContainerOfExpectedType(self.target));
            }
            match self.route(packet)? {
                Routed::Payload(packet) => {
                    if Some(packet.serial) == self.primary {
                        primary_payloads += 1;
                    }
                    self.lookahead.push_back(packet);
                }
                Routed::Header => primary_payloads = 0,
                Routed::Consumed => {}
            }
        }

        let Some(primary) = self.primary else {
            return Err(XiphError::NotAContainerOfExpectedType(self.target));
        };
        if self.state(primary) != Some(HeaderState::Ready) {
            return Err(XiphError::IncompleteHeaders { serial: primary });
        }
        for stream in self.streams.values() {
            if stream.state != HeaderState::Ready {
                log::debug!("companion stream {} still tentative", stream.serial);
            }
        }

        self.opened = true;
        self.headers()
    }

    /// Returns the next payload packet across all streams, or `None` at the end.
    ///
    /// With a filter, packets of streams not listed are skipped.
    pub fn next_payload(&mut self, filter: Option<&[u32]>) -> Result<Option<Packet>> {
        if !self.opened {
            self.open_headers()?;
        }
        let accepts = |serial: u32| filter.map_or(true, |ids| ids.contains(&serial));

        while let Some(packet) = self.lookahead.pop_front() {
            if accepts(packet.serial) {
                return Ok(Some(packet));
            }
        }

        loop {
            let Some(packet) = self.source.read_packet()? else {
                for stream in self.streams.values() {
                    if stream.state != HeaderState::Ready {
                        log::warn!(
                            "stream {} ended before its headers were complete",
                            stream.serial
                        );
                    }
                }
                return Ok(None);
            };
            if let Routed::Payload(packet) = self.route(packet)? {
                if accepts(packet.serial) {
                    return Ok(Some(packet));
                }
            }
        }
    }

    /// Current header sets; companions appear once their headers complete.
    pub fn headers(&self) -> Result<ContainerHeaders> {
        let primary_serial = self
            .primary
            .ok_or(XiphError::NotAContainerOfExpectedType(self.target))?;
        let primary = self
            .stream_headers(primary_serial)
            .cloned()
            .ok_or(XiphError::IncompleteHeaders {
                serial: primary_serial,
            })?;
        let companions = self
            .streams
            .values()
            .filter(|stream| stream.serial != primary_serial)
            .filter_map(|stream| stream.headers.clone().map(|h| (stream.serial, h)))
            .collect();

        Ok(ContainerHeaders {
            primary_serial,
            primary,
            companions,
            skeleton_serial: self.skeleton_serial,
            skeleton: self.skeleton.clone(),
        })
    }

    /// Serial of the primary stream, once seen.
    pub fn primary_serial(&self) -> Option<u32> {
        self.primary
    }

    /// Headers of a ready stream.
    pub fn stream_headers(&self, serial: u32) -> Option<&StreamHeaders> {
        self.streams.get(&serial)?.headers.as_ref()
    }

    /// Header state of a known stream.
    pub fn state(&self, serial: u32) -> Option<HeaderState> {
        self.streams.get(&serial).map(|stream| stream.state)
    }

    /// Skeleton packets collected so far.
    pub fn skeleton(&self) -> Option<&SkeletonStream> {
        self.skeleton.as_ref()
    }

    /// Raw packets read from the source so far.
    pub fn packets_read(&self) -> u64 {
        self.packets_read
    }

    /// Consumes the demuxer, returning the source. Buffered packets are lost.
    pub fn into_source(self) -> S {
        self.source
    }

    fn discovery_done(&self, primary_payloads: usize) -> bool {
        let Some(primary) = self.primary else {
            return false;
        };
        if self.state(primary) != Some(HeaderState::Ready) {
            return false;
        }
        primary_payloads >= self.config.lookahead_limit
            || self
                .streams
                .values()
                .all(|stream| stream.state == HeaderState::Ready)
    }

    fn route(&mut self, packet: Packet) -> Result<Routed> {
        let ordinal = self.packets_read;
        self.packets_read += 1;
        let serial = packet.serial;
        log::trace!(
            "packet {} on stream {}: {} bytes, bos={}, eos={}",
            ordinal,
            serial,
            packet.len(),
            packet.begin_of_stream,
            packet.end_of_stream
        );

        if self.skeleton_serial == Some(serial) {
            if let Some(skeleton) = self.skeleton.as_mut() {
                skeleton.push(packet.data);
            }
            return Ok(Routed::Consumed);
        }
        if self.ignored.contains(&serial) {
            return Ok(Routed::Consumed);
        }

        let Some(stream) = self.streams.get_mut(&serial) else {
            if packet.begin_of_stream {
                return self.begin_stream(packet, ordinal);
            }
            return Err(XiphError::UnknownStream {
                serial,
                packet: ordinal,
            });
        };

        if stream.state != HeaderState::Ready {
            stream
                .advance(&self.classifier, &packet.data)
                .map_err(|err| err.in_stream(serial, ordinal))?;
            if stream.state == HeaderState::Ready {
                log::debug!("stream {} ({:?}) headers complete", serial, stream.codec);
            }
            return Ok(Routed::Header);
        }

        if packet.is_empty() && packet.end_of_stream {
            log::trace!("stream {} closed", serial);
            return Ok(Routed::Consumed);
        }
        stream.track_granule(packet.granule_position);
        Ok(Routed::Payload(packet))
    }

    fn begin_stream(&mut self, packet: Packet, ordinal: u64) -> Result<Routed> {
        let serial = packet.serial;
        match self.classifier.sniff(&packet.data, true) {
            PacketKind::Skeleton if self.skeleton_serial.is_none() => {
                log::debug!("skeleton stream {}", serial);
                self.skeleton_serial = Some(serial);
                self.skeleton = Some(SkeletonStream::new(packet.data));
                Ok(Routed::Header)
            }
            PacketKind::Header {
                codec,
                role: HeaderRole::Identification,
            } => {
                let identification = IdentificationHeader::decode(codec, &packet.data)
                    .map_err(|err| err.in_stream(serial, ordinal))?;
                if self.primary.is_none() && codec == self.target {
                    log::debug!("primary {:?} stream {}", codec, serial);
                    self.primary = Some(serial);
                } else {
                    log::debug!("candidate companion {:?} stream {}", codec, serial);
                }
                self.streams
                    .insert(serial, LogicalStream::new(serial, identification));
                Ok(Routed::Header)
            }
            PacketKind::Header { codec, .. } => Err(XiphError::MalformedMagic {
                codec,
                expected: HeaderRole::Identification,
            }
            .in_stream(serial, ordinal)),
            _ => {
                log::warn!("ignoring stream {} of unknown type", serial);
                self.ignored.insert(serial);
                Ok(Routed::Consumed)
            }
        }
    }
}
