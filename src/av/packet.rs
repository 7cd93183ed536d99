use bytes::Bytes;

/// One packet of a logical stream.
///
/// This is both the unit exchanged with the page framer and the payload
/// packet handed back to callers by the demuxer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet contents.
    pub data: Bytes,
    /// Serial id of the owning logical stream.
    pub serial: u32,
    /// First packet of its logical stream.
    pub begin_of_stream: bool,
    /// Last packet of its logical stream.
    pub end_of_stream: bool,
    /// Codec-defined timestamp; `None` when not known for this packet.
    pub granule_position: Option<u64>,
}

impl Packet {
    /// Creates a packet on serial 0 with no flags and no granule position.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            serial: 0,
            begin_of_stream: false,
            end_of_stream: false,
            granule_position: None,
        }
    }

    /// Sets the owning stream.
    pub fn with_serial(mut self, serial: u32) -> Self {
        self.serial = serial;
        self
    }

    /// Sets the granule position.
    pub fn with_granule(mut self, granule: u64) -> Self {
        self.granule_position = Some(granule);
        self
    }

    /// Sets the begin-of-stream flag.
    pub fn with_begin_of_stream(mut self, bos: bool) -> Self {
        self.begin_of_stream = bos;
        self
    }

    /// Sets the end-of-stream flag.
    pub fn with_end_of_stream(mut self, eos: bool) -> Self {
        self.end_of_stream = eos;
        self
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
