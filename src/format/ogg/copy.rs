use super::demuxer::Demuxer;
use super::muxer::{ContainerLayout, Multiplexer};
use crate::config::MuxerConfig;
use crate::error::Result;
use crate::format::{PacketSink, PacketSource};

/// Re-multiplexes every logical stream of `demuxer` into `sink`.
///
/// All payload is read first so companions and skeleton descriptors that
/// complete late are still part of the layout. Serial ids are kept as they
/// were in the source container.
pub fn copy_container<S, K>(demuxer: &mut Demuxer<S>, sink: K, config: MuxerConfig) -> Result<K>
where
    S: PacketSource,
    K: PacketSink,
{
    demuxer.open_headers()?;
    let mut payload = Vec::new();
    while let Some(packet) = demuxer.next_payload(None)? {
        payload.push(packet);
    }

    let headers = demuxer.headers()?;
    let mut layout = ContainerLayout::new(headers.primary).with_primary_serial(headers.primary_serial);
    for (serial, companion) in headers.companions {
        layout = layout.with_companion(companion, Some(serial));
    }
    if let (Some(serial), Some(skeleton)) = (headers.skeleton_serial, headers.skeleton) {
        layout = layout.with_skeleton(skeleton, Some(serial));
    }

    log::debug!("copying {} payload packets", payload.len());
    let mut muxer = Multiplexer::open(sink, layout, config)?;
    for packet in payload {
        muxer.write_packet(packet)?;
    }
    muxer.finish()
}
