//! Matroska demuxing on top of the EBML event stream.
//!
//! [`Demuxer`] consumes tokenizer events and keeps all per-stream state:
//! the track registry, the active cluster timecode, block buffers for each
//! registered track and collected attachments. Nothing here is global, so
//! independent extractions never share state.
//!
//! Payloads handed over by the tokenizer share the tokenizer's read buffer.
//! Anything kept past the current event is copied out, so a small block never
//! pins the chunk it arrived in.

mod attachment;
mod block;
mod track;

pub use attachment::{Attachment, AttachmentCollector};
pub use block::{parse_block, BlockHeader, BufferedBlock};
pub use track::{
    normalize_language, MediaType, Track, TrackRegistry, DEFAULT_LANGUAGE, TRACK_TYPE_AUDIO,
    TRACK_TYPE_SUBTITLE,
};

use crate::ebml::{read_string, read_unsigned, Element, ElementId, Event};
use crate::{Error, Result};
use bytes::Bytes;

/// Default `TimecodeScale`: one tick per millisecond.
pub const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

/// Counters reported at the end of a demux run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DemuxStats {
    pub clusters: u64,
    pub blocks_accepted: u64,
    /// Blocks for tracks that were never registered.
    pub blocks_unmapped: u64,
    /// Blocks too short to hold a header, or with an invalid track vint.
    pub blocks_malformed: u64,
}

/// A registered track together with its buffered blocks.
#[derive(Debug, Clone)]
pub struct DemuxedTrack {
    pub track: Track,
    pub blocks: Vec<BufferedBlock>,
}

/// Everything the demuxer gathered from one stream.
#[derive(Debug, Clone)]
pub struct Demuxed {
    /// Tracks in registration order.
    pub tracks: Vec<DemuxedTrack>,
    pub timecode_scale: u64,
    pub attachments: Vec<Attachment>,
    pub stats: DemuxStats,
}

/// Fields of the `TrackEntry` currently open.
#[derive(Debug, Default)]
struct TrackEntryScratch {
    number: Option<u64>,
    track_type: Option<u64>,
    language: Option<String>,
    language_bcp47: Option<String>,
    codec_id: Option<String>,
    name: Option<String>,
    codec_private: Option<Bytes>,
}

/// Position of a buffered block: registration index, then block index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockRef {
    track: usize,
    block: usize,
}

/// State of the `BlockGroup` currently open.
#[derive(Debug, Default)]
struct GroupState {
    block: Option<BlockRef>,
    duration: Option<u64>,
}

/// Per-stream demux context.
#[derive(Debug)]
pub struct Demuxer {
    registry: TrackRegistry,
    buffers: Vec<Vec<BufferedBlock>>,
    entry: Option<TrackEntryScratch>,
    timecode_scale: u64,
    cluster_timecode: u64,
    group: Option<GroupState>,
    last_block: Option<BlockRef>,
    attachments: AttachmentCollector,
    stats: DemuxStats,
    retain_payloads: bool,
}

impl Default for Demuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl Demuxer {
    pub fn new() -> Self {
        Self {
            registry: TrackRegistry::new(),
            buffers: Vec::new(),
            entry: None,
            timecode_scale: DEFAULT_TIMECODE_SCALE,
            cluster_timecode: 0,
            group: None,
            last_block: None,
            attachments: AttachmentCollector::new(),
            stats: DemuxStats::default(),
            retain_payloads: true,
        }
    }

    /// Keep block contents and attachment data (the default).
    ///
    /// With `false` only metadata is kept: blocks are counted and timed but
    /// buffered empty, and attachments are recorded without their data.
    pub fn retain_payloads(mut self, retain: bool) -> Self {
        self.retain_payloads = retain;
        self
    }

    /// Registered tracks so far.
    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    pub fn timecode_scale(&self) -> u64 {
        self.timecode_scale
    }

    pub fn stats(&self) -> DemuxStats {
        self.stats
    }

    /// Apply one tokenizer event.
    pub fn handle(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::Start(element) => self.on_start(element),
            Event::Leaf(element, payload) => self.on_leaf(element, payload)?,
            Event::End(element) => self.on_end(element),
        }
        Ok(())
    }

    /// Consume the demuxer, pairing each registered track with its blocks.
    pub fn finish(self) -> Demuxed {
        tracing::debug!(
            "Demuxed {} tracks, {} clusters, {} blocks ({} unmapped, {} malformed)",
            self.registry.len(),
            self.stats.clusters,
            self.stats.blocks_accepted,
            self.stats.blocks_unmapped,
            self.stats.blocks_malformed
        );

        let tracks = self
            .registry
            .into_tracks()
            .into_iter()
            .zip(self.buffers)
            .map(|(track, blocks)| DemuxedTrack { track, blocks })
            .collect();

        Demuxed {
            tracks,
            timecode_scale: self.timecode_scale,
            attachments: self.attachments.into_attachments(),
            stats: self.stats,
        }
    }

    fn on_start(&mut self, element: &Element) {
        match element.id {
            ElementId::TRACK_ENTRY => self.entry = Some(TrackEntryScratch::default()),
            ElementId::CLUSTER => self.stats.clusters += 1,
            ElementId::BLOCK_GROUP => self.group = Some(GroupState::default()),
            ElementId::ATTACHED_FILE => self.attachments.open(),
            _ => {}
        }
    }

    fn on_end(&mut self, element: &Element) {
        match element.id {
            ElementId::TRACK_ENTRY => self.close_track_entry(element),
            ElementId::BLOCK_GROUP => {
                if let Some(GroupState {
                    block: None,
                    duration: Some(_),
                }) = self.group
                {
                    tracing::trace!("Discarding BlockDuration of a group without a kept block");
                }
                self.group = None;
            }
            ElementId::ATTACHED_FILE => self.attachments.close(),
            _ => {}
        }
    }

    fn on_leaf(&mut self, element: &Element, payload: &Bytes) -> Result<()> {
        match element.id {
            ElementId::TIMECODE_SCALE => {
                let scale = unsigned(element, payload)?;
                if scale == 0 {
                    tracing::warn!("Ignoring zero TimecodeScale");
                } else {
                    self.timecode_scale = scale;
                }
            }
            ElementId::TIMECODE => {
                self.cluster_timecode = unsigned(element, payload)?;
                tracing::trace!("Cluster timecode {}", self.cluster_timecode);
            }
            ElementId::SIMPLE_BLOCK | ElementId::BLOCK => self.on_block(element, payload),
            ElementId::BLOCK_DURATION => {
                let duration = unsigned(element, payload)?;
                self.on_block_duration(duration);
            }
            ElementId::FILE_NAME => self.attachments.set_name(read_string(payload)),
            ElementId::FILE_MIME_TYPE => self.attachments.set_mime_type(read_string(payload)),
            ElementId::FILE_DATA => {
                let data = self.retained(payload);
                self.attachments.set_data(data);
            }
            _ => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.apply(element, payload)?;
                }
            }
        }
        Ok(())
    }

    fn close_track_entry(&mut self, element: &Element) {
        let Some(entry) = self.entry.take() else {
            return;
        };

        let Some(number) = entry.number else {
            tracing::warn!(
                "Ignoring TrackEntry at byte {} without a TrackNumber",
                element.offset
            );
            return;
        };

        let Some(media_type) = entry.track_type.and_then(MediaType::from_track_type) else {
            tracing::debug!(
                "Skipping track {} with type {:?}",
                number,
                entry.track_type
            );
            return;
        };

        let language = entry
            .language
            .filter(|language| !language.is_empty())
            .or(entry.language_bcp47);

        let track = Track {
            number,
            media_type,
            language: normalize_language(language.as_deref()),
            codec_id: entry.codec_id,
            name: entry.name,
            codec_private: entry.codec_private,
        };

        let description = format!("{} track {} ({})", track.media_type, number, track.language);
        match self.registry.register(track) {
            Some(_) => {
                self.buffers.push(Vec::new());
                tracing::debug!("Registered {}", description);
            }
            None => tracing::warn!("Ignoring duplicate {}", description),
        }
    }

    fn on_block(&mut self, element: &Element, payload: &Bytes) {
        let Some((header, content)) = parse_block(payload) else {
            tracing::warn!(
                "Dropping malformed {} at byte {} ({} bytes)",
                element.name(),
                element.offset,
                payload.len()
            );
            self.stats.blocks_malformed += 1;
            self.last_block = None;
            return;
        };

        let Some(track) = self.registry.index_of(header.track_number) else {
            self.stats.blocks_unmapped += 1;
            self.last_block = None;
            return;
        };

        let content = self.retained(&content);

        let buffer = &mut self.buffers[track];
        let reference = BlockRef {
            track,
            block: buffer.len(),
        };

        let mut duration = None;
        if element.id == ElementId::BLOCK {
            if let Some(group) = self.group.as_mut() {
                duration = group.duration.take();
                group.block = Some(reference);
            }
        }

        buffer.push(BufferedBlock {
            content,
            relative_timestamp: header.relative_timestamp,
            cluster_timecode: self.cluster_timecode,
            duration,
        });
        self.last_block = Some(reference);
        self.stats.blocks_accepted += 1;
    }

    fn on_block_duration(&mut self, duration: u64) {
        let target = match self.group.as_mut() {
            Some(group) => match group.block {
                Some(reference) => Some(reference),
                None => {
                    group.duration = Some(duration);
                    None
                }
            },
            None => self
                .last_block
                .filter(|r| self.buffers[r.track][r.block].duration.is_none()),
        };

        if let Some(reference) = target {
            self.buffers[reference.track][reference.block].duration = Some(duration);
        }
    }

    /// Owned copy of a payload that outlives the current event.
    fn retained(&self, payload: &Bytes) -> Bytes {
        if self.retain_payloads {
            Bytes::copy_from_slice(payload)
        } else {
            Bytes::new()
        }
    }
}

impl TrackEntryScratch {
    fn apply(&mut self, element: &Element, payload: &Bytes) -> Result<()> {
        match element.id {
            ElementId::TRACK_NUMBER => self.number = Some(unsigned(element, payload)?),
            ElementId::TRACK_TYPE => self.track_type = Some(unsigned(element, payload)?),
            ElementId::LANGUAGE => self.language = Some(read_string(payload)),
            ElementId::LANGUAGE_BCP47 => self.language_bcp47 = Some(read_string(payload)),
            ElementId::CODEC_ID => self.codec_id = Some(read_string(payload)),
            ElementId::NAME => self.name = Some(read_string(payload)),
            ElementId::CODEC_PRIVATE => {
                self.codec_private = Some(Bytes::copy_from_slice(payload))
            }
            _ => {}
        }
        Ok(())
    }
}

fn unsigned(element: &Element, payload: &[u8]) -> Result<u64> {
    read_unsigned(payload).ok_or_else(|| {
        Error::decode(
            element.offset,
            format!(
                "{} is {} bytes, wider than an unsigned integer",
                element.name(),
                payload.len()
            ),
        )
    })
}
