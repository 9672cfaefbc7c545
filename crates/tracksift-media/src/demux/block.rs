//! Block parsing and per-track block buffers.

use crate::ebml::read_vint;
use bytes::Bytes;

/// Bytes after the track-number vint: 2-byte timestamp and 1 flags byte.
const BLOCK_HEADER_TAIL: usize = 3;

/// Fixed header of a `Block` or `SimpleBlock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Track number the block belongs to.
    pub track_number: u64,
    /// Timestamp relative to the cluster, in timecode ticks.
    pub relative_timestamp: i16,
    pub flags: u8,
}

impl BlockHeader {
    /// Keyframe flag (SimpleBlock only).
    pub fn is_keyframe(&self) -> bool {
        self.flags & 0x80 != 0
    }

    /// Lacing mode bits. Laced payloads are kept verbatim.
    pub fn lacing(&self) -> u8 {
        (self.flags >> 1) & 0x03
    }
}

/// Split a block payload into its header and content.
///
/// Returns `None` if the track-number vint is invalid or the payload is too
/// short to hold the header.
pub fn parse_block(payload: &Bytes) -> Option<(BlockHeader, Bytes)> {
    let track = read_vint(payload)?;
    let content_start = track.length + BLOCK_HEADER_TAIL;
    if payload.len() < content_start {
        return None;
    }

    let timestamp = i16::from_be_bytes([payload[track.length], payload[track.length + 1]]);
    let header = BlockHeader {
        track_number: track.value,
        relative_timestamp: timestamp,
        flags: payload[track.length + 2],
    };

    Some((header, payload.slice(content_start..)))
}

/// One block buffered for a registered track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedBlock {
    /// Block content after the header.
    pub content: Bytes,
    /// Timestamp relative to its cluster, in timecode ticks.
    pub relative_timestamp: i16,
    /// Base timecode of the cluster active when the block was read.
    pub cluster_timecode: u64,
    /// `BlockDuration` in timecode ticks, if the block had one.
    pub duration: Option<u64>,
}

impl BufferedBlock {
    /// Absolute start in timecode ticks, saturating at `i64::MAX`.
    pub fn start_ticks(&self) -> i64 {
        saturate(self.cluster_timecode).saturating_add(i64::from(self.relative_timestamp))
    }

    /// Absolute end in timecode ticks; zero-length without a duration.
    pub fn end_ticks(&self) -> i64 {
        self.start_ticks()
            .saturating_add(saturate(self.duration.unwrap_or(0)))
    }
}

fn saturate(ticks: u64) -> i64 {
    i64::try_from(ticks).unwrap_or(i64::MAX)
}
