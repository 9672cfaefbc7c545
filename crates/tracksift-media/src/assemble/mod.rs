//! Track reassembly into output artifacts.
//!
//! Runs once the stream has ended: each registered track's buffered blocks
//! become one artifact, in registration order.

mod subtitle;

pub use subtitle::{
    format_ass_timestamp, format_srt_timestamp, render_ass, render_srt, Cue, SubtitleFormat,
};

use crate::demux::{BufferedBlock, DemuxedTrack, MediaType, Track};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// MIME type of reassembled audio.
pub const AUDIO_MIME_TYPE: &str = "audio/webm";

/// Kind of an [`Artifact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "lowercase"))]
pub enum ArtifactKind {
    Audio,
    Subtitle,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Subtitle => write!(f, "subtitle"),
        }
    }
}

/// A reassembled track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Concatenated block payloads of an audio track.
    Audio {
        name: String,
        mime_type: String,
        data: Bytes,
    },
    /// Reconstructed subtitle text.
    Subtitle {
        name: String,
        format: SubtitleFormat,
        text: String,
    },
}

impl Artifact {
    /// Suggested file name, e.g. `Audio_eng.webm` or `Subtitle_jpn.ass`.
    pub fn name(&self) -> &str {
        match self {
            Self::Audio { name, .. } | Self::Subtitle { name, .. } => name,
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Audio { .. } => ArtifactKind::Audio,
            Self::Subtitle { .. } => ArtifactKind::Subtitle,
        }
    }

    /// Artifact contents as bytes (subtitle text is UTF-8).
    pub fn data(&self) -> &[u8] {
        match self {
            Self::Audio { data, .. } => data,
            Self::Subtitle { text, .. } => text.as_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }
}

/// Convert timecode ticks to milliseconds under the given `TimecodeScale`.
///
/// Saturates at the `i64` bounds.
pub fn ticks_to_ms(ticks: i64, timecode_scale: u64) -> i64 {
    let nanos = i128::from(ticks).saturating_mul(i128::from(timecode_scale));
    (nanos / 1_000_000).clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Build one artifact per demuxed track, preserving order.
pub fn assemble(tracks: &[DemuxedTrack], timecode_scale: u64) -> Vec<Artifact> {
    tracks
        .iter()
        .map(|demuxed| match demuxed.track.media_type {
            MediaType::Audio => assemble_audio(&demuxed.track, &demuxed.blocks),
            MediaType::Subtitle => {
                assemble_subtitle(&demuxed.track, &demuxed.blocks, timecode_scale)
            }
        })
        .collect()
}

/// Concatenate block payloads in arrival order.
pub fn assemble_audio(track: &Track, blocks: &[BufferedBlock]) -> Artifact {
    let total = blocks.iter().map(|block| block.content.len()).sum();
    let mut data = BytesMut::with_capacity(total);
    for block in blocks {
        data.put_slice(&block.content);
    }

    Artifact::Audio {
        name: format!("Audio_{}.webm", track.language),
        mime_type: AUDIO_MIME_TYPE.to_string(),
        data: data.freeze(),
    }
}

/// Render the track's blocks as SRT or ASS, depending on its codec header.
pub fn assemble_subtitle(track: &Track, blocks: &[BufferedBlock], timecode_scale: u64) -> Artifact {
    let header = track.codec_header_text();
    let format = SubtitleFormat::detect(&header);

    let cues: Vec<Cue> = blocks
        .iter()
        .map(|block| Cue {
            start_ms: ticks_to_ms(block.start_ticks(), timecode_scale),
            end_ms: ticks_to_ms(block.end_ticks(), timecode_scale),
            text: String::from_utf8_lossy(&block.content).into_owned(),
        })
        .collect();

    let text = match format {
        SubtitleFormat::Srt => render_srt(&cues),
        SubtitleFormat::Ass => render_ass(&header, &cues),
    };

    Artifact::Subtitle {
        name: format!("Subtitle_{}.{}", track.language, format.extension()),
        format,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(number: u64, media_type: MediaType, language: &str) -> Track {
        Track {
            number,
            media_type,
            language: language.to_string(),
            codec_id: None,
            name: None,
            codec_private: None,
        }
    }

    fn block(content: &'static [u8], rel: i16, cluster: u64, duration: Option<u64>) -> BufferedBlock {
        BufferedBlock {
            content: Bytes::from_static(content),
            relative_timestamp: rel,
            cluster_timecode: cluster,
            duration,
        }
    }

    #[test]
    fn test_ticks_to_ms() {
        assert_eq!(ticks_to_ms(1500, 1_000_000), 1500);
        assert_eq!(ticks_to_ms(1500, 100_000), 150);
        assert_eq!(ticks_to_ms(3, 1_000_000_000), 3000);
        assert_eq!(ticks_to_ms(-40, 1_000_000), -40);
        assert_eq!(ticks_to_ms(i64::MAX, u64::MAX), i64::MAX);
        assert_eq!(ticks_to_ms(i64::MIN, u64::MAX), i64::MIN);
    }

    #[test]
    fn test_subtitle_far_future_cue_saturates() {
        let artifact = assemble_subtitle(
            &track(3, MediaType::Subtitle, "eng"),
            &[block(b"Late", 5, u64::MAX / 2, Some(u64::MAX / 2))],
            1_000_000_000,
        );
        assert_eq!(
            artifact.data(),
            b"1\r\n2562047788015:12:55,807 --> 2562047788015:12:55,807\r\nLate\r\n"
        );
    }

    #[test]
    fn test_audio_concatenates_in_arrival_order() {
        let blocks = [block(b"ab", 0, 0, None), block(b"", 10, 0, None), block(b"cd", 20, 0, None)];
        let artifact = assemble_audio(&track(1, MediaType::Audio, "eng"), &blocks);

        assert_eq!(artifact.name(), "Audio_eng.webm");
        assert_eq!(artifact.kind(), ArtifactKind::Audio);
        assert_eq!(artifact.data(), b"abcd");
        match artifact {
            Artifact::Audio { mime_type, .. } => assert_eq!(mime_type, "audio/webm"),
            other => panic!("expected audio, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_tracks_still_produce_artifacts() {
        let tracks = [
            DemuxedTrack {
                track: track(1, MediaType::Audio, "eng"),
                blocks: Vec::new(),
            },
            DemuxedTrack {
                track: track(2, MediaType::Subtitle, "fre"),
                blocks: Vec::new(),
            },
        ];
        let artifacts = assemble(&tracks, 1_000_000);
        assert_eq!(artifacts.len(), 2);
        assert!(artifacts[0].is_empty());
        assert_eq!(artifacts[1].name(), "Subtitle_fre.srt");
    }

    #[test]
    fn test_subtitle_zero_length_cue_without_duration() {
        let artifact = assemble_subtitle(
            &track(3, MediaType::Subtitle, "eng"),
            &[block(b"Hi", 500, 1000, None)],
            1_000_000,
        );
        assert_eq!(
            artifact.data(),
            b"1\r\n00:00:01,500 --> 00:00:01,500\r\nHi\r\n"
        );
    }

    #[test]
    fn test_subtitle_honours_timecode_scale() {
        let artifact = assemble_subtitle(
            &track(3, MediaType::Subtitle, "eng"),
            &[block(b"Hi", 50, 100, Some(20))],
            10_000_000,
        );
        assert_eq!(
            artifact.data(),
            b"1\r\n00:00:01,500 --> 00:00:01,700\r\nHi\r\n"
        );
    }

    #[test]
    fn test_ass_track_uses_codec_header() {
        let mut t = track(2, MediaType::Subtitle, "jpn");
        t.codec_private = Some(Bytes::from_static(
            b"[Script Info]\r\n\r\n[Events]\r\nFormat: Layer, Start, End, Style, Text\r\n",
        ));
        let artifact = assemble_subtitle(&t, &[block(b"0,0,Default,Hello", 0, 0, Some(1000))], 1_000_000);

        assert_eq!(artifact.name(), "Subtitle_jpn.ass");
        assert_eq!(
            std::str::from_utf8(artifact.data()).unwrap(),
            "[Script Info]\r\n\r\n[Events]\r\nFormat: Layer, Start, End, Style, Text\r\n\
             Dialogue: 0,0:00:00.00,0:00:01.00,Default,Hello\r\n\r\n"
        );
    }
}
