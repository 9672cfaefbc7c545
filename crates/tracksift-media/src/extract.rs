//! Single-pass extraction driver.
//!
//! [`Extractor`] wires the tokenizer, demuxer and assembler together for
//! input pushed in chunks. [`extract`] drives it from an async byte stream
//! and resolves exactly once: with every artifact, or with the first error.

use crate::assemble::{assemble, Artifact};
use crate::demux::{Attachment, DemuxStats, Demuxer, Track};
use crate::ebml::{Tokenizer, DEFAULT_MAX_ELEMENT_SIZE};
use crate::{Error, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::io;

/// Extraction settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Largest leaf element the tokenizer will buffer.
    pub max_element_size: u64,
    /// Keep block content and attachment data. When `false`, tracks are
    /// registered and blocks counted, but audio artifacts come out empty.
    pub retain_payloads: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_element_size: DEFAULT_MAX_ELEMENT_SIZE,
            retain_payloads: true,
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_element_size(mut self, max_element_size: u64) -> Self {
        self.max_element_size = max_element_size;
        self
    }

    /// Metadata-only pass: nothing but track info, timing and counts is kept.
    pub fn metadata_only(mut self) -> Self {
        self.retain_payloads = false;
        self
    }
}

/// A registered track and how many blocks it received.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackSummary {
    #[cfg_attr(feature = "serialize", serde(flatten))]
    pub track: Track,
    pub block_count: usize,
}

/// Result of a completed extraction.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Registered tracks, in registration order.
    pub tracks: Vec<TrackSummary>,
    /// One artifact per registered track, in the same order.
    pub artifacts: Vec<Artifact>,
    pub attachments: Vec<Attachment>,
    pub stats: DemuxStats,
}

/// Push-driven extraction state machine.
#[derive(Debug)]
pub struct Extractor {
    tokenizer: Tokenizer,
    demuxer: Demuxer,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(&ExtractOptions::default())
    }
}

impl Extractor {
    pub fn new(options: &ExtractOptions) -> Self {
        Self {
            tokenizer: Tokenizer::with_max_element_size(options.max_element_size),
            demuxer: Demuxer::new().retain_payloads(options.retain_payloads),
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.tokenizer.position()
    }

    /// Feed the next chunk and process every complete element in it.
    pub fn push(&mut self, chunk: &[u8]) -> Result<()> {
        self.tokenizer.feed(chunk);
        while let Some(event) = self.tokenizer.next_event()? {
            self.demuxer.handle(&event)?;
        }
        Ok(())
    }

    /// End of input: close the stream and assemble artifacts.
    ///
    /// Fails with [`Error::EmptyResult`] when no audio or subtitle track was
    /// registered.
    pub fn finish(mut self) -> Result<Extraction> {
        for event in self.tokenizer.finish()? {
            self.demuxer.handle(&event)?;
        }

        let demuxed = self.demuxer.finish();
        let artifacts = assemble(&demuxed.tracks, demuxed.timecode_scale);
        if artifacts.is_empty() {
            return Err(Error::EmptyResult);
        }

        tracing::info!(
            "Extracted {} artifacts and {} attachments from {} bytes",
            artifacts.len(),
            demuxed.attachments.len(),
            self.tokenizer.position()
        );

        let tracks = demuxed
            .tracks
            .into_iter()
            .map(|demuxed| TrackSummary {
                block_count: demuxed.blocks.len(),
                track: demuxed.track,
            })
            .collect();

        Ok(Extraction {
            tracks,
            artifacts,
            attachments: demuxed.attachments,
            stats: demuxed.stats,
        })
    }
}

/// Extract audio and subtitle tracks from a chunked byte stream.
///
/// Chunks may have any size. The stream is dropped at the first error and
/// no partial result is returned.
pub async fn extract<S>(source: S, options: &ExtractOptions) -> Result<Extraction>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    let mut source = std::pin::pin!(source);
    let mut extractor = Extractor::new(options);

    while let Some(chunk) = source.next().await {
        let chunk = chunk?;
        extractor.push(&chunk)?;
    }

    extractor.finish()
}

/// Extract from a complete in-memory buffer.
pub fn extract_bytes(data: &[u8], options: &ExtractOptions) -> Result<Extraction> {
    let mut extractor = Extractor::new(options);
    extractor.push(data)?;
    extractor.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::{ArtifactKind, SubtitleFormat};
    use crate::demux::MediaType;
    use crate::testing::{MatroskaBuilder, TestBlock, TestTrack};
    use futures::stream;

    const ASS_HEADER: &str = "[Script Info]\r\nScriptType: v4.00+\r\n\r\n[Events]\r\n\
        Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\r\n";

    fn chunked(data: &[u8], size: usize) -> impl Stream<Item = io::Result<Bytes>> {
        let chunks: Vec<io::Result<Bytes>> = data
            .chunks(size)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        stream::iter(chunks)
    }

    fn sample() -> Vec<u8> {
        MatroskaBuilder::new()
            .track(TestTrack::new(1, 0x01).codec_id("V_VP9"))
            .track(TestTrack::new(2, 0x02).codec_id("A_OPUS").language("und"))
            .track(
                TestTrack::new(3, 0x11)
                    .codec_id("S_TEXT/ASS")
                    .language("jpn")
                    .codec_private(ASS_HEADER),
            )
            .track(TestTrack::new(4, 0x11).codec_id("S_TEXT/UTF8").language("eng"))
            .cluster(
                0,
                vec![
                    TestBlock::simple(1, 0, "video"),
                    TestBlock::simple(2, 0, "aa"),
                    TestBlock::group(3, 100, "1,0,Default,,0,0,0,,Later", Some(50)),
                    TestBlock::group(4, 200, "First line", Some(300)),
                ],
            )
            .cluster(
                1000,
                vec![
                    TestBlock::simple(2, 0, "bb"),
                    TestBlock::group(3, 0, "0,0,Default,,0,0,0,,Earlier", Some(100)),
                    TestBlock::simple(9, 0, "orphan"),
                ],
            )
            .build()
    }

    #[tokio::test]
    async fn test_extracts_one_artifact_per_track_in_order() {
        let extraction = extract(chunked(&sample(), 4096), &ExtractOptions::default())
            .await
            .unwrap();

        let names: Vec<&str> = extraction.artifacts.iter().map(Artifact::name).collect();
        assert_eq!(
            names,
            vec!["Audio_eng.webm", "Subtitle_jpn.ass", "Subtitle_eng.srt"]
        );
        assert_eq!(extraction.artifacts[0].kind(), ArtifactKind::Audio);
        assert_eq!(extraction.artifacts[0].data(), b"aabb");

        assert_eq!(extraction.tracks.len(), 3);
        assert_eq!(extraction.tracks[0].track.media_type, MediaType::Audio);
        assert_eq!(extraction.tracks[0].block_count, 2);
        assert_eq!(extraction.tracks[1].block_count, 2);
        assert_eq!(extraction.stats.blocks_unmapped, 2);
    }

    #[tokio::test]
    async fn test_one_byte_chunks_match_whole_stream() {
        let data = sample();
        let whole = extract(chunked(&data, data.len()), &ExtractOptions::default())
            .await
            .unwrap();
        let bytewise = extract(chunked(&data, 1), &ExtractOptions::default())
            .await
            .unwrap();
        let odd = extract(chunked(&data, 7), &ExtractOptions::default())
            .await
            .unwrap();

        assert_eq!(whole.artifacts, bytewise.artifacts);
        assert_eq!(whole.artifacts, odd.artifacts);
        assert_eq!(whole.tracks, bytewise.tracks);
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let data = sample();
        let first = extract_bytes(&data, &ExtractOptions::default()).unwrap();
        let second = extract(chunked(&data, 13), &ExtractOptions::default())
            .await
            .unwrap();
        assert_eq!(first.artifacts, second.artifacts);
    }

    #[test]
    fn test_ass_track_reassembly() {
        let extraction = extract_bytes(&sample(), &ExtractOptions::default()).unwrap();
        match &extraction.artifacts[1] {
            Artifact::Subtitle { format, text, .. } => {
                assert_eq!(*format, SubtitleFormat::Ass);
                assert_eq!(
                    text,
                    "[Script Info]\r\nScriptType: v4.00+\r\n\r\n[Events]\r\n\
                     Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\r\n\
                     Dialogue: 0,0:00:01.00,0:00:01.10,Default,,0,0,0,,Earlier\r\n\
                     Dialogue: 0,0:00:00.10,0:00:00.15,Default,,0,0,0,,Later\r\n\r\n"
                );
            }
            other => panic!("expected subtitle, got {:?}", other),
        }
    }

    #[test]
    fn test_srt_scenario() {
        let data = MatroskaBuilder::new()
            .track(TestTrack::new(1, 0x11).language("eng"))
            .cluster(1000, vec![TestBlock::group(1, 500, "Hello", Some(200))])
            .build();

        let extraction = extract_bytes(&data, &ExtractOptions::default()).unwrap();
        assert_eq!(extraction.artifacts.len(), 1);
        assert_eq!(extraction.artifacts[0].name(), "Subtitle_eng.srt");
        assert_eq!(
            extraction.artifacts[0].data(),
            b"1\r\n00:00:01,500 --> 00:00:01,700\r\nHello\r\n"
        );
    }

    #[test]
    fn test_track_type_codes_are_respected() {
        let data = MatroskaBuilder::new()
            .track(TestTrack::new(1, 0x02).language("ger"))
            .track(TestTrack::new(2, 0x12).language("fre"))
            .track(TestTrack::new(3, 0x11).language("spa"))
            .build();

        let extraction = extract_bytes(&data, &ExtractOptions::default()).unwrap();
        let names: Vec<&str> = extraction.artifacts.iter().map(Artifact::name).collect();
        assert_eq!(names, vec!["Audio_ger.webm", "Subtitle_spa.srt"]);
    }

    #[test]
    fn test_no_tracks_is_empty_result() {
        let data = MatroskaBuilder::new()
            .track(TestTrack::new(1, 0x01))
            .cluster(0, vec![TestBlock::simple(1, 0, "frame")])
            .build();
        let err = extract_bytes(&data, &ExtractOptions::default()).unwrap_err();
        assert!(err.is_empty_result());

        let err = extract_bytes(&[], &ExtractOptions::default()).unwrap_err();
        assert!(err.is_empty_result());
    }

    #[tokio::test]
    async fn test_live_stream_with_unknown_sizes() {
        let data = MatroskaBuilder::new()
            .live()
            .track(TestTrack::new(1, 0x02).language("eng"))
            .cluster(0, vec![TestBlock::simple(1, 0, "one")])
            .cluster(20, vec![TestBlock::simple(1, 0, "two")])
            .build();

        let extraction = extract(chunked(&data, 3), &ExtractOptions::default())
            .await
            .unwrap();
        assert_eq!(extraction.artifacts[0].data(), b"onetwo");
        assert_eq!(extraction.stats.clusters, 2);
    }

    #[test]
    fn test_timecode_scale_applies_to_cues() {
        let data = MatroskaBuilder::new()
            .timecode_scale(10_000_000)
            .track(TestTrack::new(1, 0x11))
            .cluster(100, vec![TestBlock::group(1, 50, "Scaled", Some(20))])
            .build();

        let extraction = extract_bytes(&data, &ExtractOptions::default()).unwrap();
        assert_eq!(
            extraction.artifacts[0].data(),
            b"1\r\n00:00:01,500 --> 00:00:01,700\r\nScaled\r\n"
        );
    }

    #[test]
    fn test_attachments_are_returned_but_do_not_count() {
        let data = MatroskaBuilder::new()
            .track(TestTrack::new(1, 0x11))
            .attachment("font.ttf", "font/ttf", b"FONT".to_vec())
            .build();
        let extraction = extract_bytes(&data, &ExtractOptions::default()).unwrap();
        assert_eq!(extraction.attachments.len(), 1);
        assert_eq!(extraction.attachments[0].name, "font.ttf");

        let data = MatroskaBuilder::new()
            .attachment("font.ttf", "font/ttf", b"FONT".to_vec())
            .build();
        let err = extract_bytes(&data, &ExtractOptions::default()).unwrap_err();
        assert!(err.is_empty_result());
    }

    #[tokio::test]
    async fn test_source_error_stops_extraction() {
        let data = sample();
        let chunks = vec![
            Ok(Bytes::copy_from_slice(&data[..32])),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::copy_from_slice(&data[32..])),
        ];
        let err = extract(stream::iter(chunks), &ExtractOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Source(_)));
    }

    #[test]
    fn test_truncated_stream_is_decode_error() {
        let data = sample();
        let err = extract_bytes(&data[..data.len() - 3], &ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_metadata_only_keeps_tracks_and_counts() {
        let data = sample();
        let full = extract_bytes(&data, &ExtractOptions::default()).unwrap();
        let listing = extract_bytes(&data, &ExtractOptions::new().metadata_only()).unwrap();

        assert_eq!(listing.tracks, full.tracks);
        assert_eq!(listing.stats, full.stats);
        let names: Vec<&str> = listing.artifacts.iter().map(Artifact::name).collect();
        assert_eq!(
            names,
            vec!["Audio_eng.webm", "Subtitle_jpn.ass", "Subtitle_eng.srt"]
        );
        assert!(listing.artifacts[0].is_empty());
    }

    #[test]
    fn test_far_future_timecodes_do_not_panic() {
        let data = MatroskaBuilder::new()
            .timecode_scale(1_000_000_000)
            .track(
                TestTrack::new(1, 0x11)
                    .codec_id("S_TEXT/ASS")
                    .codec_private(ASS_HEADER),
            )
            .cluster(
                1 << 60,
                vec![TestBlock::group(1, 5, "0,0,Default,,0,0,0,,Late", Some(u64::MAX / 2))],
            )
            .build();

        let extraction = extract_bytes(&data, &ExtractOptions::default()).unwrap();
        let text = std::str::from_utf8(extraction.artifacts[0].data()).unwrap();
        assert!(text.contains(
            "Dialogue: 0,2562047788015:12:55.80,2562047788015:12:55.80,Default,,0,0,0,,Late"
        ));
    }

    #[test]
    fn test_max_element_size_is_enforced() {
        let data = MatroskaBuilder::new()
            .track(TestTrack::new(1, 0x02))
            .cluster(0, vec![TestBlock::simple(1, 0, vec![0u8; 1024])])
            .build();
        let options = ExtractOptions::new().max_element_size(512);
        let err = extract_bytes(&data, &options).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }
}
