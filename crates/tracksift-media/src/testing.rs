//! EBML fixture builder for tests.
//!
//! Produces small, structurally valid Matroska byte streams. Only what the
//! extractor reads is written; this is not a muxer.

use crate::ebml::ElementId;
use bytes::{BufMut, BytesMut};

/// Encode a vint size with the shortest length that is not all-ones.
pub fn encode_size(size: u64) -> Vec<u8> {
    let length = (1..=8usize)
        .find(|&length| size < (1u64 << (7 * length)) - 1)
        .unwrap_or(8);
    let marked = size | (1u64 << (7 * length));
    marked.to_be_bytes()[8 - length..].to_vec()
}

fn encode_id(id: u32) -> Vec<u8> {
    let bytes = id.to_be_bytes();
    let skip = bytes.iter().take_while(|&&byte| byte == 0).count().min(3);
    bytes[skip..].to_vec()
}

/// A leaf element with a raw payload.
pub fn element(id: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(payload.len() + 12);
    buf.put_slice(&encode_id(id));
    buf.put_slice(&encode_size(payload.len() as u64));
    buf.put_slice(payload);
    buf.to_vec()
}

/// A master element of known size.
pub fn master(id: u32, children: &[Vec<u8>]) -> Vec<u8> {
    element(id, &children.concat())
}

/// A master element written with the reserved unknown size.
pub fn unknown_size_master(id: u32, children: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_slice(&encode_id(id));
    buf.put_u8(0xFF);
    for child in children {
        buf.put_slice(child);
    }
    buf.to_vec()
}

/// An unsigned integer leaf in its minimal big-endian form.
pub fn uint(id: u32, value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|&&byte| byte == 0).count().min(7);
    element(id, &bytes[skip..])
}

/// A string leaf.
pub fn string(id: u32, value: &str) -> Vec<u8> {
    element(id, value.as_bytes())
}

/// A (Simple)Block payload: track vint, relative timestamp, flags, content.
pub fn block_payload(track: u64, relative_timestamp: i16, flags: u8, content: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_slice(&encode_size(track));
    buf.put_i16(relative_timestamp);
    buf.put_u8(flags);
    buf.put_slice(content);
    buf.to_vec()
}

/// A block inside a test cluster.
#[derive(Debug, Clone)]
pub enum TestBlock {
    /// A `SimpleBlock` (never carries a duration).
    Simple {
        track: u64,
        timestamp: i16,
        content: Vec<u8>,
    },
    /// A `BlockGroup` with a `Block` and an optional `BlockDuration`.
    Group {
        track: u64,
        timestamp: i16,
        content: Vec<u8>,
        duration: Option<u64>,
    },
}

impl TestBlock {
    pub fn simple(track: u64, timestamp: i16, content: impl Into<Vec<u8>>) -> Self {
        Self::Simple {
            track,
            timestamp,
            content: content.into(),
        }
    }

    pub fn group(
        track: u64,
        timestamp: i16,
        content: impl Into<Vec<u8>>,
        duration: Option<u64>,
    ) -> Self {
        Self::Group {
            track,
            timestamp,
            content: content.into(),
            duration,
        }
    }

    fn encode(&self) -> Vec<u8> {
        match self {
            Self::Simple {
                track,
                timestamp,
                content,
            } => element(
                ElementId::SIMPLE_BLOCK.0,
                &block_payload(*track, *timestamp, 0x80, content),
            ),
            Self::Group {
                track,
                timestamp,
                content,
                duration,
            } => {
                let mut children = vec![element(
                    ElementId::BLOCK.0,
                    &block_payload(*track, *timestamp, 0x00, content),
                )];
                if let Some(duration) = duration {
                    children.push(uint(ElementId::BLOCK_DURATION.0, *duration));
                }
                master(ElementId::BLOCK_GROUP.0, &children)
            }
        }
    }
}

/// Track entry description for [`MatroskaBuilder`].
#[derive(Debug, Clone, Default)]
pub struct TestTrack {
    pub number: u64,
    pub track_type: u64,
    pub language: Option<String>,
    pub codec_id: Option<String>,
    pub codec_private: Option<Vec<u8>>,
}

impl TestTrack {
    pub fn new(number: u64, track_type: u64) -> Self {
        Self {
            number,
            track_type,
            ..Default::default()
        }
    }

    pub fn language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn codec_id(mut self, codec_id: &str) -> Self {
        self.codec_id = Some(codec_id.to_string());
        self
    }

    pub fn codec_private(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.codec_private = Some(data.into());
        self
    }

    fn encode(&self) -> Vec<u8> {
        let mut children = vec![
            uint(ElementId::TRACK_NUMBER.0, self.number),
            uint(ElementId::TRACK_UID.0, self.number * 1000 + 7),
            uint(ElementId::TRACK_TYPE.0, self.track_type),
        ];
        if let Some(ref codec_id) = self.codec_id {
            children.push(string(ElementId::CODEC_ID.0, codec_id));
        }
        if let Some(ref language) = self.language {
            children.push(string(ElementId::LANGUAGE.0, language));
        }
        if let Some(ref codec_private) = self.codec_private {
            children.push(element(ElementId::CODEC_PRIVATE.0, codec_private));
        }
        master(ElementId::TRACK_ENTRY.0, &children)
    }
}

/// Builder for synthetic Matroska streams.
#[derive(Debug, Clone, Default)]
pub struct MatroskaBuilder {
    timecode_scale: Option<u64>,
    tracks: Vec<TestTrack>,
    clusters: Vec<(u64, Vec<TestBlock>)>,
    attachments: Vec<(String, String, Vec<u8>)>,
    live: bool,
}

impl MatroskaBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `Info/TimecodeScale`.
    pub fn timecode_scale(mut self, nanos: u64) -> Self {
        self.timecode_scale = Some(nanos);
        self
    }

    /// Add a track entry.
    pub fn track(mut self, track: TestTrack) -> Self {
        self.tracks.push(track);
        self
    }

    /// Add a cluster with the given base timecode.
    pub fn cluster(mut self, timecode: u64, blocks: Vec<TestBlock>) -> Self {
        self.clusters.push((timecode, blocks));
        self
    }

    /// Add an attached file.
    pub fn attachment(mut self, name: &str, mime_type: &str, data: impl Into<Vec<u8>>) -> Self {
        self.attachments
            .push((name.to_string(), mime_type.to_string(), data.into()));
        self
    }

    /// Write Segment and Clusters with unknown sizes, as live WebM muxers do.
    pub fn live(mut self) -> Self {
        self.live = true;
        self
    }

    /// Serialize the stream.
    pub fn build(&self) -> Vec<u8> {
        let header = master(
            ElementId::EBML.0,
            &[
                uint(ElementId::EBML_VERSION.0, 1),
                uint(ElementId::EBML_READ_VERSION.0, 1),
                string(ElementId::DOC_TYPE.0, "matroska"),
                uint(ElementId::DOC_TYPE_VERSION.0, 4),
                uint(ElementId::DOC_TYPE_READ_VERSION.0, 2),
            ],
        );

        let mut info = vec![string(ElementId::MUXING_APP.0, "tracksift-tests")];
        if let Some(scale) = self.timecode_scale {
            info.push(uint(ElementId::TIMECODE_SCALE.0, scale));
        }

        let mut segment = vec![master(ElementId::INFO.0, &info)];

        let entries: Vec<Vec<u8>> = self.tracks.iter().map(TestTrack::encode).collect();
        segment.push(master(ElementId::TRACKS.0, &entries));

        if !self.attachments.is_empty() {
            let files: Vec<Vec<u8>> = self
                .attachments
                .iter()
                .enumerate()
                .map(|(i, (name, mime_type, data))| {
                    master(
                        ElementId::ATTACHED_FILE.0,
                        &[
                            string(ElementId::FILE_NAME.0, name),
                            string(ElementId::FILE_MIME_TYPE.0, mime_type),
                            element(ElementId::FILE_DATA.0, data),
                            uint(ElementId::FILE_UID.0, i as u64 + 1),
                        ],
                    )
                })
                .collect();
            segment.push(master(ElementId::ATTACHMENTS.0, &files));
        }

        for (timecode, blocks) in &self.clusters {
            let mut children = vec![uint(ElementId::TIMECODE.0, *timecode)];
            children.extend(blocks.iter().map(TestBlock::encode));
            segment.push(if self.live {
                unknown_size_master(ElementId::CLUSTER.0, &children)
            } else {
                master(ElementId::CLUSTER.0, &children)
            });
        }

        let segment = if self.live {
            unknown_size_master(ElementId::SEGMENT.0, &segment)
        } else {
            master(ElementId::SEGMENT.0, &segment)
        };

        [header, segment].concat()
    }
}
