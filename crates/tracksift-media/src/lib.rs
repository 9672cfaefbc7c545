//! Tracksift-Media: streaming Matroska/WebM demuxing and track extraction
//!
//! This crate pulls the audio and subtitle tracks out of a Matroska or WebM
//! byte stream in a single forward pass. Input arrives in chunks of any
//! size and nothing is seeked. Only the payloads of extracted tracks are
//! kept, each copied out of the read buffer, so skipped elements never
//! stay resident.
//!
//! # Modules
//!
//! - `ebml` - EBML vint decoding, element table, streaming tokenizer
//! - `demux` - Track registry, cluster timing, block demuxing, attachments
//! - `assemble` - Audio concatenation and SRT/ASS reconstruction
//! - `extract` - Push and async stream drivers returning one result
//!
//! # Architecture
//!
//! Each chunk flows through the same pipeline, synchronously and in order:
//!
//! 1. The tokenizer turns bytes into `Start`/`Leaf`/`End` events, keeping a
//!    partial element buffered across chunk boundaries
//! 2. The demuxer registers audio and subtitle tracks from `TrackEntry`
//!    elements and tracks the active cluster timecode
//! 3. Each block is routed to its track's buffer with its timing context
//!
//! When the stream ends, every registered track is assembled into one
//! artifact: concatenated audio payloads, or subtitle text with the timing
//! put back into each cue.

pub mod assemble;
pub mod demux;
pub mod ebml;
pub mod error;
pub mod extract;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use assemble::{Artifact, ArtifactKind, SubtitleFormat};
pub use demux::{Attachment, DemuxStats, MediaType, Track};
pub use ebml::Tokenizer;
pub use error::{Error, Result};
pub use extract::{extract, extract_bytes, ExtractOptions, Extraction, Extractor, TrackSummary};
