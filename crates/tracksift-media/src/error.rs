//! Error types for tracksift-media.

use std::io;
use thiserror::Error;

/// Result type for tracksift-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Terminal failure of an extraction.
///
/// Anything structural is fatal and surfaces here. Problems with a single
/// block or track are absorbed by the demuxer and never reach the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// The byte source could not be opened or read to completion.
    #[error("Source error: {0}")]
    Source(#[from] io::Error),

    /// Structurally invalid EBML.
    #[error("Decode error at byte {offset}: {message}")]
    Decode { offset: u64, message: String },

    /// The stream parsed cleanly but held no audio or subtitle tracks.
    #[error("No audio or subtitle tracks found")]
    EmptyResult,
}

impl Error {
    /// Create a decode error at the given absolute stream offset.
    pub fn decode(offset: u64, msg: impl Into<String>) -> Self {
        Self::Decode {
            offset,
            message: msg.into(),
        }
    }

    /// Create a source error from a message (transport status codes etc).
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Source(io::Error::other(msg.into()))
    }

    /// Whether this is the "parsed fine, found nothing" outcome.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::EmptyResult)
    }
}
