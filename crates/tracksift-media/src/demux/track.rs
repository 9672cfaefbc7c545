//! Track metadata and the track registry.

use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;

/// `TrackType` code registered as audio.
pub const TRACK_TYPE_AUDIO: u64 = 0x02;

/// `TrackType` code registered as subtitle. Other codes (video, buttons,
/// metadata) are never registered.
pub const TRACK_TYPE_SUBTITLE: u64 = 0x11;

/// Language used when a track declares none, or declares "und".
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Media type of a registered track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "lowercase"))]
pub enum MediaType {
    Audio,
    Subtitle,
}

impl MediaType {
    /// Classify a `TrackType` code. Other codes are not extracted.
    pub fn from_track_type(code: u64) -> Option<Self> {
        match code {
            TRACK_TYPE_AUDIO => Some(Self::Audio),
            TRACK_TYPE_SUBTITLE => Some(Self::Subtitle),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Subtitle => write!(f, "subtitle"),
        }
    }
}

/// A registered audio or subtitle track. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Track {
    /// Container track number (what blocks reference, not a position).
    pub number: u64,
    pub media_type: MediaType,
    /// ISO-639 language code, normalized.
    pub language: String,
    /// Matroska codec ID (`A_OPUS`, `S_TEXT/ASS`, ...).
    pub codec_id: Option<String>,
    /// Human-readable track name.
    pub name: Option<String>,
    /// Raw `CodecPrivate` payload. For text subtitles this is the header.
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub codec_private: Option<Bytes>,
}

impl Track {
    /// `CodecPrivate` decoded as text, empty if absent.
    pub fn codec_header_text(&self) -> String {
        self.codec_private
            .as_ref()
            .map(|data| String::from_utf8_lossy(data).into_owned())
            .unwrap_or_default()
    }
}

/// Normalize a declared language: absent or `und` become [`DEFAULT_LANGUAGE`].
pub fn normalize_language(language: Option<&str>) -> String {
    match language.map(str::trim) {
        None | Some("") | Some("und") => DEFAULT_LANGUAGE.to_string(),
        Some(language) => language.to_string(),
    }
}

/// Append-only set of registered tracks, in registration order.
#[derive(Debug, Default)]
pub struct TrackRegistry {
    tracks: Vec<Track>,
    by_number: HashMap<u64, usize>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a track, returning its registration index.
    ///
    /// Returns `None` (and registers nothing) if the number is taken.
    pub fn register(&mut self, track: Track) -> Option<usize> {
        if self.by_number.contains_key(&track.number) {
            return None;
        }
        let index = self.tracks.len();
        self.by_number.insert(track.number, index);
        self.tracks.push(track);
        Some(index)
    }

    /// Registration index of the track with the given number.
    pub fn index_of(&self, number: u64) -> Option<usize> {
        self.by_number.get(&number).copied()
    }

    pub fn get(&self, number: u64) -> Option<&Track> {
        self.index_of(number).map(|index| &self.tracks[index])
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }
}
