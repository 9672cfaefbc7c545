//! Matroska element definitions.

use std::fmt;

/// EBML element ID, stored with its length marker bits (as written in the file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementId(pub u32);

/// Storage type of an element's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Container of child elements.
    Master,
    Unsigned,
    Signed,
    Float,
    /// ASCII string.
    String,
    Utf8,
    Date,
    Binary,
}

impl ElementKind {
    /// Whether the element is a container.
    pub fn is_master(&self) -> bool {
        matches!(self, Self::Master)
    }
}

/// Where an element may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    /// Top level of the stream (EBML header, Segment).
    Root,
    /// Anywhere (Void, CRC-32).
    Global,
    /// Directly inside the given master.
    Of(ElementId),
}

#[derive(Debug, Clone, Copy)]
struct ElementInfo {
    name: &'static str,
    kind: ElementKind,
    parent: Parent,
}

macro_rules! elements {
    ($($konst:ident = $id:literal, $name:literal, $kind:ident, $parent:expr;)*) => {
        impl ElementId {
            $(pub const $konst: Self = Self($id);)*
        }

        fn lookup(id: u32) -> Option<ElementInfo> {
            match id {
                $($id => Some(ElementInfo {
                    name: $name,
                    kind: ElementKind::$kind,
                    parent: $parent,
                }),)*
                _ => None,
            }
        }
    };
}

use Parent::{Global, Of, Root};

elements! {
    EBML = 0x1A45DFA3, "EBML", Master, Root;
    EBML_VERSION = 0x4286, "EBMLVersion", Unsigned, Of(ElementId::EBML);
    EBML_READ_VERSION = 0x42F7, "EBMLReadVersion", Unsigned, Of(ElementId::EBML);
    EBML_MAX_ID_LENGTH = 0x42F2, "EBMLMaxIDLength", Unsigned, Of(ElementId::EBML);
    EBML_MAX_SIZE_LENGTH = 0x42F3, "EBMLMaxSizeLength", Unsigned, Of(ElementId::EBML);
    DOC_TYPE = 0x4282, "DocType", String, Of(ElementId::EBML);
    DOC_TYPE_VERSION = 0x4287, "DocTypeVersion", Unsigned, Of(ElementId::EBML);
    DOC_TYPE_READ_VERSION = 0x4285, "DocTypeReadVersion", Unsigned, Of(ElementId::EBML);
    VOID = 0xEC, "Void", Binary, Global;
    CRC32 = 0xBF, "CRC-32", Binary, Global;

    SEGMENT = 0x18538067, "Segment", Master, Root;

    SEEK_HEAD = 0x114D9B74, "SeekHead", Master, Of(ElementId::SEGMENT);
    SEEK = 0x4DBB, "Seek", Master, Of(ElementId::SEEK_HEAD);
    SEEK_ID = 0x53AB, "SeekID", Binary, Of(ElementId::SEEK);
    SEEK_POSITION = 0x53AC, "SeekPosition", Unsigned, Of(ElementId::SEEK);

    INFO = 0x1549A966, "Info", Master, Of(ElementId::SEGMENT);
    SEGMENT_UID = 0x73A4, "SegmentUID", Binary, Of(ElementId::INFO);
    TIMECODE_SCALE = 0x2AD7B1, "TimecodeScale", Unsigned, Of(ElementId::INFO);
    DURATION = 0x4489, "Duration", Float, Of(ElementId::INFO);
    DATE_UTC = 0x4461, "DateUTC", Date, Of(ElementId::INFO);
    TITLE = 0x7BA9, "Title", Utf8, Of(ElementId::INFO);
    MUXING_APP = 0x4D80, "MuxingApp", Utf8, Of(ElementId::INFO);
    WRITING_APP = 0x5741, "WritingApp", Utf8, Of(ElementId::INFO);

    CLUSTER = 0x1F43B675, "Cluster", Master, Of(ElementId::SEGMENT);
    TIMECODE = 0xE7, "Timecode", Unsigned, Of(ElementId::CLUSTER);
    POSITION = 0xA7, "Position", Unsigned, Of(ElementId::CLUSTER);
    PREV_SIZE = 0xAB, "PrevSize", Unsigned, Of(ElementId::CLUSTER);
    SIMPLE_BLOCK = 0xA3, "SimpleBlock", Binary, Of(ElementId::CLUSTER);
    BLOCK_GROUP = 0xA0, "BlockGroup", Master, Of(ElementId::CLUSTER);
    BLOCK = 0xA1, "Block", Binary, Of(ElementId::BLOCK_GROUP);
    BLOCK_ADDITIONS = 0x75A1, "BlockAdditions", Binary, Of(ElementId::BLOCK_GROUP);
    BLOCK_DURATION = 0x9B, "BlockDuration", Unsigned, Of(ElementId::BLOCK_GROUP);
    REFERENCE_PRIORITY = 0xFA, "ReferencePriority", Unsigned, Of(ElementId::BLOCK_GROUP);
    REFERENCE_BLOCK = 0xFB, "ReferenceBlock", Signed, Of(ElementId::BLOCK_GROUP);
    CODEC_STATE = 0xA4, "CodecState", Binary, Of(ElementId::BLOCK_GROUP);
    DISCARD_PADDING = 0x75A2, "DiscardPadding", Signed, Of(ElementId::BLOCK_GROUP);

    TRACKS = 0x1654AE6B, "Tracks", Master, Of(ElementId::SEGMENT);
    TRACK_ENTRY = 0xAE, "TrackEntry", Master, Of(ElementId::TRACKS);
    TRACK_NUMBER = 0xD7, "TrackNumber", Unsigned, Of(ElementId::TRACK_ENTRY);
    TRACK_UID = 0x73C5, "TrackUID", Unsigned, Of(ElementId::TRACK_ENTRY);
    TRACK_TYPE = 0x83, "TrackType", Unsigned, Of(ElementId::TRACK_ENTRY);
    FLAG_ENABLED = 0xB9, "FlagEnabled", Unsigned, Of(ElementId::TRACK_ENTRY);
    FLAG_DEFAULT = 0x88, "FlagDefault", Unsigned, Of(ElementId::TRACK_ENTRY);
    FLAG_FORCED = 0x55AA, "FlagForced", Unsigned, Of(ElementId::TRACK_ENTRY);
    FLAG_LACING = 0x9C, "FlagLacing", Unsigned, Of(ElementId::TRACK_ENTRY);
    DEFAULT_DURATION = 0x23E383, "DefaultDuration", Unsigned, Of(ElementId::TRACK_ENTRY);
    NAME = 0x536E, "Name", Utf8, Of(ElementId::TRACK_ENTRY);
    LANGUAGE = 0x22B59C, "Language", String, Of(ElementId::TRACK_ENTRY);
    LANGUAGE_BCP47 = 0x22B59D, "LanguageBCP47", String, Of(ElementId::TRACK_ENTRY);
    CODEC_ID = 0x86, "CodecID", String, Of(ElementId::TRACK_ENTRY);
    CODEC_PRIVATE = 0x63A2, "CodecPrivate", Binary, Of(ElementId::TRACK_ENTRY);
    CODEC_NAME = 0x258688, "CodecName", Utf8, Of(ElementId::TRACK_ENTRY);
    CODEC_DELAY = 0x56AA, "CodecDelay", Unsigned, Of(ElementId::TRACK_ENTRY);
    SEEK_PRE_ROLL = 0x56BB, "SeekPreRoll", Unsigned, Of(ElementId::TRACK_ENTRY);
    CONTENT_ENCODINGS = 0x6D80, "ContentEncodings", Binary, Of(ElementId::TRACK_ENTRY);
    VIDEO = 0xE0, "Video", Master, Of(ElementId::TRACK_ENTRY);
    PIXEL_WIDTH = 0xB0, "PixelWidth", Unsigned, Of(ElementId::VIDEO);
    PIXEL_HEIGHT = 0xBA, "PixelHeight", Unsigned, Of(ElementId::VIDEO);
    AUDIO = 0xE1, "Audio", Master, Of(ElementId::TRACK_ENTRY);
    SAMPLING_FREQUENCY = 0xB5, "SamplingFrequency", Float, Of(ElementId::AUDIO);
    CHANNELS = 0x9F, "Channels", Unsigned, Of(ElementId::AUDIO);
    BIT_DEPTH = 0x6264, "BitDepth", Unsigned, Of(ElementId::AUDIO);

    CUES = 0x1C53BB6B, "Cues", Master, Of(ElementId::SEGMENT);
    CUE_POINT = 0xBB, "CuePoint", Master, Of(ElementId::CUES);
    CUE_TIME = 0xB3, "CueTime", Unsigned, Of(ElementId::CUE_POINT);
    CUE_TRACK_POSITIONS = 0xB7, "CueTrackPositions", Master, Of(ElementId::CUE_POINT);
    CUE_TRACK = 0xF7, "CueTrack", Unsigned, Of(ElementId::CUE_TRACK_POSITIONS);
    CUE_CLUSTER_POSITION = 0xF1, "CueClusterPosition", Unsigned, Of(ElementId::CUE_TRACK_POSITIONS);
    CUE_RELATIVE_POSITION = 0xF0, "CueRelativePosition", Unsigned, Of(ElementId::CUE_TRACK_POSITIONS);

    ATTACHMENTS = 0x1941A469, "Attachments", Master, Of(ElementId::SEGMENT);
    ATTACHED_FILE = 0x61A7, "AttachedFile", Master, Of(ElementId::ATTACHMENTS);
    FILE_DESCRIPTION = 0x467E, "FileDescription", Utf8, Of(ElementId::ATTACHED_FILE);
    FILE_NAME = 0x466E, "FileName", Utf8, Of(ElementId::ATTACHED_FILE);
    FILE_MIME_TYPE = 0x4660, "FileMimeType", String, Of(ElementId::ATTACHED_FILE);
    FILE_DATA = 0x465C, "FileData", Binary, Of(ElementId::ATTACHED_FILE);
    FILE_UID = 0x46AE, "FileUID", Unsigned, Of(ElementId::ATTACHED_FILE);

    // Masters nobody listens inside are read as opaque leaves.
    CHAPTERS = 0x1043A770, "Chapters", Binary, Of(ElementId::SEGMENT);
    TAGS = 0x1254C367, "Tags", Binary, Of(ElementId::SEGMENT);
}

impl ElementId {
    /// Semantic name, or `"Unknown"` for IDs outside the table.
    pub fn name(&self) -> &'static str {
        lookup(self.0).map(|info| info.name).unwrap_or("Unknown")
    }

    /// Payload kind. Unknown IDs are opaque binary leaves.
    pub fn kind(&self) -> ElementKind {
        lookup(self.0)
            .map(|info| info.kind)
            .unwrap_or(ElementKind::Binary)
    }

    /// Whether this element is a container.
    pub fn is_master(&self) -> bool {
        self.kind().is_master()
    }

    /// Whether the ID appears in the element table.
    pub fn is_known(&self) -> bool {
        lookup(self.0).is_some()
    }

    /// Where this element may appear. Unknown IDs are treated as global.
    pub fn parent(&self) -> Parent {
        lookup(self.0).map(|info| info.parent).unwrap_or(Global)
    }

    /// Whether this element may appear directly inside `master`.
    ///
    /// Used to find the end of unknown-size masters: the first element that
    /// is not a permitted child closes the master.
    pub fn may_appear_in(&self, master: ElementId) -> bool {
        match self.parent() {
            Root => false,
            Global => true,
            Of(parent) => parent == master,
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            write!(f, "{}", self.name())
        } else {
            write!(f, "0x{:X}", self.0)
        }
    }
}
