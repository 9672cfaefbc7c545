//! SRT and ASS/SSA text reconstruction.
//!
//! Matroska stores text subtitles as one block per cue with the timing moved
//! out into the container. ASS blocks carry `ReadOrder,Layer,Style,...,Text`
//! and the script header lives in `CodecPrivate`. Rendering puts the timing
//! back into each cue and stitches the header around the events.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write;
use std::sync::LazyLock;

/// `[Events]` section header plus its `Format:` line.
static EVENTS_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[Events\]\s+Format:([^\r\n]*)").expect("events pattern is valid")
});

/// Events section used when an ASS header does not declare one.
const DEFAULT_EVENTS_SECTION: &str = "[Events]\r\n\
    Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

/// Subtitle dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "lowercase"))]
pub enum SubtitleFormat {
    Srt,
    Ass,
}

impl SubtitleFormat {
    /// Pick the dialect from the codec header: any `Format:` line means ASS.
    pub fn detect(header: &str) -> Self {
        if header.contains("Format:") {
            Self::Ass
        } else {
            Self::Srt
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Ass => "ass",
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Srt => write!(f, "SRT"),
            Self::Ass => write!(f, "ASS"),
        }
    }
}

/// One timed subtitle entry, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub start_ms: i64,
    pub end_ms: i64,
    /// Block content: the cue text for SRT, the event fields for ASS.
    pub text: String,
}

/// Format as `HH:MM:SS,mmm`.
pub fn format_srt_timestamp(ms: i64) -> String {
    let ms = ms.max(0);
    format!(
        "{:02}:{:02}:{:02},{:03}",
        ms / 3_600_000,
        ms / 60_000 % 60,
        ms / 1000 % 60,
        ms % 1000
    )
}

/// Format as `H:MM:SS.CC`, rounded to the nearest centisecond.
pub fn format_ass_timestamp(ms: i64) -> String {
    let cs = ms.max(0).saturating_add(5) / 10;
    format!(
        "{}:{:02}:{:02}.{:02}",
        cs / 360_000,
        cs / 6000 % 60,
        cs / 100 % 60,
        cs % 100
    )
}

/// Render SRT: numbered cues separated by a blank line.
pub fn render_srt(cues: &[Cue]) -> String {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        if i > 0 {
            out.push_str("\r\n");
        }
        let _ = write!(
            out,
            "{}\r\n{} --> {}\r\n{}\r\n",
            i + 1,
            format_srt_timestamp(cue.start_ms),
            format_srt_timestamp(cue.end_ms),
            cue.text
        );
    }
    out
}

/// Rebuild an ASS `Dialogue:` line from a Matroska ASS block.
///
/// Returns the ReadOrder field and the line.
fn dialogue_line(cue: &Cue) -> (&str, String) {
    let mut fields = cue.text.splitn(3, ',');
    let read_order = fields.next().unwrap_or_default();
    let layer = fields.next().unwrap_or_default();

    let mut line = format!(
        "Dialogue: {},{},{}",
        layer,
        format_ass_timestamp(cue.start_ms),
        format_ass_timestamp(cue.end_ms)
    );
    if let Some(rest) = fields.next() {
        line.push(',');
        line.push_str(rest);
    }
    (read_order, line)
}

/// Render ASS from the codec header and the track's cues.
///
/// Events are ordered by numeric ReadOrder; cues sharing one are kept in
/// arrival order. Cues with a non-numeric ReadOrder follow.
pub fn render_ass(header: &str, cues: &[Cue]) -> String {
    let mut ordered: BTreeMap<u64, Vec<String>> = BTreeMap::new();
    let mut unordered = Vec::new();
    for cue in cues {
        let (read_order, line) = dialogue_line(cue);
        match read_order.trim().parse::<u64>() {
            Ok(index) => ordered.entry(index).or_default().push(line),
            Err(_) => unordered.push(line),
        }
    }
    let events = ordered
        .into_values()
        .flatten()
        .chain(unordered)
        .collect::<Vec<_>>()
        .join("\r\n");

    let (preamble, format_line, trailing) = match EVENTS_FORMAT.find(header) {
        Some(m) => (&header[..m.start()], m.as_str(), &header[m.end()..]),
        None => {
            tracing::debug!("ASS header has no [Events] Format line, using the V4+ default");
            let preamble = header.trim_end();
            let separator = if preamble.is_empty() { "" } else { "\r\n\r\n" };
            return format!("{preamble}{separator}{DEFAULT_EVENTS_SECTION}\r\n{events}\r\n");
        }
    };

    format!("{preamble}{format_line}\r\n{events}{trailing}\r\n")
}
