//! Subtitle data structures

use crate::text;
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// SAMI file extension written on output
pub const SAMI_EXTENSION: &str = "smi";
/// SubRip file extension
pub const SUBRIP_EXTENSION: &str = "srt";

/// The two supported subtitle formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// SAMI: `<SYNC Start=ms>` markers, end times implied by the next marker
    Sami,
    /// SubRip: numbered blocks with explicit start and end timestamps
    SubRip,
}

impl Format {
    /// Canonical file extension
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Sami => SAMI_EXTENSION,
            Format::SubRip => SUBRIP_EXTENSION,
        }
    }

    /// The other format
    pub fn opposite(&self) -> Format {
        match self {
            Format::Sami => Format::SubRip,
            Format::SubRip => Format::Sami,
        }
    }

    /// Format announced by an extension, case-insensitively
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_ascii_lowercase().as_str() {
            "smi" | "sami" => Some(Format::Sami),
            "srt" => Some(Format::SubRip),
            _ => None,
        }
    }

    /// Format announced by a path's extension
    pub fn from_path(path: &Path) -> Option<Format> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Sami => f.write_str("SAMI"),
            Format::SubRip => f.write_str("SubRip"),
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sami" => Ok(Format::Sami),
            "subrip" => Ok(Format::SubRip),
            other => Format::from_extension(other)
                .ok_or_else(|| format!("unknown subtitle format '{}' (expected smi or srt)", s)),
        }
    }
}

/// Whether a path looks convertible: `.smi`, `.sami` or `.srt` in any case
pub fn is_subtitle_file(path: &Path) -> bool {
    Format::from_path(path).is_some()
}

/// One timed caption.
///
/// Times are stored as parsed; the sync offset is applied on every read and
/// the result clamped at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    /// Format the text came from
    pub format: Format,
    /// Start in milliseconds, without sync
    pub start_ms: i64,
    /// End in milliseconds, without sync
    pub end_ms: i64,
    /// Body as found in the source (may hold SAMI markup)
    pub text: String,
    /// Offset shared by every cue of one conversion
    pub sync_ms: i64,
}

impl Cue {
    pub fn new(format: Format, start_ms: i64, end_ms: i64, text: impl Into<String>) -> Self {
        Self {
            format,
            start_ms,
            end_ms,
            text: text.into(),
            sync_ms: 0,
        }
    }

    pub fn with_sync(mut self, sync_ms: i64) -> Self {
        self.sync_ms = sync_ms;
        self
    }

    /// Effective start
    pub fn start(&self) -> i64 {
        self.start_ms.saturating_add(self.sync_ms).max(0)
    }

    /// Effective end
    pub fn end(&self) -> i64 {
        self.end_ms.saturating_add(self.sync_ms).max(0)
    }

    /// Whether the cue stays on screen for any time after sync
    pub fn is_visible(&self) -> bool {
        self.end() > self.start()
    }

    /// Body as SAMI markup
    pub fn markup_text(&self) -> Cow<'_, str> {
        match self.format {
            Format::Sami => Cow::Borrowed(self.text.as_str()),
            Format::SubRip => text::plain_to_markup(&self.text),
        }
    }

    /// Body as plain text
    pub fn plain_text(&self) -> Cow<'_, str> {
        match self.format {
            Format::Sami => Cow::Owned(text::markup_to_plain(&self.text)),
            Format::SubRip => Cow::Borrowed(self.text.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_clamps_at_zero() {
        let cue = Cue::new(Format::SubRip, 500, 1_500, "hi").with_sync(-1_000);
        assert_eq!(cue.start(), 0);
        assert_eq!(cue.end(), 500);
        assert_eq!(cue.start_ms, 500);
    }

    #[test]
    fn test_sync_reads_are_stable() {
        let cue = Cue::new(Format::Sami, 1_000, 2_000, "hi").with_sync(250);
        assert_eq!(cue.start(), 1_250);
        assert_eq!(cue.start(), 1_250);
        assert_eq!(cue.end(), 2_250);
    }

    #[test]
    fn test_cue_shifted_before_zero_is_invisible() {
        let cue = Cue::new(Format::SubRip, 100, 900, "gone").with_sync(-5_000);
        assert_eq!(cue.end(), 0);
        assert!(!cue.is_visible());
        assert!(Cue::new(Format::SubRip, 0, 1, "x").is_visible());
    }

    #[test]
    fn test_text_rendering_depends_on_origin() {
        let sami = Cue::new(Format::Sami, 0, 1, "<P>one<br>two");
        assert_eq!(sami.plain_text(), "one\ntwo");
        assert_eq!(sami.markup_text(), "<P>one<br>two");

        let srt = Cue::new(Format::SubRip, 0, 1, "one\ntwo");
        assert_eq!(srt.plain_text(), "one\ntwo");
        assert_eq!(srt.markup_text(), "one<BR>\ntwo");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a/Movie.SMI")), Some(Format::Sami));
        assert_eq!(Format::from_path(Path::new("movie.sami")), Some(Format::Sami));
        assert_eq!(Format::from_path(Path::new("movie.Srt")), Some(Format::SubRip));
        assert_eq!(Format::from_path(Path::new("movie.txt")), None);
        assert!(!is_subtitle_file(Path::new("srt")));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("smi".parse::<Format>().unwrap(), Format::Sami);
        assert_eq!("SubRip".parse::<Format>().unwrap(), Format::SubRip);
        assert!("vtt".parse::<Format>().is_err());
    }
}
