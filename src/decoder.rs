//! SAMI and SubRip decoders

use crate::error::{Error, Result};
use crate::subtitle::{Cue, Format};
use crate::text;
use crate::timecode;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::mem;

static SAMI_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"));
// Whitespace and digits are ASCII only; U+00A0, U+3000 and full-width
// digits are caption text.
static SAMI_SYNC_SPLIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[\t\n\x0B\x0C\r ]*<sync[\t\n\x0B\x0C\r ]+").expect("valid sync split regex")
});
static SAMI_SYNC_DATA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)start=['"]?([0-9]+)['"]?[\t\n\x0B\x0C\r ]*[^>]*>[\t\n\x0B\x0C\r ]*(.*)"#)
        .expect("valid sync data regex")
});
static SUBRIP_SPLIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\t\n\x0B\x0C\r ]{2,}[0-9]+[\t\n\x0B\x0C\r ]+").expect("valid block split regex")
});
static SUBRIP_TIMING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)([^\t\n\x0B\x0C\r ]+)[ \t]+-->[ \t]+([^\t\n\x0B\x0C\r ]+)(.*)")
        .expect("valid timing line regex")
});

const SUBRIP_ARROW: &str = "-->";

/// Split like a regex split, minus trailing empty pieces
fn split_segments<'t>(pattern: &Regex, input: &'t str) -> Vec<&'t str> {
    let mut segments: Vec<&str> = pattern.split(input).collect();
    while segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }
    segments
}

/// Running state while folding SAMI markers into cues
struct SamiFold {
    sync_ms: i64,
    /// Text of the previous marker, not yet given an end time
    pending_text: String,
    /// Time of the previous marker
    pending_start: i64,
    /// Index of the last emitted cue
    last: Option<usize>,
    cues: Vec<Cue>,
}

impl SamiFold {
    fn new(sync_ms: i64) -> Self {
        Self {
            sync_ms,
            pending_text: String::new(),
            pending_start: 0,
            last: None,
            cues: Vec::new(),
        }
    }

    /// Close the pending text at `time` and make `text` pending
    fn push_marker(&mut self, time: i64, text: String) {
        let start = mem::replace(&mut self.pending_start, time);
        let pending = mem::replace(&mut self.pending_text, text);

        if pending.is_empty() {
            return;
        }

        if let Some(last) = self.last {
            let cue = &mut self.cues[last];
            if cue.text == pending {
                cue.end_ms = time;
                return;
            }
            if cue.end_ms > start {
                cue.end_ms = start;
            }
        }

        self.cues.push(Cue::new(Format::Sami, start, time, pending).with_sync(self.sync_ms));
        self.last = Some(self.cues.len() - 1);
    }

    fn finish(self) -> Vec<Cue> {
        self.cues
    }
}

/// Parses subtitle text into cues.
///
/// Input must already be decoded and LF-normalized. The decoders return
/// `Ok(None)` when the text is not in their format, and an error only for
/// content they recognize but cannot read.
pub struct Decoder {
    /// File name used in error messages
    source: String,
    /// Sync offset stamped on every cue
    sync_ms: i64,
}

impl Decoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self {
            source: String::from("<memory>"),
            sync_ms: 0,
        }
    }

    /// Name the source in error messages
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Sync offset applied to every parsed cue
    pub fn with_sync(mut self, sync_ms: i64) -> Self {
        self.sync_ms = sync_ms;
        self
    }

    fn time_error(&self, index: usize, value: impl Into<String>) -> Error {
        Error::TimeParse {
            file: self.source.clone(),
            index,
            value: value.into(),
        }
    }

    /// Detect the format and decode.
    ///
    /// `hint` (usually from the file extension) is tried first. Without a
    /// hint, or when the hinted decoder declines, SAMI is tried before SubRip.
    pub fn decode(&self, input: &str, hint: Option<Format>) -> Result<(Format, Vec<Cue>)> {
        let hinted = match hint {
            Some(Format::Sami) => self.decode_sami(input)?,
            Some(Format::SubRip) => self.decode_subrip(input)?,
            None => None,
        };
        if let (Some(format), Some(cues)) = (hint, hinted) {
            return Ok((format, cues));
        }

        if hint.is_some() {
            debug!("{}: content does not match its extension, detecting", self.source);
        }

        if let Some(cues) = self.decode_sami(input)? {
            return Ok((Format::Sami, cues));
        }
        if let Some(cues) = self.decode_subrip(input)? {
            return Ok((Format::SubRip, cues));
        }

        Err(Error::UnknownFormat { file: self.source.clone() })
    }

    /// Decode SAMI. Each `<SYNC>` marker ends the caption started by the
    /// previous one; repeated identical captions merge into one cue.
    pub fn decode_sami(&self, input: &str) -> Result<Option<Vec<Cue>>> {
        let input = SAMI_COMMENT.replace_all(input, "");
        let segments = split_segments(&SAMI_SYNC_SPLIT, &input);

        if segments.len() < 2 {
            return Ok(None);
        }

        let mut fold = SamiFold::new(self.sync_ms);
        for segment in segments {
            let Some(caps) = SAMI_SYNC_DATA.captures(segment) else {
                continue;
            };

            let time = caps[1]
                .parse::<i64>()
                .map_err(|_| self.time_error(fold.cues.len() + 1, &caps[1]))?;
            fold.push_marker(time, caps[2].trim_matches(text::is_ascii_space).to_string());
        }

        let cues = fold.finish();
        debug!("{}: {} SAMI cues", self.source, cues.len());
        Ok(Some(cues))
    }

    /// Decode SubRip
    pub fn decode_subrip(&self, input: &str) -> Result<Option<Vec<Cue>>> {
        let segments = split_segments(&SUBRIP_SPLIT, input);

        if segments.len() < 2 || !segments.iter().any(|s| s.contains(SUBRIP_ARROW)) {
            return Ok(None);
        }

        let mut cues = Vec::new();
        for segment in segments {
            if let Some(cue) = self.decode_subrip_block(segment, cues.len() + 1)? {
                cues.push(cue);
            }
        }

        debug!("{}: {} SubRip cues", self.source, cues.len());
        Ok(Some(cues))
    }

    /// Decode one SubRip block (optional index line, timing line, body).
    ///
    /// Blocks without an arrow and blocks with an empty body yield `None`.
    /// A timing line that does not hold two valid timestamps is an
    /// [`Error::TimeParse`] for cue `index` (1-based).
    pub fn decode_subrip_block(&self, block: &str, index: usize) -> Result<Option<Cue>> {
        if !block.contains(SUBRIP_ARROW) {
            return Ok(None);
        }

        let Some(caps) = SUBRIP_TIMING.captures(block) else {
            let line = block
                .lines()
                .find(|line| line.contains(SUBRIP_ARROW))
                .unwrap_or(block);
            return Err(self.time_error(index, line.trim_matches(text::is_ascii_space)));
        };

        let start = timecode::parse(&caps[1]).map_err(|e| self.time_error(index, e.0))?;
        let end = timecode::parse(&caps[2]).map_err(|e| self.time_error(index, e.0))?;

        let body = text::normalize_plain(&caps[3]);
        if body.is_empty() {
            debug!("{}: cue {} has no text, skipped", self.source, index);
            return Ok(None);
        }

        Ok(Some(Cue::new(Format::SubRip, start, end, body).with_sync(self.sync_ms)))
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{Encoder, LineDelimiter};

    fn sami_doc(body: &str) -> String {
        format!(
            "<SAMI>\n<HEAD>\n<TITLE></TITLE>\n<STYLE><!--\nP {{ margin: 0; }}\n--></STYLE>\n</HEAD>\n<BODY>\n{}</BODY>\n</SAMI>",
            body
        )
    }

    #[test]
    fn test_decode_sami_merges_repeated_text() {
        let input = sami_doc(
            "<SYNC Start=0><P>A\n<SYNC Start=1000><P>A\n<SYNC Start=2000><P>B\n<SYNC Start=3000><P>&nbsp;\n",
        );

        let cues = Decoder::new().decode_sami(&input).unwrap().unwrap();

        assert_eq!(cues.len(), 2);
        assert_eq!((cues[0].start_ms, cues[0].end_ms), (0, 2000));
        assert_eq!(cues[0].text, "<P>A");
        assert_eq!((cues[1].start_ms, cues[1].end_ms), (2000, 3000));
        assert_eq!(cues[1].text, "<P>B");
    }

    #[test]
    fn test_decode_sami_last_marker_has_no_cue() {
        let input = sami_doc("<SYNC Start=500><P>only\n");
        let cues = Decoder::new().decode_sami(&input).unwrap().unwrap();
        assert!(cues.is_empty());
    }

    #[test]
    fn test_decode_sami_empty_markers_clear() {
        let input = "<sync start=100>Hi\n<sync start=900>\n<sync start=1200>There\n<sync start=2000>\n";
        let cues = Decoder::new().decode_sami(input).unwrap().unwrap();

        assert_eq!(cues.len(), 2);
        assert_eq!((cues[0].start_ms, cues[0].end_ms), (100, 900));
        assert_eq!((cues[1].start_ms, cues[1].end_ms), (1200, 2000));
        assert_eq!(cues[1].text, "There");
    }

    #[test]
    fn test_decode_sami_quoted_start_and_attributes() {
        let input = "<SYNC Start=\"100\" End=\"200\"><P Class=KRCC>Hi\n<SYNC Start='700'><P>&nbsp;\n";
        let cues = Decoder::new().decode_sami(input).unwrap().unwrap();

        assert_eq!(cues.len(), 1);
        assert_eq!((cues[0].start_ms, cues[0].end_ms), (100, 700));
        assert_eq!(cues[0].text, "<P Class=KRCC>Hi");
    }

    #[test]
    fn test_decode_sami_ignores_commented_markers() {
        let input = "<!-- <SYNC Start=1>ghost -->\n<SYNC Start=10>real\n<SYNC Start=20>\n";
        let cues = Decoder::new().decode_sami(input).unwrap().unwrap();

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "real");
    }

    #[test]
    fn test_decode_sami_declines_other_text() {
        assert!(Decoder::new().decode_sami("1\n00:00:01,000 --> 00:00:02,000\nHi").unwrap().is_none());
    }

    #[test]
    fn test_decode_sami_stamps_sync() {
        let input = "<SYNC Start=100>Hi\n<SYNC Start=900>\n";
        let cues = Decoder::new().with_sync(-200).decode_sami(input).unwrap().unwrap();

        assert_eq!(cues[0].sync_ms, -200);
        assert_eq!(cues[0].start(), 0);
        assert_eq!(cues[0].end(), 700);
    }

    #[test]
    fn test_decode_subrip() {
        let input = "1\n00:00:01,000 --> 00:00:02,500\nHello\n  world  \n\n2\n00:00:03,000 --> 00:00:04,000\nBye\n";
        let cues = Decoder::new().decode_subrip(input).unwrap().unwrap();

        assert_eq!(cues.len(), 2);
        assert_eq!((cues[0].start_ms, cues[0].end_ms), (1000, 2500));
        assert_eq!(cues[0].text, "Hello\nworld");
        assert_eq!(cues[0].format, Format::SubRip);
        assert_eq!(cues[1].text, "Bye");
    }

    #[test]
    fn test_decode_subrip_block_bad_timestamp() {
        let decoder = Decoder::new().with_source("bad.srt");
        let err = decoder
            .decode_subrip_block("1\n00:00:01,000 --> bad\nHello\n\n", 1)
            .unwrap_err();

        match err {
            Error::TimeParse { file, index, value } => {
                assert_eq!(file, "bad.srt");
                assert_eq!(index, 1);
                assert_eq!(value, "bad");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_subrip_bad_timestamp_is_fatal() {
        let input = "1\n00:00:01,000 --> bad\nHello\n\n2\n00:00:02,000 --> 00:00:03,000\nWorld\n";
        let err = Decoder::new().decode_subrip(input).unwrap_err();
        assert!(matches!(err, Error::TimeParse { index: 1, .. }));
    }

    #[test]
    fn test_decode_subrip_skips_blocks_without_arrow() {
        let input = "garbage header\n\n1\n00:00:01,000 --> 00:00:02,000\nHi\n\n2\n00:00:03,000 --> 00:00:04,000\nYo";
        let cues = Decoder::new().decode_subrip(input).unwrap().unwrap();
        assert_eq!(cues.len(), 2);
    }

    #[test]
    fn test_decode_subrip_declines_plain_prose() {
        let input = "Chapter  1 begins\n\n2 and continues";
        assert!(Decoder::new().decode_subrip(input).unwrap().is_none());
    }

    #[test]
    fn test_decode_prefers_hint_then_falls_back() {
        let srt = "1\n00:00:01,000 --> 00:00:02,000\nHi\n\n2\n00:00:03,000 --> 00:00:04,000\nYo";
        let (format, cues) = Decoder::new().decode(srt, Some(Format::Sami)).unwrap();
        assert_eq!(format, Format::SubRip);
        assert_eq!(cues.len(), 2);

        let sami = "<SYNC Start=0>Hi\n<SYNC Start=10>\n";
        let (format, _) = Decoder::new().decode(sami, None).unwrap();
        assert_eq!(format, Format::Sami);
    }

    #[test]
    fn test_decode_sami_clamps_running_cue_to_next_start() {
        let input = "<SYNC Start=0>A\n<SYNC Start=5000>\n<SYNC Start=3000>B\n<SYNC Start=6000>\n";
        let cues = Decoder::new().decode_sami(input).unwrap().unwrap();

        assert_eq!(cues.len(), 2);
        assert_eq!((cues[0].start_ms, cues[0].end_ms), (0, 3000));
        assert_eq!(cues[0].text, "A");
        assert_eq!((cues[1].start_ms, cues[1].end_ms), (3000, 6000));
        assert_eq!(cues[1].text, "B");
    }

    #[test]
    fn test_backwards_sami_marker_yields_cue_writers_skip() {
        let input = "<SYNC Start=5000>A\n<SYNC Start=3000>B\n<SYNC Start=6000>\n";
        let cues = Decoder::new().decode_sami(input).unwrap().unwrap();

        assert_eq!((cues[0].start_ms, cues[0].end_ms), (5000, 3000));
        assert!(!cues[0].is_visible());

        let encoder = Encoder::new().with_line_delimiter(LineDelimiter::Unix);
        assert_eq!(encoder.encode_subrip(&cues), "1\n00:00:03,000 --> 00:00:06,000\nB");
        let sami = encoder.encode_sami(&cues);
        assert!(!sami.contains("<P>A"));
        assert!(sami.contains("<SYNC Start=3000>\n<P>B\n<SYNC Start=6000>"));
    }

    #[test]
    fn test_decode_sami_skips_full_width_start() {
        let input = "<SYNC Start=１００>Odd\n<SYNC Start=200>Hi\n<SYNC Start=900>\n";
        let cues = Decoder::new().decode_sami(input).unwrap().unwrap();

        assert_eq!(cues.len(), 1);
        assert_eq!((cues[0].start_ms, cues[0].end_ms), (200, 900));
        assert_eq!(cues[0].text, "Hi");
    }

    #[test]
    fn test_decode_sami_keeps_non_ascii_space_in_text() {
        let input = "<SYNC Start=0>\u{3000}Hi\u{A0}\n<SYNC Start=900>\n";
        let cues = Decoder::new().decode_sami(input).unwrap().unwrap();
        assert_eq!(cues[0].text, "\u{3000}Hi\u{A0}");
    }

    #[test]
    fn test_decode_subrip_unicode_space_before_number_is_text() {
        for body in ["Room\u{A0}\u{A0}101 please", "A\u{3000}\u{3000}2 cats"] {
            let input = format!(
                "1\n00:00:01,000 --> 00:00:02,000\n{}\n\n2\n00:00:03,000 --> 00:00:04,000\nB\n",
                body
            );
            let cues = Decoder::new().decode_subrip(&input).unwrap().unwrap();
            let texts: Vec<_> = cues.iter().map(|c| c.text.as_str()).collect();
            assert_eq!(texts, [text::normalize_plain(body).as_str(), "B"]);
        }
    }

    #[test]
    fn test_decode_unknown_format() {
        let err = Decoder::new().with_source("notes.txt").decode("just text", None).unwrap_err();
        assert!(matches!(err, Error::UnknownFormat { ref file } if file == "notes.txt"));
    }
}
