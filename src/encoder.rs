//! SAMI and SubRip encoders

use crate::charset::Charset;
use crate::error::{Error, Result};
use crate::subtitle::{Cue, Format};
use crate::text;
use crate::timecode;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const SAMI_HEAD: &str = "<SAMI>\n<HEAD>\n<TITLE></TITLE>\n<STYLE><!--\n\
                         p { font-family: sans-serif; text-align: center; }\n";
const SAMI_KOREAN_CLASS: &str = ".KRCC { Name: Korean; lang: ko-KR; }\n";
const SAMI_HEAD_END: &str = "--></STYLE>\n</HEAD>\n<BODY>\n";
const SAMI_TAIL: &str = "</BODY>\n</SAMI>";
const SAMI_PARAGRAPH: &str = "<P>";
const SAMI_KOREAN_PARAGRAPH: &str = "<P Class=KRCC>";

/// Line delimiter of the written file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineDelimiter {
    /// `\n`
    Unix,
    /// `\r\n`
    #[default]
    Windows,
}

impl LineDelimiter {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineDelimiter::Unix => "\n",
            LineDelimiter::Windows => "\r\n",
        }
    }
}

impl fmt::Display for LineDelimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineDelimiter::Unix => f.write_str("unix"),
            LineDelimiter::Windows => f.write_str("windows"),
        }
    }
}

impl FromStr for LineDelimiter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unix" | "lf" => Ok(LineDelimiter::Unix),
            "windows" | "crlf" => Ok(LineDelimiter::Windows),
            _ => Err(format!("unknown line delimiter '{}' (expected unix or windows)", s)),
        }
    }
}

/// Sibling of `input` carrying the extension of `format`
pub fn output_path(input: &Path, format: Format) -> PathBuf {
    input.with_extension(format.extension())
}

/// Serializes cues to SAMI or SubRip text
pub struct Encoder {
    line_delimiter: LineDelimiter,
    /// Emit the `KRCC` style class on SAMI paragraphs
    korean_class: bool,
    charset: Charset,
}

impl Encoder {
    /// Create a new encoder: CRLF line endings, UTF-8, no Korean class
    pub fn new() -> Self {
        Self {
            line_delimiter: LineDelimiter::default(),
            korean_class: false,
            charset: Charset::Utf8,
        }
    }

    pub fn with_line_delimiter(mut self, line_delimiter: LineDelimiter) -> Self {
        self.line_delimiter = line_delimiter;
        self
    }

    /// Older Korean players expect the `KRCC` class when the source was CP949
    pub fn with_korean_class(mut self, korean_class: bool) -> Self {
        self.korean_class = korean_class;
        self
    }

    /// Charset of the bytes written by [`Encoder::encode_to_writer`]
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Encode cues to a string in `format`
    pub fn encode(&self, format: Format, cues: &[Cue]) -> String {
        match format {
            Format::Sami => self.encode_sami(cues),
            Format::SubRip => self.encode_subrip(cues),
        }
    }

    /// Encode cues as a SAMI document.
    ///
    /// A blank `<SYNC>` is inserted wherever one cue ends before the next
    /// starts, and after the last cue, so players clear the screen.
    pub fn encode_sami(&self, cues: &[Cue]) -> String {
        let mut output = String::from(SAMI_HEAD);

        let paragraph = if self.korean_class {
            output.push_str(SAMI_KOREAN_CLASS);
            SAMI_KOREAN_PARAGRAPH
        } else {
            SAMI_PARAGRAPH
        };
        output.push_str(SAMI_HEAD_END);

        let mut previous_end: Option<i64> = None;
        for cue in cues.iter().filter(|cue| cue.is_visible()) {
            let start = cue.start();

            if let Some(end) = previous_end {
                if end < start {
                    push_sync(&mut output, end);
                }
            }

            push_sync(&mut output, start);
            output.push_str(paragraph);
            output.push_str(&cue.markup_text());
            output.push('\n');

            previous_end = Some(cue.end());
        }

        push_sync(&mut output, previous_end.unwrap_or(0));
        output.push_str(SAMI_TAIL);

        self.finish(&output)
    }

    /// Encode cues as SubRip, numbering only the cues written
    pub fn encode_subrip(&self, cues: &[Cue]) -> String {
        let mut output = String::new();
        let mut index = 0;

        for cue in cues.iter().filter(|cue| cue.is_visible()) {
            let text = cue.plain_text();
            if text.is_empty() {
                continue;
            }

            index += 1;
            output.push_str(&index.to_string());
            output.push('\n');
            output.push_str(&timecode::format(cue.start()));
            output.push_str(" --> ");
            output.push_str(&timecode::format(cue.end()));
            output.push('\n');
            output.push_str(&text);
            output.push_str("\n\n");
        }

        self.finish(&output)
    }

    /// Trim the document and apply the line delimiter
    fn finish(&self, output: &str) -> String {
        let trimmed = output.trim_matches(text::is_ascii_space);
        match self.line_delimiter {
            LineDelimiter::Unix => trimmed.to_string(),
            LineDelimiter::Windows => trimmed.replace('\n', LineDelimiter::Windows.as_str()),
        }
    }

    /// Encode cues and write them, in the configured charset, to a writer
    pub fn encode_to_writer<W: Write>(&self, format: Format, cues: &[Cue], mut writer: W) -> std::io::Result<()> {
        let encoded = self.encode(format, cues);
        writer.write_all(&self.charset.encode(&encoded))?;
        writer.flush()
    }

    /// Encode cues to a file
    pub fn encode_to_file(&self, format: Format, cues: &[Cue], path: &Path) -> Result<()> {
        File::create(path)
            .map(BufWriter::new)
            .and_then(|writer| self.encode_to_writer(format, cues, writer))
            .map_err(|source| Error::Write {
                file: path.display().to_string(),
                source,
            })
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

fn push_sync(output: &mut String, ms: i64) {
    output.push_str("<SYNC Start=");
    output.push_str(&ms.to_string());
    output.push_str(">\n");
}
