//! File-level conversion: read, detect, parse once, write any number of times

use crate::charset::{self, Charset, LocaleHints};
use crate::decoder::Decoder;
use crate::encoder::{output_path, Encoder, LineDelimiter};
use crate::error::{Error, Result};
use crate::subtitle::{Cue, Format};
use crate::text;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Settings for one conversion run
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Input charset; `None` detects it
    pub input_charset: Option<Charset>,
    pub output_charset: Charset,
    pub line_delimiter: LineDelimiter,
    /// Signed offset added to every cue time
    pub sync_ms: i64,
    /// Locale signals for charset detection
    pub locale: LocaleHints,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            input_charset: None,
            output_charset: Charset::Utf8,
            line_delimiter: LineDelimiter::default(),
            sync_ms: 0,
            locale: LocaleHints::system().clone(),
        }
    }
}

impl ConvertOptions {
    pub fn with_input_charset(mut self, charset: Option<Charset>) -> Self {
        self.input_charset = charset;
        self
    }

    pub fn with_output_charset(mut self, charset: Charset) -> Self {
        self.output_charset = charset;
        self
    }

    pub fn with_line_delimiter(mut self, line_delimiter: LineDelimiter) -> Self {
        self.line_delimiter = line_delimiter;
        self
    }

    pub fn with_sync(mut self, sync_ms: i64) -> Self {
        self.sync_ms = sync_ms;
        self
    }

    pub fn with_locale(mut self, locale: LocaleHints) -> Self {
        self.locale = locale;
        self
    }
}

/// Result of reading and parsing the input file
#[derive(Debug)]
struct Parsed {
    format: Format,
    charset: Charset,
    cues: Vec<Cue>,
}

/// Converts one subtitle file.
///
/// The input is parsed on the first [`Converter::write`] and reused for
/// later writes.
#[derive(Debug)]
pub struct Converter {
    input: PathBuf,
    options: ConvertOptions,
    parsed: Option<Parsed>,
}

impl Converter {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            options: ConvertOptions::default(),
            parsed: None,
        }
    }

    /// Replace the options. Drops anything already parsed.
    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self.parsed = None;
        self
    }

    /// Detected input format, once parsed
    pub fn input_format(&self) -> Option<Format> {
        self.parsed.as_ref().map(|p| p.format)
    }

    /// Charset the input was decoded with, once parsed
    pub fn input_charset(&self) -> Option<Charset> {
        self.parsed.as_ref().map(|p| p.charset)
    }

    /// Parsed cues, once parsed
    pub fn cues(&self) -> Option<&[Cue]> {
        self.parsed.as_ref().map(|p| p.cues.as_slice())
    }

    /// Read and parse the input unless that already happened
    pub fn load(&mut self) -> Result<&[Cue]> {
        let parsed = load_once(&mut self.parsed, &self.input, &self.options)?;
        Ok(parsed.cues.as_slice())
    }

    /// Write the subtitles as `target`, or as the opposite of the input
    /// format when `target` is `None`. Returns the path written.
    ///
    /// A non-zero sync offset is rejected when writing the same format the
    /// input was read as.
    pub fn write(&mut self, target: Option<Format>) -> Result<PathBuf> {
        let parsed = load_once(&mut self.parsed, &self.input, &self.options)?;

        let target = target.unwrap_or_else(|| parsed.format.opposite());
        if target == parsed.format && self.options.sync_ms != 0 {
            return Err(Error::UnsupportedResync {
                file: self.input.display().to_string(),
                format: target,
            });
        }

        let output = output_path(&self.input, target);
        Encoder::new()
            .with_line_delimiter(self.options.line_delimiter)
            .with_korean_class(parsed.charset.is_korean_legacy())
            .with_charset(self.options.output_charset)
            .encode_to_file(target, &parsed.cues, &output)?;

        info!("{} -> {}", self.input.display(), output.display());
        Ok(output)
    }
}

fn load_once<'a>(slot: &'a mut Option<Parsed>, input: &Path, options: &ConvertOptions) -> Result<&'a Parsed> {
    let parsed = match slot.take() {
        Some(parsed) => parsed,
        None => parse(input, options)?,
    };
    Ok(&*slot.insert(parsed))
}

fn parse(input: &Path, options: &ConvertOptions) -> Result<Parsed> {
    let name = input.display().to_string();

    let hint = match input.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() => Format::from_extension(ext),
        _ => return Err(Error::MissingExtension { file: name }),
    };

    let bytes = std::fs::read(input).map_err(|source| Error::Read {
        file: name.clone(),
        source,
    })?;

    let charset = options
        .input_charset
        .unwrap_or_else(|| charset::detect(&bytes, &options.locale));
    let decoded = charset.decode(&bytes);
    debug!("{}: decoded as {}", name, charset);

    let text = text::normalize_line_endings(&decoded);
    let (format, cues) = Decoder::new()
        .with_source(name.as_str())
        .with_sync(options.sync_ms)
        .decode(&text, hint)?;
    debug!("{}: {} with {} cues", name, format, cues.len());

    Ok(Parsed { format, charset, cues })
}

/// Convert one file in a single call
pub fn convert_file(input: impl Into<PathBuf>, target: Option<Format>, options: ConvertOptions) -> Result<PathBuf> {
    Converter::new(input).with_options(options).write(target)
}
