//! # subconv
//!
//! Converts subtitles between SAMI (`.smi`) and SubRip (`.srt`).
//!
//! ## Formats
//!
//! SAMI marks the start of each caption with a `<SYNC>` tag. A caption lasts
//! until the next marker, so end times are implied:
//!
//! ```text
//! <SYNC Start=1000><P>Hello
//! <SYNC Start=2500><P>&nbsp;
//! ```
//!
//! SubRip numbers each caption and gives explicit start and end times:
//!
//! ```text
//! 1
//! 00:00:01,000 --> 00:00:02,500
//! Hello
//! ```
//!
//! ## Pipeline
//!
//! 1. Charset detection from the BOM, or from locale hints ([`charset`])
//! 2. CRLF to LF
//! 3. Parsing by extension, falling back to content sniffing ([`Decoder`])
//! 4. Optional sync offset, applied when cue times are read ([`Cue`])
//! 5. Writing either format in the chosen charset and line delimiter ([`Encoder`])
//!
//! [`Converter`] runs the whole pipeline for one file:
//!
//! ```no_run
//! use subconv::{ConvertOptions, Converter, Format};
//!
//! let mut converter = Converter::new("movie.smi")
//!     .with_options(ConvertOptions::default().with_sync(-500));
//! let written = converter.write(Some(Format::SubRip))?;
//! println!("{}", written.display());
//! # Ok::<(), subconv::Error>(())
//! ```
//!
//! ## Merging SAMI captions
//!
//! Consecutive SAMI markers carrying the same text become one cue whose end
//! is the time of the first marker with different text. Blank markers clear
//! the screen and produce no cue.

pub mod charset;
pub mod converter;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod subtitle;
pub mod text;
pub mod timecode;

pub use charset::{Charset, LocaleHints};
pub use converter::{convert_file, ConvertOptions, Converter};
pub use decoder::Decoder;
pub use encoder::{output_path, Encoder, LineDelimiter};
pub use error::{Error, Result};
pub use subtitle::{is_subtitle_file, Cue, Format};
