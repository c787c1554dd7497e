//! Error types for subtitle conversion

use crate::subtitle::Format;
use thiserror::Error;

/// Errors that end the conversion of a single file
#[derive(Error, Debug)]
pub enum Error {
    /// The source file could not be opened or read
    #[error("File read error. ({file})")]
    Read {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// The source file name has no extension
    #[error("File extension does not exist. ({file})")]
    MissingExtension { file: String },

    /// The content matches neither SAMI nor SubRip
    #[error("Unknown file type. ({file})")]
    UnknownFormat { file: String },

    /// A timestamp inside a recognized block is malformed
    #[error("Time parse error. (file: {file}, cue: {index}, value: '{value}')")]
    TimeParse {
        file: String,
        /// 1-based index of the cue being parsed
        index: usize,
        value: String,
    },

    /// A non-zero sync offset was requested for a same-format conversion
    #[error("Unsupported resync to the same format ({format}): {file}")]
    UnsupportedResync { file: String, format: Format },

    /// The target file could not be written
    #[error("File write error. ({file})")]
    Write {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// A charset label that no known encoding answers to
    #[error("Unknown charset: '{label}'")]
    UnknownCharset { label: String },
}

pub type Result<T> = std::result::Result<T, Error>;
