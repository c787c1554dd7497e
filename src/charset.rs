//! Character encoding detection and conversion
//!
//! Subtitle files rarely declare their charset. Detection runs in two steps:
//!
//! 1. A byte-order mark in the first four bytes wins outright.
//! 2. Without a BOM the locale default (CP949 for Korean locales, otherwise
//!    the platform's native encoding) is compared with the platform default
//!    (UTF-8). When they differ the bytes are decoded with both and the
//!    shorter result is kept.
//!
//! The second step is a heuristic. A wrong multi-byte decoding tends to
//! produce more replacement characters than a right one, so the shorter
//! string is usually the correct one. It is not guaranteed to be.

use crate::error::{Error, Result};
use encoding_rs::{Encoding, EUC_KR, UTF_16BE, UTF_16LE, UTF_8};
use log::debug;
use once_cell::sync::Lazy;
use std::fmt;
use std::str::FromStr;

const BOM_UTF32_BE: [u8; 4] = [0x00, 0x00, 0xFE, 0xFF];
const BOM_UTF32_LE: [u8; 4] = [0xFF, 0xFE, 0x00, 0x00];
const BOM_UTF8: [u8; 3] = [0xEF, 0xBB, 0xBF];
const BOM_UTF16_BE: [u8; 2] = [0xFE, 0xFF];
const BOM_UTF16_LE: [u8; 2] = [0xFF, 0xFE];

/// Labels for the Korean legacy code page that WHATWG does not list
const CP949_ALIASES: &[&str] = &["cp949", "ms949", "x-windows-949", "uhc"];

/// Decoding used when nothing else is known
pub const PLATFORM_DEFAULT: Charset = Charset::Utf8;

/// A concrete text encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
    /// Any single/double-byte encoding known to `encoding_rs`
    Legacy(&'static Encoding),
}

impl Charset {
    /// Korean legacy code page (CP949, a superset of EUC-KR)
    pub fn cp949() -> Charset {
        Charset::Legacy(EUC_KR)
    }

    /// Resolve a user-supplied label such as `utf-8`, `UTF-16LE` or `cp949`
    pub fn for_label(label: &str) -> Result<Self> {
        let normalized = label.trim().to_ascii_lowercase();

        match normalized.as_str() {
            "utf-32le" | "utf32le" | "utf-32" | "utf32" => return Ok(Charset::Utf32Le),
            "utf-32be" | "utf32be" => return Ok(Charset::Utf32Be),
            _ => {}
        }

        if CP949_ALIASES.contains(&normalized.as_str()) {
            return Ok(Charset::cp949());
        }

        Encoding::for_label(normalized.as_bytes())
            .map(Self::from_encoding)
            .ok_or_else(|| Error::UnknownCharset { label: label.to_string() })
    }

    fn from_encoding(encoding: &'static Encoding) -> Self {
        if encoding == UTF_8 {
            Charset::Utf8
        } else if encoding == UTF_16LE {
            Charset::Utf16Le
        } else if encoding == UTF_16BE {
            Charset::Utf16Be
        } else {
            Charset::Legacy(encoding)
        }
    }

    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Utf16Le => "UTF-16LE",
            Charset::Utf16Be => "UTF-16BE",
            Charset::Utf32Le => "UTF-32LE",
            Charset::Utf32Be => "UTF-32BE",
            Charset::Legacy(encoding) => encoding.name(),
        }
    }

    /// Whether this is CP949 / EUC-KR
    pub fn is_korean_legacy(&self) -> bool {
        matches!(self, Charset::Legacy(encoding) if *encoding == EUC_KR)
    }

    /// Decode bytes, dropping this charset's BOM if present.
    /// Malformed sequences become U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Charset::Utf8 => UTF_8.decode_with_bom_removal(bytes).0.into_owned(),
            Charset::Utf16Le => UTF_16LE.decode_with_bom_removal(bytes).0.into_owned(),
            Charset::Utf16Be => UTF_16BE.decode_with_bom_removal(bytes).0.into_owned(),
            Charset::Utf32Le => {
                let body = bytes.strip_prefix(&BOM_UTF32_LE[..]).unwrap_or(bytes);
                decode_utf32(body, u32::from_le_bytes)
            }
            Charset::Utf32Be => {
                let body = bytes.strip_prefix(&BOM_UTF32_BE[..]).unwrap_or(bytes);
                decode_utf32(body, u32::from_be_bytes)
            }
            Charset::Legacy(encoding) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
        }
    }

    /// Encode text without a BOM.
    /// Legacy encodings write unmappable characters as numeric character references.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Charset::Utf8 => text.as_bytes().to_vec(),
            Charset::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Charset::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Charset::Utf32Le => text.chars().flat_map(|c| u32::from(c).to_le_bytes()).collect(),
            Charset::Utf32Be => text.chars().flat_map(|c| u32::from(c).to_be_bytes()).collect(),
            Charset::Legacy(encoding) => encoding.encode(text).0.into_owned(),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::for_label(s)
    }
}

fn decode_utf32(bytes: &[u8], read: fn([u8; 4]) -> u32) -> String {
    let chunks = bytes.chunks_exact(4);
    let trailing = !chunks.remainder().is_empty();

    let mut text: String = chunks
        .map(|chunk| {
            let unit = read([chunk[0], chunk[1], chunk[2], chunk[3]]);
            char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER)
        })
        .collect();

    if trailing {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

/// Locale signals that pick the fallback encoding when no BOM is present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleHints {
    /// ISO 639 language code, e.g. `ko`
    pub language: Option<String>,
    /// IANA time zone id, e.g. `Asia/Seoul`
    pub time_zone: Option<String>,
    /// The platform's native encoding
    pub native: Charset,
}

static SYSTEM_LOCALE: Lazy<LocaleHints> = Lazy::new(LocaleHints::from_env);

impl Default for LocaleHints {
    fn default() -> Self {
        Self {
            language: None,
            time_zone: None,
            native: PLATFORM_DEFAULT,
        }
    }
}

impl LocaleHints {
    /// Hints read from the process environment once and then reused
    pub fn system() -> &'static LocaleHints {
        &SYSTEM_LOCALE
    }

    /// Read `LC_ALL`, `LC_CTYPE`, `LANG` and `TZ`
    pub fn from_env() -> Self {
        let locale = ["LC_ALL", "LC_CTYPE", "LANG"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|value| !value.is_empty());
        let time_zone = std::env::var("TZ").ok();

        Self::from_locale_str(locale.as_deref(), time_zone.as_deref())
    }

    /// Build hints from a POSIX locale name (`ko_KR.EUC-KR@mod`) and a `TZ` value
    pub fn from_locale_str(locale: Option<&str>, time_zone: Option<&str>) -> Self {
        let mut hints = Self::default();

        if let Some(locale) = locale {
            let without_modifier = locale.split('@').next().unwrap_or(locale);
            let (name, codeset) = match without_modifier.split_once('.') {
                Some((name, codeset)) => (name, Some(codeset)),
                None => (without_modifier, None),
            };

            let language = name.split(['_', '-']).next().unwrap_or(name).to_ascii_lowercase();
            if !language.is_empty() && language != "c" && language != "posix" {
                hints.language = Some(language);
            }

            if let Some(charset) = codeset.and_then(|c| Charset::for_label(c).ok()) {
                hints.native = charset;
            }
        }

        hints.time_zone = time_zone
            .map(|tz| tz.trim_start_matches(':').to_string())
            .filter(|tz| !tz.is_empty());

        hints
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }

    pub fn with_native(mut self, native: Charset) -> Self {
        self.native = native;
        self
    }

    /// CP949 for Korean locales, the native encoding otherwise
    pub fn locale_default(&self) -> Charset {
        let korean_language = self.language.as_deref() == Some("ko");
        let korean_zone = self.time_zone.as_deref() == Some("Asia/Seoul");

        if korean_language || korean_zone {
            Charset::cp949()
        } else {
            self.native
        }
    }
}

/// Charset announced by a byte-order mark, if any
pub fn detect_bom(bytes: &[u8]) -> Option<Charset> {
    if bytes.starts_with(&BOM_UTF32_BE) {
        Some(Charset::Utf32Be)
    } else if bytes.starts_with(&BOM_UTF8) {
        Some(Charset::Utf8)
    } else if bytes.starts_with(&BOM_UTF16_BE) {
        Some(Charset::Utf16Be)
    } else if bytes.starts_with(&BOM_UTF32_LE) {
        Some(Charset::Utf32Le)
    } else if bytes.starts_with(&BOM_UTF16_LE) {
        Some(Charset::Utf16Le)
    } else {
        None
    }
}

/// Pick a charset for `bytes` and return it together with the decoded text
pub fn decode_auto(bytes: &[u8], hints: &LocaleHints) -> (Charset, String) {
    if let Some(charset) = detect_bom(bytes) {
        debug!("BOM found: {}", charset);
        return (charset, charset.decode(bytes));
    }

    let locale = hints.locale_default();
    if locale == PLATFORM_DEFAULT {
        return (locale, locale.decode(bytes));
    }

    let localized = locale.decode(bytes);
    let platform = PLATFORM_DEFAULT.decode(bytes);
    let localized_len = localized.chars().count();
    let platform_len = platform.chars().count();
    debug!(
        "no BOM; {} decodes to {} chars, {} to {} chars",
        locale, localized_len, PLATFORM_DEFAULT, platform_len
    );

    if localized_len < platform_len {
        (locale, localized)
    } else {
        (PLATFORM_DEFAULT, platform)
    }
}

/// Pick a charset for `bytes`. Never fails.
pub fn detect(bytes: &[u8], hints: &LocaleHints) -> Charset {
    decode_auto(bytes, hints).0
}
