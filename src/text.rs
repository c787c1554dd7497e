//! Text normalization shared by the parsers and writers
//!
//! "Whitespace" here is ASCII whitespace (`[\t\n\x0B\x0C\r ]`); the
//! ideographic space U+3000 only takes part in [`collapse_spaces`].

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

static LINE_BREAK_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br[^>]*/?>").expect("valid line break regex"));
static MARKUP_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z0-9_]+[^>]*/?>").expect("valid tag regex"));
static HORIZONTAL_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new("[\t \u{3000}]+").expect("valid space regex"));
static LEADING_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[\t\n\x0B\x0C\r ]+").expect("valid left trim regex"));
static TRAILING_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\t\n\x0B\x0C\r ]+\n").expect("valid right trim regex"));
static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:#([0-9]{1,7})|#[xX]([0-9a-fA-F]{1,6})|(lt|gt|quot|apos|amp));")
        .expect("valid entity regex")
});

const NBSP_ENTITY: &str = "&nbsp;";
const MARKUP_LINE_BREAK: &str = "<BR>\n";

pub(crate) fn is_ascii_space(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\x0B' | '\x0C' | '\r' | ' ')
}

/// CRLF to LF. Runs once, right after decoding.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains("\r\n") {
        Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// `<br>`, `<BR/>`, `<br class=x>` to `\n`
pub fn decode_line_breaks(text: &str) -> Cow<'_, str> {
    LINE_BREAK_TAG.replace_all(text, "\n")
}

/// Remove every remaining `<tag ...>`
pub fn strip_tags(text: &str) -> Cow<'_, str> {
    MARKUP_TAG.replace_all(text, "")
}

/// `&nbsp;` to an ordinary space
pub fn decode_nbsp(text: &str) -> Cow<'_, str> {
    if text.contains(NBSP_ENTITY) {
        Cow::Owned(text.replace(NBSP_ENTITY, " "))
    } else {
        Cow::Borrowed(text)
    }
}

/// Named XML entities and numeric character references.
/// References to invalid code points are left untouched.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    ENTITY.replace_all(text, |caps: &Captures| {
        let code_point = if let Some(dec) = caps.get(1) {
            dec.as_str().parse::<u32>().ok()
        } else if let Some(hex) = caps.get(2) {
            u32::from_str_radix(hex.as_str(), 16).ok()
        } else {
            None
        };

        if let Some(c) = code_point.and_then(char::from_u32) {
            return c.to_string();
        }

        match caps.get(3).map(|m| m.as_str()) {
            Some("lt") => "<".to_string(),
            Some("gt") => ">".to_string(),
            Some("quot") => "\"".to_string(),
            Some("apos") => "'".to_string(),
            Some("amp") => "&".to_string(),
            _ => caps[0].to_string(),
        }
    })
}

/// Runs of tabs, spaces and ideographic spaces to one space
pub fn collapse_spaces(text: &str) -> Cow<'_, str> {
    HORIZONTAL_SPACE.replace_all(text, " ")
}

/// Newline plus following whitespace to a single newline
pub fn trim_line_starts(text: &str) -> Cow<'_, str> {
    LEADING_SPACE.replace_all(text, "\n")
}

/// Whitespace plus newline to a single newline
pub fn trim_line_ends(text: &str) -> Cow<'_, str> {
    TRAILING_SPACE.replace_all(text, "\n")
}

/// Whitespace cleanup for plain (SubRip) text
pub fn normalize_plain(text: &str) -> String {
    let text = collapse_spaces(text);
    let text = trim_line_starts(&text);
    let text = trim_line_ends(&text);
    text.trim_matches(is_ascii_space).to_string()
}

/// Render SAMI markup as plain text
pub fn markup_to_plain(text: &str) -> String {
    let text = decode_nbsp(text);
    let text = decode_line_breaks(&text);
    let text = strip_tags(&text);
    let text = decode_entities(&text);
    normalize_plain(&text)
}

/// Render plain text as SAMI markup
pub fn plain_to_markup(text: &str) -> Cow<'_, str> {
    if text.contains('\n') {
        Cow::Owned(text.replace('\n', MARKUP_LINE_BREAK))
    } else {
        Cow::Borrowed(text)
    }
}
