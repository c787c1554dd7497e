//! SubRip timestamps (`HH:MM:SS,mmm`)

use crate::text;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static TIMECODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{2}):([0-9]{2}):([0-9]{2}),([0-9]{1,3})$").expect("valid timecode regex")
});

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

/// Text that is not a `HH:MM:SS,mmm` timestamp
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid timecode: '{0}'")]
pub struct InvalidTimecode(pub String);

/// Parse `HH:MM:SS,mmm` into milliseconds.
///
/// The fraction takes one to three digits and is read as a plain millisecond
/// count, so `00:00:01,5` is 1005 ms. Minutes and seconds are not range
/// checked; `00:00:75,000` is 75 seconds.
pub fn parse(value: &str) -> Result<i64, InvalidTimecode> {
    let invalid = || InvalidTimecode(value.to_string());
    let caps = TIMECODE_REGEX
        .captures(value.trim_matches(text::is_ascii_space))
        .ok_or_else(invalid)?;

    let field = |i: usize| caps[i].parse::<i64>().map_err(|_| invalid());
    let hours = field(1)?;
    let minutes = field(2)?;
    let seconds = field(3)?;
    let millis = field(4)?;

    Ok(hours * MS_PER_HOUR + minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND + millis)
}

/// Format milliseconds as `HH:MM:SS,mmm`. Negative values clamp to zero.
pub fn format(ms: i64) -> String {
    let ms = ms.max(0);
    let hours = ms / MS_PER_HOUR;
    let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    let millis = ms % MS_PER_SECOND;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}
