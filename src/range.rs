use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;

use crate::{ByteRange, RangeNotSatisfiable};

// Unanchored on purpose: the first `bytes=N-M` anywhere in the value wins and
// trailing text (a second range, garbage) is ignored.
static RANGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"bytes=([0-9]+)-([0-9]*)").expect("range pattern is valid"));

/// What to do with an explicit range end that lies past the end of the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RangeEndPolicy {
    /// Pull the end back to the last byte of the file.
    #[default]
    Clamp,
    /// Keep the requested end. The advertised length then exceeds what the
    /// file holds and the body fails once it reaches end of file.
    Literal,
}

impl RangeEndPolicy {
    pub fn apply(self, range: ByteRange, file_size: u64) -> ByteRange {
        match self {
            RangeEndPolicy::Clamp => range.clamp_to(file_size),
            RangeEndPolicy::Literal => range,
        }
    }
}

/// Extracts `(start, end)` from a `Range` header value.
///
/// Returns `None` when the value holds nothing of the form `bytes=<digits>-`,
/// which callers treat the same as a missing header. Values too large for a
/// `u64` saturate.
pub fn parse_range_header(value: &str) -> Option<(u64, Option<u64>)> {
    let caps = RANGE_PATTERN.captures(value)?;
    let start = parse_saturating(caps.get(1)?.as_str());
    let end = caps
        .get(2)
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .map(parse_saturating);
    Some((start, end))
}

fn parse_saturating(digits: &str) -> u64 {
    digits.parse().unwrap_or(u64::MAX)
}

/// Resolves an optional raw `Range` header against the current file size.
///
/// A missing or unrecognised header selects the whole file. An open end means
/// "to the last byte". The range is unsatisfiable when `start > end` or
/// `start >= file_size`; an explicit end is passed through unclamped, see
/// [`RangeEndPolicy`].
pub fn resolve(range_header: Option<&str>, file_size: u64) -> Result<ByteRange, RangeNotSatisfiable> {
    let unsatisfiable = || RangeNotSatisfiable(file_size);

    let (start, end) = match range_header.and_then(parse_range_header) {
        Some((start, Some(end))) => (start, end),
        Some((start, None)) => (start, file_size.checked_sub(1).ok_or_else(unsatisfiable)?),
        None => return ByteRange::full(file_size).ok_or_else(unsatisfiable),
    };

    if start > end || start >= file_size {
        return Err(unsatisfiable());
    }

    Ok(ByteRange::new(start, end))
}
