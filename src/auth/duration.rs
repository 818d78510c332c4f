//! Conversion of `"24h"`-style duration strings into expirations.
//!
//! Accepted form is an unsigned integer followed by one unit suffix:
//! `s`, `m`, `h` or `d`. Anything else (empty input, a missing or unknown
//! suffix, a prefix that is not a plain number) falls back to 24 hours.

use time::{Duration, OffsetDateTime};

pub const DEFAULT_DURATION_MS: i64 = 24 * 60 * 60 * 1000;

/// Parses a duration string into milliseconds.
pub fn parse_duration(text: &str) -> i64 {
    let text = text.trim();
    let Some(unit) = text.chars().last() else {
        return DEFAULT_DURATION_MS;
    };

    let unit_ms: i64 = match unit {
        's' => 1_000,
        'm' => 60 * 1_000,
        'h' => 60 * 60 * 1_000,
        'd' => 24 * 60 * 60 * 1_000,
        _ => return DEFAULT_DURATION_MS,
    };

    let digits = &text[..text.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return DEFAULT_DURATION_MS;
    }

    match digits.parse::<u32>() {
        Ok(value) => i64::from(value) * unit_ms,
        Err(_) => DEFAULT_DURATION_MS,
    }
}

/// Absolute instant `text` after `now`.
///
/// A duration that would land past the representable calendar range is
/// treated like any other unusable value and falls back to 24 hours.
pub fn expires_at(now: OffsetDateTime, text: &str) -> OffsetDateTime {
    now.checked_add(Duration::milliseconds(parse_duration(text)))
        .unwrap_or_else(|| now + Duration::milliseconds(DEFAULT_DURATION_MS))
}
