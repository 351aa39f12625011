//! Tolerant parser for upstream count text
//!
//! Telegram renders counters in a handful of locale-dependent shapes:
//! `26.8K`, `1.2M`, `1,234`, `12 345` (with ordinary, non-breaking or
//! narrow spaces). This module normalizes all of them into an integer.

use thiserror::Error;

/// Error returned when a count token contains no usable digits
///
/// Callers must treat this as "value absent"; zero is a valid real
/// count and must never be conflated with a failed parse.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("No digits in count text: {text:?}")]
pub struct CountParseError {
    pub text: String,
}

/// Parses compact count text into an integer
///
/// Rules:
/// - All whitespace variants (including NBSP and narrow NBSP) are
///   stripped before parsing.
/// - A trailing case-insensitive `K` multiplies by 1,000 and `M` by
///   1,000,000; the leading portion is then parsed as a float (`.` is a
///   decimal point, `,` is removed) and the product rounded to the
///   nearest integer: `12.3K` → 12300.
/// - Without a suffix, `,` and `.` are treated as grouping separators
///   and removed: `1,234` → 1234.
/// - Fails with [`CountParseError`] when no digits remain.
pub fn parse_compact(text: &str) -> Result<u64, CountParseError> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    let (number, factor) = match cleaned.chars().last() {
        Some('k') | Some('K') => (&cleaned[..cleaned.len() - 1], 1_000.0),
        Some('m') | Some('M') => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };

    if factor > 1.0 {
        // Suffixed form: the dot is a decimal point ("12.3K").
        let number = number.replace(',', "");
        let value: f64 = number
            .parse()
            .map_err(|_| CountParseError { text: text.to_string() })?;
        if !value.is_finite() || value < 0.0 {
            return Err(CountParseError { text: text.to_string() });
        }
        return Ok((value * factor).round() as u64);
    }

    // Plain form: both comma and dot are grouping separators ("1,234",
    // "1.234"); anything non-numeric makes the token unusable.
    let digits: String = number.chars().filter(|c| *c != ',' && *c != '.').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(CountParseError { text: text.to_string() });
    }
    digits
        .parse()
        .map_err(|_| CountParseError { text: text.to_string() })
}
