mod parser;

use chrono::{DateTime, FixedOffset};
use combine::Parser;

/// Parses a date and time string used in Internet Message Format based on what
/// specified in RFC 5322 section 3.3.
///
/// Different from `DateTime::parse_from_rfc2822`, this in addition allows some
/// patterns which are not supported by that function, specifically:
/// * using single digit for hour / minute / second,
/// * support comment,
/// * treating `-0000` as `+0000`, and
/// * the `UTC` zone name, which shows up in `Received` headers a lot.
///
/// Also this uses a byte slice which is more general than a str.
///
/// Note: to simplify the implementation, multi-line value handling defined in
/// IMF is ignored. Whitespace, tab, carriage return, and newline are handled
/// the same way. This function only accepts a complete datetime string.
pub fn parse_datetime(s: &[u8]) -> Option<DateTime<FixedOffset>> {
    match parser::date_time().parse(s) {
        Ok((dt, rest)) if rest.is_empty() => Some(dt),
        _ => None,
    }
}
