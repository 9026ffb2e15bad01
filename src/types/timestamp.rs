// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Timestamp parsing for API payloads.
//!
//! The consumption endpoint is not consistent about timestamp formats.
//! Depending on the account it returns local ISO 8601 datetimes without an
//! offset, RFC 3339 datetimes, or Unix epochs. Everything is converted to
//! UTC; naive datetimes are interpreted in the account's UTC offset.
//!
//! # Supported Formats
//!
//! - ISO 8601 without timezone: `"2024-01-15T10:30:00"`
//! - ISO 8601 with timezone: `"2024-01-15T10:30:00-05:00"`
//! - Unix epoch seconds: `"1705318200"`
//! - Unix epoch milliseconds: `"1705318200000"`

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

use crate::error::ParseError;

/// Parses an API timestamp into UTC.
///
/// `offset` is applied as is to timestamps that do not carry their own,
/// whatever their date. It does not follow daylight saving time.
///
/// # Errors
///
/// Returns [`ParseError::InvalidValue`] if no supported format matches.
///
/// # Examples
///
/// ```
/// use chrono::FixedOffset;
/// use eyeonwater::types::parse_timestamp;
///
/// let est = FixedOffset::west_opt(5 * 3600).unwrap();
/// let dt = parse_timestamp("2024-01-15T10:30:00", est).unwrap();
/// assert_eq!(dt.to_rfc3339(), "2024-01-15T15:30:00+00:00");
/// ```
pub fn parse_timestamp(s: &str, offset: FixedOffset) -> Result<DateTime<Utc>, ParseError> {
    let s = s.trim();

    if !s.is_empty()
        && s.chars().all(|c| c.is_ascii_digit())
        && let Some(dt) = parse_epoch(s)
    {
        return Ok(dt);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    parse_naive(s)
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| ParseError::InvalidValue {
            field: "timestamp".to_string(),
            message: format!("'{s}' is neither ISO 8601 nor a Unix epoch"),
        })
}

/// Parses a Unix epoch timestamp (seconds or milliseconds).
fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    let timestamp: i64 = s.parse().ok()?;

    // Seconds have 10 digits until year 2286, milliseconds 13.
    if timestamp > 9_999_999_999 {
        let secs = timestamp / 1000;
        let nsecs = u32::try_from((timestamp % 1000) * 1_000_000).ok()?;
        Utc.timestamp_opt(secs, nsecs).single()
    } else {
        Utc.timestamp_opt(timestamp, 0).single()
    }
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
    ];

    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn naive_uses_given_offset() {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let dt = parse_timestamp("2024-01-15T10:30:00", offset).unwrap();
        assert_eq!(dt.hour(), 9);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn naive_offset_does_not_follow_daylight_saving() {
        let est = FixedOffset::west_opt(5 * 3600).unwrap();
        let winter = parse_timestamp("2024-01-15T10:00:00", est).unwrap();
        let summer = parse_timestamp("2024-07-15T10:00:00", est).unwrap();

        // Local 10:00 in July is 14:00 UTC under EDT, but the fixed offset gives 15:00
        assert_eq!(winter.hour(), 15);
        assert_eq!(summer.hour(), 15);
    }

    #[test]
    fn rfc3339_ignores_given_offset() {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let dt = parse_timestamp("2024-01-15T10:30:00-05:00", offset).unwrap();
        assert_eq!(dt.hour(), 15);
    }

    #[test]
    fn epoch_seconds() {
        let dt = parse_timestamp("1705314600", utc()).unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn epoch_milliseconds() {
        let dt = parse_timestamp("1705314600123", utc()).unwrap();
        assert_eq!(dt.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn space_separated_with_fraction() {
        let dt = parse_timestamp("2024-01-15 10:30:00.5", utc()).unwrap();
        assert_eq!(dt.second(), 0);
        assert_eq!(dt.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn invalid_input() {
        assert!(parse_timestamp("not a date", utc()).is_err());
        assert!(parse_timestamp("", utc()).is_err());
        assert!(parse_timestamp("2024-13-45", utc()).is_err());
    }
}
