// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Go-flavoured time primitives: reference layouts (`2006-01-02`), duration
//! syntax (`1h2m3s`) and zone names, expressed on top of `chrono`.

use chrono::{DateTime, FixedOffset, Local, Offset, TimeZone, Utc};
use thiserror::Error;

mod duration;
mod layout;

pub use duration::{GoDuration, HOUR, MICROSECOND, MILLISECOND, MINUTE, NANOSECOND, SECOND};
pub use layout::{format, parse_in};

/// Errors raised by the time helpers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimeError {
    #[error("time: invalid duration {0:?}")]
    InvalidDuration(String),
    #[error("time: missing unit in duration {0:?}")]
    MissingUnit(String),
    #[error("time: unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },
    #[error("time: duration {0:?} overflows")]
    DurationOverflow(String),
    #[error("parsing time {value:?} as {layout:?}: {reason}")]
    Parse {
        value: String,
        layout: String,
        reason: String,
    },
    #[error("invalid timestamp {0:?}, expected RFC 3339")]
    InvalidTimestamp(String),
    #[error("unix timestamp {0} is out of range")]
    OutOfRange(i64),
    #[error("cannot use {0} value as a time")]
    Unsupported(&'static str),
}

/// Target zone for formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Utc,
    Local,
    Fixed(FixedOffset),
}

impl Zone {
    /// Resolves a zone name. `UTC`, `GMT`, `Z` and the empty string are UTC,
    /// `Local` is the process zone, and `+hh:mm`, `-hhmm` or `+hh` are fixed
    /// offsets. Anything else falls back to UTC.
    pub fn resolve(name: &str) -> Zone {
        match name.trim() {
            "" | "UTC" | "GMT" | "Z" | "Etc/UTC" => Zone::Utc,
            "Local" => Zone::Local,
            other => parse_offset(other).map_or_else(
                || {
                    tracing::debug!(zone = other, "unknown time zone, using UTC");
                    Zone::Utc
                },
                Zone::Fixed,
            ),
        }
    }

    /// Re-expresses `time` in this zone.
    pub fn convert<Tz: TimeZone>(self, time: &DateTime<Tz>) -> DateTime<FixedOffset> {
        match self {
            Zone::Utc => time.with_timezone(&Utc.fix()),
            Zone::Local => {
                let local = time.with_timezone(&Local);
                local.with_timezone(&local.offset().fix())
            }
            Zone::Fixed(offset) => time.with_timezone(&offset),
        }
    }
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    let (sign, digits) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let digits: String = digits.chars().filter(|c| *c != ':').collect();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Reads a unix timestamp in seconds.
pub fn from_unix(seconds: i64) -> Result<DateTime<FixedOffset>, TimeError> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .map(|time| time.with_timezone(&Utc.fix()))
        .ok_or(TimeError::OutOfRange(seconds))
}

/// Reads an RFC 3339 timestamp.
pub fn from_rfc3339(text: &str) -> Result<DateTime<FixedOffset>, TimeError> {
    DateTime::parse_from_rfc3339(text.trim())
        .map_err(|_| TimeError::InvalidTimestamp(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_zone_names() {
        assert_eq!(Zone::resolve("UTC"), Zone::Utc);
        assert_eq!(Zone::resolve("Local"), Zone::Local);
        assert_eq!(
            Zone::resolve("+02:00"),
            Zone::Fixed(FixedOffset::east_opt(7200).unwrap())
        );
        assert_eq!(
            Zone::resolve("-0530"),
            Zone::Fixed(FixedOffset::west_opt(5 * 3600 + 30 * 60).unwrap())
        );
        assert_eq!(Zone::resolve("Mars/Olympus"), Zone::Utc);
    }

    #[test]
    fn converts_between_zones() {
        let time = from_rfc3339("2024-03-01T23:30:00Z").unwrap();
        let shifted = Zone::resolve("+02:00").convert(&time);
        assert_eq!(shifted.to_rfc3339(), "2024-03-02T01:30:00+02:00");
    }

    #[test]
    fn reads_unix_seconds() {
        let time = from_unix(0).unwrap();
        assert_eq!(time.to_rfc3339(), "1970-01-01T00:00:00+00:00");
        assert_eq!(from_unix(i64::MAX).unwrap_err(), TimeError::OutOfRange(i64::MAX));
    }
}
