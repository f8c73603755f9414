// SPDX-License-Identifier: Apache-2.0 OR MIT
use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Timelike,
};
use std::fmt::Write;

use super::TimeError;

const LONG_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const LONG_DAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// One element of a Go reference layout (`Mon Jan 2 15:04:05 MST 2006`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chunk<'a> {
    Literal(&'a str),
    LongMonth,
    Month,
    NumMonth,
    ZeroMonth,
    LongWeekDay,
    WeekDay,
    Day,
    UnderDay,
    ZeroDay,
    ZeroYearDay,
    Hour,
    Hour12,
    ZeroHour12,
    Minute,
    ZeroMinute,
    Second,
    ZeroSecond,
    LongYear,
    Year,
    Pm { upper: bool },
    TzName,
    NumTz { colon: bool, short: bool, iso: bool },
    Fraction { separator: char, digits: usize, trim: bool },
}

fn tokenize(layout: &str) -> Vec<Chunk<'_>> {
    let bytes = layout.as_bytes();
    let mut chunks = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match chunk_at(&bytes[i..]) {
            Some((chunk, len)) => {
                if literal_start < i {
                    chunks.push(Chunk::Literal(&layout[literal_start..i]));
                }
                chunks.push(chunk);
                i += len;
                literal_start = i;
            }
            None => i += 1,
        }
    }
    if literal_start < bytes.len() {
        chunks.push(Chunk::Literal(&layout[literal_start..]));
    }
    chunks
}

fn chunk_at(rest: &[u8]) -> Option<(Chunk<'static>, usize)> {
    let starts = |prefix: &[u8]| rest.starts_with(prefix);
    let chunk = match rest[0] {
        b'J' if starts(b"January") => (Chunk::LongMonth, 7),
        b'J' if starts(b"Jan") => (Chunk::Month, 3),
        b'M' if starts(b"Monday") => (Chunk::LongWeekDay, 6),
        b'M' if starts(b"Mon") => (Chunk::WeekDay, 3),
        b'M' if starts(b"MST") => (Chunk::TzName, 3),
        b'0' if starts(b"002") => (Chunk::ZeroYearDay, 3),
        b'0' => match rest.get(1) {
            Some(b'1') => (Chunk::ZeroMonth, 2),
            Some(b'2') => (Chunk::ZeroDay, 2),
            Some(b'3') => (Chunk::ZeroHour12, 2),
            Some(b'4') => (Chunk::ZeroMinute, 2),
            Some(b'5') => (Chunk::ZeroSecond, 2),
            Some(b'6') => (Chunk::Year, 2),
            _ => return None,
        },
        b'1' if starts(b"15") => (Chunk::Hour, 2),
        b'1' => (Chunk::NumMonth, 1),
        b'2' if starts(b"2006") => (Chunk::LongYear, 4),
        b'2' => (Chunk::Day, 1),
        // `_2006` is a literal underscore followed by the year.
        b'_' if starts(b"_2") && !starts(b"_2006") => (Chunk::UnderDay, 2),
        b'3' => (Chunk::Hour12, 1),
        b'4' => (Chunk::Minute, 1),
        b'5' => (Chunk::Second, 1),
        b'P' if starts(b"PM") => (Chunk::Pm { upper: true }, 2),
        b'p' if starts(b"pm") => (Chunk::Pm { upper: false }, 2),
        b'-' | b'Z' => {
            let iso = rest[0] == b'Z';
            let body = &rest[1..];
            if body.starts_with(b"07:00") {
                (Chunk::NumTz { colon: true, short: false, iso }, 6)
            } else if body.starts_with(b"0700") {
                (Chunk::NumTz { colon: false, short: false, iso }, 5)
            } else if body.starts_with(b"07") {
                (Chunk::NumTz { colon: false, short: true, iso }, 3)
            } else {
                return None;
            }
        }
        b'.' | b',' => {
            let digit = *rest.get(1)?;
            if digit != b'0' && digit != b'9' {
                return None;
            }
            let run = rest[1..].iter().take_while(|b| **b == digit).count();
            if rest.get(1 + run).is_some_and(u8::is_ascii_digit) {
                return None;
            }
            (
                Chunk::Fraction {
                    separator: char::from(rest[0]),
                    digits: run,
                    trim: digit == b'9',
                },
                1 + run,
            )
        }
        _ => return None,
    };
    Some(chunk)
}

/// Formats `time` with a Go reference layout.
pub fn format<Tz: TimeZone>(layout: &str, time: &DateTime<Tz>) -> String {
    let offset = time.offset().fix().local_minus_utc();
    let time = time.naive_local();
    let mut out = String::with_capacity(layout.len() + 8);
    for chunk in tokenize(layout) {
        // Writing to a String cannot fail.
        let _ = write_chunk(&mut out, chunk, &time, offset);
    }
    out
}

fn write_chunk(
    out: &mut String,
    chunk: Chunk<'_>,
    time: &NaiveDateTime,
    offset: i32,
) -> std::fmt::Result {
    let month_index = time.month0() as usize;
    let day_index = time.weekday().num_days_from_sunday() as usize;
    let hour12 = match time.hour() % 12 {
        0 => 12,
        h => h,
    };
    match chunk {
        Chunk::Literal(text) => out.push_str(text),
        Chunk::LongMonth => out.push_str(LONG_MONTHS[month_index]),
        Chunk::Month => out.push_str(&LONG_MONTHS[month_index][..3]),
        Chunk::NumMonth => write!(out, "{}", time.month())?,
        Chunk::ZeroMonth => write!(out, "{:02}", time.month())?,
        Chunk::LongWeekDay => out.push_str(LONG_DAYS[day_index]),
        Chunk::WeekDay => out.push_str(&LONG_DAYS[day_index][..3]),
        Chunk::Day => write!(out, "{}", time.day())?,
        Chunk::UnderDay => write!(out, "{:>2}", time.day())?,
        Chunk::ZeroDay => write!(out, "{:02}", time.day())?,
        Chunk::ZeroYearDay => write!(out, "{:03}", time.ordinal())?,
        Chunk::Hour => write!(out, "{:02}", time.hour())?,
        Chunk::Hour12 => write!(out, "{hour12}")?,
        Chunk::ZeroHour12 => write!(out, "{hour12:02}")?,
        Chunk::Minute => write!(out, "{}", time.minute())?,
        Chunk::ZeroMinute => write!(out, "{:02}", time.minute())?,
        Chunk::Second => write!(out, "{}", time.second())?,
        Chunk::ZeroSecond => write!(out, "{:02}", time.second())?,
        Chunk::LongYear => write!(out, "{:04}", time.year())?,
        Chunk::Year => write!(out, "{:02}", time.year().rem_euclid(100))?,
        Chunk::Pm { upper } => {
            let marker = match (time.hour() >= 12, upper) {
                (true, true) => "PM",
                (true, false) => "pm",
                (false, true) => "AM",
                (false, false) => "am",
            };
            out.push_str(marker);
        }
        Chunk::TzName => {
            if offset == 0 {
                out.push_str("UTC");
            } else {
                write_offset(out, offset, false, false)?;
            }
        }
        Chunk::NumTz { colon, short, iso } => {
            if iso && offset == 0 {
                out.push('Z');
            } else {
                write_offset(out, offset, colon, short)?;
            }
        }
        Chunk::Fraction {
            separator,
            digits,
            trim,
        } => {
            let nanos = time.nanosecond() % 1_000_000_000;
            let full = format!("{nanos:09}");
            let mut fraction = &full[..digits.min(9)];
            if trim {
                fraction = fraction.trim_end_matches('0');
            }
            if !fraction.is_empty() {
                out.push(separator);
                out.push_str(fraction);
            }
        }
    }
    Ok(())
}

fn write_offset(out: &mut String, offset: i32, colon: bool, short: bool) -> std::fmt::Result {
    let sign = if offset < 0 { '-' } else { '+' };
    let minutes = offset.unsigned_abs() / 60;
    write!(out, "{sign}{:02}", minutes / 60)?;
    if !short {
        if colon {
            out.push(':');
        }
        write!(out, "{:02}", minutes % 60)?;
    }
    Ok(())
}

#[derive(Default)]
struct Fields {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    year_day: Option<u32>,
    hour: u32,
    minute: u32,
    second: u32,
    nanosecond: u32,
    pm: Option<bool>,
    offset: Option<i32>,
}

struct Cursor<'v> {
    rest: &'v str,
}

impl<'v> Cursor<'v> {
    fn take(&mut self, len: usize) -> Option<&'v str> {
        let head = self.rest.get(..len)?;
        self.rest = &self.rest[len..];
        Some(head)
    }

    fn digits(&mut self, min: usize, max: usize) -> Option<u32> {
        let available = self
            .rest
            .bytes()
            .take(max)
            .take_while(u8::is_ascii_digit)
            .count();
        if available < min {
            return None;
        }
        self.take(available)?.parse().ok()
    }

    fn name(&mut self, names: &[&str], prefix_len: Option<usize>) -> Option<usize> {
        for (idx, name) in names.iter().enumerate() {
            let candidate = prefix_len.map_or(*name, |len| &name[..len]);
            let matched = self
                .rest
                .get(..candidate.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(candidate));
            if matched {
                self.rest = &self.rest[candidate.len()..];
                return Some(idx);
            }
        }
        None
    }
}

/// Parses `value` with a Go reference layout. Values without an explicit
/// offset are interpreted in `zone`.
pub fn parse_in<Tz: TimeZone>(
    layout: &str,
    value: &str,
    zone: &Tz,
) -> Result<DateTime<FixedOffset>, TimeError> {
    let fail = |reason: &str| TimeError::Parse {
        value: value.to_string(),
        layout: layout.to_string(),
        reason: reason.to_string(),
    };

    let chunks = tokenize(layout);
    let mut fields = Fields::default();
    let mut cursor = Cursor { rest: value };

    for (idx, chunk) in chunks.iter().enumerate() {
        let ok = match *chunk {
            Chunk::Literal(text) => {
                if cursor.rest.starts_with(text) {
                    cursor.rest = &cursor.rest[text.len()..];
                    true
                } else {
                    return Err(fail(&format!("cannot parse {:?} as {text:?}", cursor.rest)));
                }
            }
            Chunk::LongMonth => cursor
                .name(&LONG_MONTHS, None)
                .map(|m| fields.month = Some(m as u32 + 1))
                .is_some(),
            Chunk::Month => cursor
                .name(&LONG_MONTHS, Some(3))
                .map(|m| fields.month = Some(m as u32 + 1))
                .is_some(),
            Chunk::LongWeekDay => cursor.name(&LONG_DAYS, None).is_some(),
            Chunk::WeekDay => cursor.name(&LONG_DAYS, Some(3)).is_some(),
            Chunk::NumMonth => cursor.digits(1, 2).map(|m| fields.month = Some(m)).is_some(),
            Chunk::ZeroMonth => cursor.digits(2, 2).map(|m| fields.month = Some(m)).is_some(),
            Chunk::Day => cursor.digits(1, 2).map(|d| fields.day = Some(d)).is_some(),
            Chunk::UnderDay => {
                if cursor.rest.starts_with(' ') {
                    cursor.rest = &cursor.rest[1..];
                }
                cursor.digits(1, 2).map(|d| fields.day = Some(d)).is_some()
            }
            Chunk::ZeroDay => cursor.digits(2, 2).map(|d| fields.day = Some(d)).is_some(),
            Chunk::ZeroYearDay => cursor
                .digits(3, 3)
                .map(|d| fields.year_day = Some(d))
                .is_some(),
            Chunk::Hour => cursor.digits(1, 2).map(|h| fields.hour = h).is_some(),
            Chunk::Hour12 => cursor.digits(1, 2).map(|h| fields.hour = h).is_some(),
            Chunk::ZeroHour12 => cursor.digits(2, 2).map(|h| fields.hour = h).is_some(),
            Chunk::Minute => cursor.digits(1, 2).map(|m| fields.minute = m).is_some(),
            Chunk::ZeroMinute => cursor.digits(2, 2).map(|m| fields.minute = m).is_some(),
            Chunk::Second | Chunk::ZeroSecond => {
                let min = if *chunk == Chunk::Second { 1 } else { 2 };
                let parsed = cursor.digits(min, 2).map(|s| fields.second = s).is_some();
                let layout_has_fraction =
                    matches!(chunks.get(idx + 1), Some(Chunk::Fraction { .. }));
                if parsed && !layout_has_fraction {
                    if let Some(nanos) = parse_fraction(&mut cursor, None) {
                        fields.nanosecond = nanos;
                    }
                }
                parsed
            }
            Chunk::LongYear => cursor
                .digits(4, 4)
                .map(|y| fields.year = i32::try_from(y).ok())
                .is_some(),
            Chunk::Year => cursor
                .digits(2, 2)
                .map(|y| {
                    let y = i32::try_from(y).unwrap_or_default();
                    fields.year = Some(if y >= 69 { 1900 + y } else { 2000 + y });
                })
                .is_some(),
            Chunk::Pm { upper } => {
                let (pm, am) = if upper { ("PM", "AM") } else { ("pm", "am") };
                if let Some(rest) = cursor.rest.strip_prefix(pm) {
                    cursor.rest = rest;
                    fields.pm = Some(true);
                    true
                } else if let Some(rest) = cursor.rest.strip_prefix(am) {
                    cursor.rest = rest;
                    fields.pm = Some(false);
                    true
                } else {
                    false
                }
            }
            Chunk::TzName => {
                let len = cursor
                    .rest
                    .bytes()
                    .take_while(u8::is_ascii_uppercase)
                    .count();
                if (3..=5).contains(&len) {
                    cursor.rest = &cursor.rest[len..];
                    // Unknown abbreviations are recorded with a zero offset.
                    fields.offset.get_or_insert(0);
                    true
                } else {
                    false
                }
            }
            Chunk::NumTz { colon, short, iso } => {
                if iso && cursor.rest.starts_with('Z') {
                    cursor.rest = &cursor.rest[1..];
                    fields.offset = Some(0);
                    true
                } else {
                    parse_numeric_offset(&mut cursor, colon, short)
                        .map(|o| fields.offset = Some(o))
                        .is_some()
                }
            }
            Chunk::Fraction {
                separator,
                digits,
                trim,
            } => {
                if trim {
                    if let Some(nanos) = parse_fraction(&mut cursor, None) {
                        fields.nanosecond = nanos;
                    }
                    true
                } else if cursor.rest.starts_with(separator) {
                    parse_fraction(&mut cursor, Some(digits))
                        .map(|n| fields.nanosecond = n)
                        .is_some()
                } else {
                    false
                }
            }
        };
        if !ok {
            return Err(fail(&format!("cannot parse {:?} as {chunk:?}", cursor.rest)));
        }
    }

    if !cursor.rest.is_empty() {
        return Err(fail(&format!("extra text: {:?}", cursor.rest)));
    }

    match fields.pm {
        Some(true) if fields.hour < 12 => fields.hour += 12,
        Some(false) if fields.hour == 12 => fields.hour = 0,
        _ => {}
    }

    let year = fields.year.unwrap_or(0);
    let date = match (fields.month, fields.day, fields.year_day) {
        (None, None, Some(ordinal)) => NaiveDate::from_yo_opt(year, ordinal),
        (month, day, _) => NaiveDate::from_ymd_opt(year, month.unwrap_or(1), day.unwrap_or(1)),
    }
    .ok_or_else(|| fail("day out of range"))?;
    let time = NaiveTime::from_hms_nano_opt(
        fields.hour,
        fields.minute,
        fields.second,
        fields.nanosecond,
    )
    .ok_or_else(|| fail("time out of range"))?;
    let naive = date.and_time(time);

    let resolved = match fields.offset {
        Some(seconds) => FixedOffset::east_opt(seconds)
            .and_then(|offset| offset.from_local_datetime(&naive).single()),
        None => zone
            .from_local_datetime(&naive)
            .earliest()
            .map(|time| time.with_timezone(&time.offset().fix())),
    };
    resolved.ok_or_else(|| fail("time does not exist in zone"))
}

fn parse_numeric_offset(cursor: &mut Cursor<'_>, colon: bool, short: bool) -> Option<i32> {
    let sign = match cursor.rest.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    cursor.rest = &cursor.rest[1..];
    let hours = cursor.digits(2, 2)?;
    let minutes = if short {
        0
    } else {
        if colon {
            cursor.rest = cursor.rest.strip_prefix(':')?;
        }
        cursor.digits(2, 2)?
    };
    let seconds = i32::try_from(hours * 3600 + minutes * 60).ok()?;
    Some(sign * seconds)
}

/// Reads `.123` or `,123`. With `exact` the digit count must match.
fn parse_fraction(cursor: &mut Cursor<'_>, exact: Option<usize>) -> Option<u32> {
    let mut chars = cursor.rest.chars();
    let separator = chars.next()?;
    if separator != '.' && separator != ',' {
        return None;
    }
    let digits: String = chars.take_while(char::is_ascii_digit).collect();
    if digits.is_empty() || exact.is_some_and(|n| n != digits.len()) {
        return None;
    }
    cursor.rest = &cursor.rest[1 + digits.len()..];
    let mut padded = digits;
    padded.truncate(9);
    while padded.len() < 9 {
        padded.push('0');
    }
    padded.parse().ok()
}
