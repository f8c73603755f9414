// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::fmt;
use std::str::FromStr;

use super::TimeError;

pub const NANOSECOND: i64 = 1;
pub const MICROSECOND: i64 = 1_000 * NANOSECOND;
pub const MILLISECOND: i64 = 1_000 * MICROSECOND;
pub const SECOND: i64 = 1_000 * MILLISECOND;
pub const MINUTE: i64 = 60 * SECOND;
pub const HOUR: i64 = 60 * MINUTE;

/// A signed span of nanoseconds using Go's duration syntax (`1h2m3.5s`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GoDuration(pub i64);

impl GoDuration {
    pub const ZERO: GoDuration = GoDuration(0);

    pub fn from_nanos(nanos: i64) -> Self {
        GoDuration(nanos)
    }

    pub fn from_secs(secs: i64) -> Self {
        GoDuration(secs.saturating_mul(SECOND))
    }

    pub fn as_nanos(self) -> i64 {
        self.0
    }

    pub fn to_chrono(self) -> chrono::Duration {
        chrono::Duration::nanoseconds(self.0)
    }

    /// Builds a duration from a chrono span, saturating when it does not fit
    /// into nanoseconds.
    pub fn from_chrono(span: chrono::Duration) -> Self {
        match span.num_nanoseconds() {
            Some(nanos) => GoDuration(nanos),
            None if span < chrono::Duration::zero() => GoDuration(i64::MIN),
            None => GoDuration(i64::MAX),
        }
    }

    /// Rounds half away from zero to a multiple of `multiple`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn round(self, multiple: GoDuration) -> Self {
        if multiple.0 <= 0 {
            return self;
        }
        let d = i128::from(self.0);
        let m = i128::from(multiple.0);
        let mut r = d % m;
        let rounded = if d < 0 {
            r = -r;
            if r + r < m {
                d + r
            } else {
                d - m + r
            }
        } else if r + r < m {
            d - r
        } else {
            d + m - r
        };
        GoDuration(rounded.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
    }

    /// Parses Go duration syntax: an optional sign followed by decimal numbers
    /// with unit suffixes (`ns`, `us`, `µs`, `ms`, `s`, `m`, `h`).
    pub fn parse(input: &str) -> Result<Self, TimeError> {
        let invalid = || TimeError::InvalidDuration(input.to_string());

        let mut rest = input;
        let mut negative = false;
        if let Some(stripped) = rest.strip_prefix('-') {
            negative = true;
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('+') {
            rest = stripped;
        }
        if rest == "0" {
            return Ok(GoDuration::ZERO);
        }
        if rest.is_empty() {
            return Err(invalid());
        }

        let mut total: u64 = 0;
        while !rest.is_empty() {
            if !rest.starts_with(|c: char| c == '.' || c.is_ascii_digit()) {
                return Err(invalid());
            }

            let (whole, after_whole) = split_digits(rest);
            let has_whole = !whole.is_empty();
            let whole: u64 = if has_whole {
                whole
                    .parse()
                    .map_err(|_| TimeError::DurationOverflow(input.to_string()))?
            } else {
                0
            };
            rest = after_whole;

            let mut fraction = "";
            if let Some(after_dot) = rest.strip_prefix('.') {
                let (digits, after_fraction) = split_digits(after_dot);
                fraction = digits;
                rest = after_fraction;
            }
            if !has_whole && fraction.is_empty() {
                return Err(invalid());
            }

            let unit_len = rest
                .find(|c: char| c == '.' || c.is_ascii_digit())
                .unwrap_or(rest.len());
            if unit_len == 0 {
                return Err(TimeError::MissingUnit(input.to_string()));
            }
            let unit_name = &rest[..unit_len];
            rest = &rest[unit_len..];
            let unit = unit_nanos(unit_name).ok_or_else(|| TimeError::UnknownUnit {
                unit: unit_name.to_string(),
                input: input.to_string(),
            })?;

            let overflow = || TimeError::DurationOverflow(input.to_string());
            let mut value = whole.checked_mul(unit).ok_or_else(overflow)?;
            if !fraction.is_empty() {
                value = value
                    .checked_add(fraction_nanos(fraction, unit))
                    .ok_or_else(overflow)?;
            }
            total = total.checked_add(value).ok_or_else(overflow)?;
            if total > i64::MAX as u64 + u64::from(negative) {
                return Err(overflow());
            }
        }

        let nanos = if negative {
            0i64.checked_sub_unsigned(total)
                .ok_or_else(|| TimeError::DurationOverflow(input.to_string()))?
        } else {
            i64::try_from(total).map_err(|_| TimeError::DurationOverflow(input.to_string()))?
        };
        Ok(GoDuration(nanos))
    }
}

fn split_digits(input: &str) -> (&str, &str) {
    let end = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    input.split_at(end)
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn unit_nanos(unit: &str) -> Option<u64> {
    let nanos = match unit {
        "ns" => NANOSECOND,
        "us" | "µs" | "μs" => MICROSECOND,
        "ms" => MILLISECOND,
        "s" => SECOND,
        "m" => MINUTE,
        "h" => HOUR,
        _ => return None,
    };
    Some(nanos as u64)
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn fraction_nanos(digits: &str, unit: u64) -> u64 {
    // Go keeps at most 19 significant fraction digits before scaling.
    let digits = &digits[..digits.len().min(18)];
    let fraction: u64 = digits.parse().unwrap_or(0);
    let scale = 10u64.pow(u32::try_from(digits.len()).unwrap_or(0)) as f64;
    (fraction as f64 * (unit as f64 / scale)) as u64
}

/// Splits `value` by `10^precision`, rendering the remainder as a trimmed
/// fraction (`.5`, `.025`, or nothing).
fn split_fraction(value: u64, precision: u32) -> (u64, String) {
    let pow = 10u64.pow(precision);
    let whole = value / pow;
    let remainder = value % pow;
    if remainder == 0 {
        return (whole, String::new());
    }
    let digits = format!("{remainder:0width$}", width = precision as usize);
    (whole, format!(".{}", digits.trim_end_matches('0')))
}

impl fmt::Display for GoDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("0s");
        }
        let negative = self.0 < 0;
        let nanos = self.0.unsigned_abs();
        let sign = if negative { "-" } else { "" };

        #[allow(clippy::cast_sign_loss)]
        let second = SECOND as u64;
        if nanos < second {
            let (whole, fraction, unit) = if nanos < 1_000 {
                (nanos, String::new(), "ns")
            } else if nanos < 1_000_000 {
                let (whole, fraction) = split_fraction(nanos, 3);
                (whole, fraction, "µs")
            } else {
                let (whole, fraction) = split_fraction(nanos, 6);
                (whole, fraction, "ms")
            };
            return write!(f, "{sign}{whole}{fraction}{unit}");
        }

        let (seconds, fraction) = split_fraction(nanos, 9);
        let minutes = seconds / 60;
        let hours = minutes / 60;
        write!(f, "{sign}")?;
        if hours > 0 {
            write!(f, "{hours}h")?;
        }
        if minutes > 0 {
            write!(f, "{}m", minutes % 60)?;
        }
        write!(f, "{}{fraction}s", seconds % 60)
    }
}

impl FromStr for GoDuration {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GoDuration::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compound_durations() {
        assert_eq!(GoDuration::parse("2h5s").unwrap(), GoDuration(2 * HOUR + 5 * SECOND));
        assert_eq!(GoDuration::parse("1.5h").unwrap(), GoDuration(90 * MINUTE));
        assert_eq!(GoDuration::parse("-1m").unwrap(), GoDuration(-MINUTE));
        assert_eq!(GoDuration::parse("300ms").unwrap(), GoDuration(300 * MILLISECOND));
        assert_eq!(GoDuration::parse("1µs").unwrap(), GoDuration(MICROSECOND));
        assert_eq!(GoDuration::parse("0").unwrap(), GoDuration::ZERO);
        assert_eq!(GoDuration::parse(".5s").unwrap(), GoDuration(500 * MILLISECOND));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert_eq!(
            GoDuration::parse("").unwrap_err(),
            TimeError::InvalidDuration(String::new())
        );
        assert_eq!(
            GoDuration::parse("10").unwrap_err(),
            TimeError::MissingUnit("10".into())
        );
        assert_eq!(
            GoDuration::parse("3x").unwrap_err(),
            TimeError::UnknownUnit {
                unit: "x".into(),
                input: "3x".into()
            }
        );
        assert!(GoDuration::parse("h").is_err());
        assert!(GoDuration::parse("9999999999h").is_err());
    }

    #[test]
    fn formats_like_go() {
        assert_eq!(GoDuration(0).to_string(), "0s");
        assert_eq!(GoDuration(HOUR).to_string(), "1h0m0s");
        assert_eq!(GoDuration(95 * SECOND).to_string(), "1m35s");
        assert_eq!(GoDuration(1500 * MILLISECOND).to_string(), "1.5s");
        assert_eq!(GoDuration(2 * HOUR + 5 * SECOND).to_string(), "2h0m5s");
        assert_eq!(GoDuration(-90 * SECOND).to_string(), "-1m30s");
        assert_eq!(GoDuration(1500 * MICROSECOND).to_string(), "1.5ms");
        assert_eq!(GoDuration(2 * MICROSECOND).to_string(), "2µs");
        assert_eq!(GoDuration(42).to_string(), "42ns");
    }

    #[test]
    fn rounds_half_away_from_zero() {
        let second = GoDuration(SECOND);
        assert_eq!(GoDuration(1500 * MILLISECOND).round(second), GoDuration(2 * SECOND));
        assert_eq!(GoDuration(1499 * MILLISECOND).round(second), GoDuration(SECOND));
        assert_eq!(GoDuration(-1500 * MILLISECOND).round(second), GoDuration(-2 * SECOND));
    }
}
