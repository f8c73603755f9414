// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Date and time helpers.
//!
//! Times travel through templates as RFC 3339 strings. Integers are read as
//! unix seconds and null means "now" according to the handler clock.
//! Durations travel as Go duration strings (`1h2m3s`).

use chrono::{DateTime, FixedOffset, SecondsFormat, TimeZone, Utc};
use lithos_gotmpl_engine::{Error, EvalContext};
use serde_json::Value;

use super::{expect_exact_args, expect_string, render_error, value_kind};
use crate::error::HandlerError;
use crate::gotime::{self, GoDuration, TimeError, Zone, HOUR, MINUTE, SECOND};
use crate::handler::HandlerLink;
use crate::notice::Notice;
use crate::registry::{AliasMap, FunctionMap, Registry};

const HTML_DATE_LAYOUT: &str = "2006-01-02";

/// Formats `time` in the local zone with a Go reference layout.
pub fn date<Tz: TimeZone>(layout: &str, time: &DateTime<Tz>) -> String {
    gotime::format(layout, &Zone::Local.convert(time))
}

/// Formats `time` in `zone`. Unknown zone names fall back to UTC.
pub fn date_in_zone<Tz: TimeZone>(layout: &str, time: &DateTime<Tz>, zone: &str) -> String {
    gotime::format(layout, &Zone::resolve(zone).convert(time))
}

/// A duration of `seconds` seconds.
pub fn duration(seconds: i64) -> GoDuration {
    GoDuration::from_secs(seconds)
}

/// Abbreviates `duration` to its largest whole unit: `y`, `mo`, `d`, `h`,
/// `m` or `s`. The sign is dropped.
pub fn duration_round(duration: GoDuration) -> String {
    const DAY: u64 = 24 * HOUR.unsigned_abs();
    const UNITS: [(u64, &str); 6] = [
        (365 * DAY, "y"),
        (30 * DAY, "mo"),
        (DAY, "d"),
        (HOUR.unsigned_abs(), "h"),
        (MINUTE.unsigned_abs(), "m"),
        (SECOND.unsigned_abs(), "s"),
    ];

    let nanos = duration.as_nanos().unsigned_abs();
    UNITS
        .iter()
        .find(|(unit, _)| nanos > *unit)
        .map_or_else(
            || "0s".to_string(),
            |(unit, suffix)| format!("{}{suffix}", nanos / unit),
        )
}

/// Unix seconds of `time`.
pub fn unix_epoch<Tz: TimeZone>(time: &DateTime<Tz>) -> i64 {
    time.timestamp()
}

/// Shifts `time` by a Go duration such as `-1h` or `1.5h`.
pub fn date_modify(
    modifier: &str,
    time: &DateTime<FixedOffset>,
) -> Result<DateTime<FixedOffset>, TimeError> {
    let shift = GoDuration::parse(modifier)?;
    time.checked_add_signed(shift.to_chrono())
        .ok_or_else(|| TimeError::DurationOverflow(modifier.to_string()))
}

/// `2006-01-02` in the local zone.
pub fn html_date<Tz: TimeZone>(time: &DateTime<Tz>) -> String {
    date(HTML_DATE_LAYOUT, time)
}

/// `2006-01-02` in `zone`.
pub fn html_date_in_zone<Tz: TimeZone>(time: &DateTime<Tz>, zone: &str) -> String {
    date_in_zone(HTML_DATE_LAYOUT, time, zone)
}

/// Time elapsed between `time` and `now`, rounded to the second.
pub fn ago<Tz: TimeZone>(time: &DateTime<Tz>, now: DateTime<Utc>) -> GoDuration {
    let elapsed = now.signed_duration_since(time.with_timezone(&Utc));
    GoDuration::from_chrono(elapsed).round(GoDuration(SECOND))
}

/// Reads a template time value.
#[allow(clippy::cast_possible_truncation)]
pub fn parse_time(value: &Value, now: DateTime<Utc>) -> Result<DateTime<FixedOffset>, TimeError> {
    match value {
        Value::Null => Ok(now.fixed_offset()),
        Value::Number(n) => match n.as_i64() {
            Some(seconds) => gotime::from_unix(seconds),
            None => gotime::from_unix(n.as_f64().unwrap_or_default() as i64),
        },
        Value::String(s) => gotime::from_rfc3339(s),
        other => Err(TimeError::Unsupported(value_kind(other))),
    }
}

fn timestamp(time: &DateTime<FixedOffset>) -> Value {
    Value::String(time.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Registry for the date and time helpers.
#[derive(Debug, Default)]
pub struct TimeRegistry {
    link: Option<HandlerLink>,
}

impl TimeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link used by the helpers; a default one (system clock) until the
    /// registry is added to a handler.
    fn clock_link(&self) -> HandlerLink {
        self.link.clone().unwrap_or_default()
    }
}

impl Registry for TimeRegistry {
    fn uid(&self) -> &str {
        "lithos/sprout.time"
    }

    fn link_handler(&mut self, link: HandlerLink) {
        self.link = Some(link);
    }

    fn register_functions(&self, functions: &mut FunctionMap) -> Result<(), HandlerError> {
        let link = self.clock_link();

        let clock = link.clone();
        functions.add("date", move |_ctx, args| date_helper(&clock, args));
        let clock = link.clone();
        functions.add("dateInZone", move |_ctx, args| {
            date_in_zone_helper(&clock, args)
        });
        functions.add("duration", duration_helper);
        let clock = link.clone();
        functions.add("durationRound", move |_ctx, args| {
            duration_round_helper(&clock, args)
        });
        let clock = link.clone();
        functions.add("unixEpoch", move |_ctx, args| unix_epoch_helper(&clock, args));
        let clock = link.clone();
        functions.add("dateModify", move |_ctx, args| {
            date_modify_helper(&clock, args)
        });
        let clock = link.clone();
        functions.add("htmlDate", move |_ctx, args| html_date_helper(&clock, args));
        let clock = link.clone();
        functions.add("htmlDateInZone", move |_ctx, args| {
            html_date_in_zone_helper(&clock, args)
        });
        let clock = link.clone();
        functions.add("now", move |_ctx, args| now_helper(&clock, args));
        functions.add("ago", move |_ctx, args| ago_helper(&link, args));
        Ok(())
    }

    fn register_aliases(&self, aliases: &mut AliasMap) -> Result<(), HandlerError> {
        aliases
            .add("dateInZone", ["date_in_zone"])
            .add("dateModify", ["date_modify"]);
        Ok(())
    }

    fn register_notices(&self, notices: &mut Vec<Notice>) -> Result<(), HandlerError> {
        notices.push(Notice::deprecated("date_in_zone", "use `dateInZone` instead"));
        notices.push(Notice::deprecated("date_modify", "use `dateModify` instead"));
        Ok(())
    }
}

fn time_arg(
    name: &str,
    link: &HandlerLink,
    value: &Value,
) -> Result<DateTime<FixedOffset>, Error> {
    parse_time(value, link.now()).map_err(|err| render_error(name, err))
}

fn date_helper(link: &HandlerLink, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("date", args, 2)?;
    let layout = expect_string("date", &args[0], 1)?;
    let time = time_arg("date", link, &args[1])?;
    Ok(Value::String(date(&layout, &time)))
}

fn date_in_zone_helper(link: &HandlerLink, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("dateInZone", args, 3)?;
    let layout = expect_string("dateInZone", &args[0], 1)?;
    let time = time_arg("dateInZone", link, &args[1])?;
    let zone = expect_string("dateInZone", &args[2], 3)?;
    Ok(Value::String(date_in_zone(&layout, &time, &zone)))
}

pub fn duration_helper(_ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("duration", args, 1)?;
    let seconds =
        super::conversion::to_int(&args[0]).map_err(|err| render_error("duration", err))?;
    Ok(Value::String(duration(seconds).to_string()))
}

fn duration_round_helper(link: &HandlerLink, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("durationRound", args, 1)?;
    let span = match &args[0] {
        Value::Number(n) => n.as_i64().map_or(GoDuration::ZERO, GoDuration::from_nanos),
        Value::String(text) => match GoDuration::parse(text) {
            Ok(span) => span,
            Err(_) => match gotime::from_rfc3339(text) {
                Ok(since) => GoDuration::from_chrono(link.now().signed_duration_since(since)),
                Err(_) => {
                    tracing::debug!(value = %text, "durationRound input is neither a duration nor a time");
                    GoDuration::ZERO
                }
            },
        },
        _ => GoDuration::ZERO,
    };
    Ok(Value::String(duration_round(span)))
}

fn unix_epoch_helper(link: &HandlerLink, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("unixEpoch", args, 1)?;
    let time = time_arg("unixEpoch", link, &args[0])?;
    Ok(Value::String(unix_epoch(&time).to_string()))
}

fn date_modify_helper(link: &HandlerLink, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("dateModify", args, 2)?;
    let modifier = expect_string("dateModify", &args[0], 1)?;
    let time = time_arg("dateModify", link, &args[1])?;
    let shifted = date_modify(&modifier, &time).map_err(|err| render_error("dateModify", err))?;
    Ok(timestamp(&shifted))
}

fn html_date_helper(link: &HandlerLink, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("htmlDate", args, 1)?;
    let time = time_arg("htmlDate", link, &args[0])?;
    Ok(Value::String(html_date(&time)))
}

fn html_date_in_zone_helper(link: &HandlerLink, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("htmlDateInZone", args, 2)?;
    let time = time_arg("htmlDateInZone", link, &args[0])?;
    let zone = expect_string("htmlDateInZone", &args[1], 2)?;
    Ok(Value::String(html_date_in_zone(&time, &zone)))
}

fn now_helper(link: &HandlerLink, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("now", args, 0)?;
    Ok(timestamp(&link.now().fixed_offset()))
}

fn ago_helper(link: &HandlerLink, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("ago", args, 1)?;
    let time = time_arg("ago", link, &args[0])?;
    Ok(Value::String(ago(&time, link.now()).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::empty_context;
    use crate::handler::Handler;
    use chrono::Local;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn call(name: &str, args: &[Value]) -> Result<Value, Error> {
        let handler = Handler::builder().clock(fixed_now).build();
        let mut registry = TimeRegistry::new();
        registry.link_handler(handler.link());
        let mut functions = FunctionMap::new();
        registry.register_functions(&mut functions).unwrap();
        let func = functions.get(name).unwrap();
        let mut ctx = empty_context();
        func(&mut ctx, args)
    }

    #[test]
    fn duration_round_picks_largest_unit() {
        let round = |text: &str| duration_round(GoDuration::parse(text).unwrap());
        assert_eq!(round("2h5s"), "2h");
        assert_eq!(round("24h5s"), "1d");
        assert_eq!(round("-3m2s"), "3m");
        assert_eq!(round("800h"), "1mo");
        assert_eq!(round("9000h"), "1y");
        assert_eq!(round("0s"), "0s");
        assert_eq!(round("900ms"), "0s");
    }

    #[test]
    fn duration_round_helper_accepts_several_inputs() {
        assert_eq!(call("durationRound", &[json!("2h5s")]).unwrap(), json!("2h"));
        assert_eq!(
            call("durationRound", &[json!(90_000_000_000_i64)]).unwrap(),
            json!("1m")
        );
        assert_eq!(
            call("durationRound", &[json!("2024-04-29T09:00:00Z")]).unwrap(),
            json!("2d")
        );
        assert_eq!(call("durationRound", &[json!("soon")]).unwrap(), json!("0s"));
    }

    #[test]
    fn formats_in_zones() {
        let time = gotime::from_rfc3339("2024-03-01T23:30:00Z").unwrap();
        assert_eq!(date_in_zone("2006-01-02 15:04", &time, "UTC"), "2024-03-01 23:30");
        assert_eq!(
            date_in_zone("2006-01-02 15:04 -07:00", &time, "+02:00"),
            "2024-03-02 01:30 +02:00"
        );
        assert_eq!(html_date_in_zone(&time, "-05:00"), "2024-03-01");
        assert_eq!(
            date("2006", &time),
            time.with_timezone(&Local).format("%Y").to_string()
        );
    }

    #[test]
    fn helpers_read_times_from_templates() {
        assert_eq!(
            call("dateInZone", &[json!("2006-01-02"), json!(0), json!("UTC")]).unwrap(),
            json!("1970-01-01")
        );
        assert_eq!(
            call("htmlDateInZone", &[Value::Null, json!("UTC")]).unwrap(),
            json!("2024-05-01")
        );
        assert_eq!(
            call("unixEpoch", &[json!("2024-05-01T10:00:00Z")]).unwrap(),
            json!("1714557600")
        );
        let err = call("unixEpoch", &[json!("yesterday")]).unwrap_err();
        assert!(err.to_string().contains("expected RFC 3339"), "{err}");
    }

    #[test]
    fn now_and_ago_use_the_linked_clock() {
        assert_eq!(call("now", &[]).unwrap(), json!("2024-05-01T10:00:00Z"));
        assert_eq!(
            call("ago", &[json!("2024-05-01T08:58:59.6Z")]).unwrap(),
            json!("1h1m0s")
        );
    }

    #[test]
    fn date_modify_shifts_by_go_durations() {
        assert_eq!(
            call("dateModify", &[json!("-1.5h"), json!("2024-05-01T10:00:00Z")]).unwrap(),
            json!("2024-05-01T08:30:00Z")
        );
        let err = call("dateModify", &[json!("tomorrow"), Value::Null]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "render error: dateModify: time: invalid duration \"tomorrow\""
        );
    }

    #[test]
    fn duration_counts_seconds() {
        let mut ctx = empty_context();
        assert_eq!(duration_helper(&mut ctx, &[json!(95)]).unwrap(), json!("1m35s"));
        assert_eq!(duration_helper(&mut ctx, &[json!("60")]).unwrap(), json!("1m0s"));
    }
}
