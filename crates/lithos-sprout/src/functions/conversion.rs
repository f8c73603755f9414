// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Type conversion helpers (`toBool`, `toInt`, `toString`, ...).
//!
//! Every helper exists twice: a typed function returning
//! [`ConversionError`], and a template adapter registered by
//! [`ConversionRegistry`].

use std::fmt;
use std::num::IntErrorKind;

use chrono::{DateTime, FixedOffset, Local, SecondsFormat};
use lithos_gotmpl_engine::{value_to_string, Error, EvalContext};
use serde_json::{json, Value};
use thiserror::Error;

use super::{expect_exact_args, expect_string, render_error, value_kind};
use crate::error::HandlerError;
use crate::gotime::{self, GoDuration, TimeError};
use crate::handler::HandlerLink;
use crate::notice::Notice;
use crate::registry::{AliasMap, FunctionMap, Registry};

/// Errors raised by the conversion helpers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("unable to cast {value} of type {kind} to {target}")]
    Cast {
        value: String,
        kind: &'static str,
        target: &'static str,
    },
    #[error("unable to cast negative value {value} to {target}")]
    Negative { value: String, target: &'static str },
    #[error("strconv.{func}: parsing {input:?}: invalid syntax")]
    Syntax { func: &'static str, input: String },
    #[error("strconv.{func}: parsing {input:?}: value out of range")]
    Range { func: &'static str, input: String },
    #[error(transparent)]
    Time(#[from] TimeError),
}

impl ConversionError {
    fn cast(value: &Value, target: &'static str) -> Self {
        ConversionError::Cast {
            value: match value {
                Value::String(s) => format!("{s:?}"),
                other => other.to_string(),
            },
            kind: value_kind(value),
            target,
        }
    }
}

/// Converts `value` to a bool. Strings follow `strconv.ParseBool`, except that
/// the empty string is `false`.
pub fn to_bool(value: &Value) -> Result<bool, ConversionError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => match s.as_str() {
            "" => Ok(false),
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err(ConversionError::Syntax {
                func: "ParseBool",
                input: s.clone(),
            }),
        },
        other => Err(ConversionError::cast(other, "bool")),
    }
}

/// Converts `value` to a signed integer.
pub fn to_int(value: &Value) -> Result<i64, ConversionError> {
    let wide = to_integer(value, "int64")?;
    i64::try_from(wide).map_err(|_| ConversionError::Range {
        func: "ParseInt",
        input: wide.to_string(),
    })
}

/// Converts `value` to an unsigned integer. Negative input is an error.
pub fn to_uint(value: &Value) -> Result<u64, ConversionError> {
    let wide = to_integer(value, "uint64")?;
    if wide < 0 {
        return Err(ConversionError::Negative {
            value: wide.to_string(),
            target: "uint64",
        });
    }
    u64::try_from(wide).map_err(|_| ConversionError::Range {
        func: "ParseUint",
        input: wide.to_string(),
    })
}

#[allow(clippy::cast_possible_truncation)]
fn to_integer(value: &Value, target: &'static str) -> Result<i128, ConversionError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i128::from(i))
            } else if let Some(u) = n.as_u64() {
                Ok(i128::from(u))
            } else {
                // Floats truncate toward zero; `as` saturates at the bounds.
                Ok(n.as_f64().unwrap_or_default().trunc() as i128)
            }
        }
        Value::Bool(b) => Ok(i128::from(*b)),
        Value::Null => Ok(0),
        Value::String(s) => {
            parse_prefixed_int(trim_zero_decimal(s.trim())).ok_or_else(|| {
                ConversionError::cast(value, target)
            })
        }
        other => Err(ConversionError::cast(other, target)),
    }
}

/// `"12.000"` becomes `"12"`; other decimal tails are kept so they fail to parse.
fn trim_zero_decimal(text: &str) -> &str {
    match text.split_once('.') {
        Some((whole, tail))
            if !whole.is_empty() && !tail.is_empty() && tail.bytes().all(|b| b == b'0') =>
        {
            whole
        }
        _ => text,
    }
}

/// Parses an integer with Go's base prefixes: `0x`, `0o`, `0b`, and a bare
/// leading `0` for octal.
fn parse_prefixed_int(text: &str) -> Option<i128> {
    let (negative, unsigned) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let lower = unsigned.to_ascii_lowercase();
    let (radix, digits) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, &lower[1..])
    } else {
        (10, lower.as_str())
    };
    let digits = digits.replace('_', "");
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    let magnitude = i128::from_str_radix(&digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Converts `value` to a float.
pub fn to_float64(value: &Value) -> Result<f64, ConversionError> {
    match value {
        Value::Number(n) => Ok(n.as_f64().unwrap_or_default()),
        Value::Bool(b) => Ok(f64::from(u8::from(*b))),
        Value::Null => Ok(0.0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ConversionError::cast(value, "float64")),
        other => Err(ConversionError::cast(other, "float64")),
    }
}

/// Reads the decimal rendering of `value` as a base 8 number, so `777`
/// becomes `511`.
pub fn to_octal(value: &Value) -> Result<i64, ConversionError> {
    let text = value_to_string(value);
    i64::from_str_radix(&text, 8).map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => ConversionError::Range {
            func: "ParseInt",
            input: text.clone(),
        },
        _ => ConversionError::Syntax {
            func: "ParseInt",
            input: text.clone(),
        },
    })
}

/// Anything [`to_string`] accepts.
pub enum Stringable<'a> {
    Value(&'a Value),
    Bytes(&'a [u8]),
    Display(&'a dyn fmt::Display),
}

impl<'a> Stringable<'a> {
    /// Wraps any `Display` value, such as an error.
    pub fn display<T: fmt::Display>(value: &'a T) -> Self {
        Stringable::Display(value)
    }
}

impl<'a> From<&'a Value> for Stringable<'a> {
    fn from(value: &'a Value) -> Self {
        Stringable::Value(value)
    }
}

impl<'a> From<&'a [u8]> for Stringable<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Stringable::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for Stringable<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Stringable::Bytes(bytes)
    }
}

impl<'a> From<&'a str> for Stringable<'a> {
    fn from(text: &'a str) -> Self {
        Stringable::Bytes(text.as_bytes())
    }
}

/// Renders `value` the way the engine prints it: null is empty, arrays and
/// objects are JSON, byte slices are decoded lossily.
pub fn to_string<'a>(value: impl Into<Stringable<'a>>) -> String {
    match value.into() {
        Stringable::Value(value) => value_to_string(value),
        Stringable::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Stringable::Display(display) => display.to_string(),
    }
}

/// Parses `value` with a Go reference layout in the local zone.
pub fn to_date(layout: &str, value: &str) -> Result<DateTime<FixedOffset>, ConversionError> {
    Ok(gotime::parse_in(layout, value, &Local)?)
}

/// Numbers are nanoseconds. Strings use Go duration syntax; bare digits are
/// nanoseconds.
#[allow(clippy::cast_possible_truncation)]
pub fn to_duration(value: &Value) -> Result<GoDuration, ConversionError> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(nanos) => Ok(GoDuration::from_nanos(nanos)),
            None => Ok(GoDuration::from_nanos(n.as_f64().unwrap_or_default() as i64)),
        },
        Value::Null => Ok(GoDuration::ZERO),
        Value::String(s) => {
            let text = s.trim();
            if text.contains(['n', 's', 'u', 'µ', 'm', 'h']) {
                Ok(GoDuration::parse(text)?)
            } else {
                Ok(GoDuration::parse(&format!("{text}ns"))?)
            }
        }
        other => Err(ConversionError::cast(other, "time.Duration")),
    }
}

/// Registry for the conversion helpers.
#[derive(Debug, Default)]
pub struct ConversionRegistry {
    link: Option<HandlerLink>,
}

impl ConversionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handler link, once the registry has been added to one.
    pub fn link(&self) -> Option<&HandlerLink> {
        self.link.as_ref()
    }
}

impl Registry for ConversionRegistry {
    fn uid(&self) -> &str {
        "lithos/sprout.conversion"
    }

    fn link_handler(&mut self, link: HandlerLink) {
        self.link = Some(link);
    }

    fn register_functions(&self, functions: &mut FunctionMap) -> Result<(), HandlerError> {
        functions
            .add("toBool", to_bool_helper)
            .add("toInt", to_int_helper)
            .add("toInt64", to_int64_helper)
            .add("toUint", to_uint_helper)
            .add("toUint64", to_uint64_helper)
            .add("toFloat64", to_float64_helper)
            .add("toOctal", to_octal_helper)
            .add("toString", to_string_helper)
            .add("toDate", to_date_helper)
            .add("toDuration", to_duration_helper);
        Ok(())
    }

    fn register_aliases(&self, aliases: &mut AliasMap) -> Result<(), HandlerError> {
        aliases
            .add("toInt", ["atoi", "int"])
            .add("toInt64", ["int64"])
            .add("toFloat64", ["float64"])
            .add("toOctal", ["toDecimal"]);
        Ok(())
    }

    fn register_notices(&self, notices: &mut Vec<Notice>) -> Result<(), HandlerError> {
        notices.push(Notice::deprecated("toDecimal", "use `toOctal` instead"));
        Ok(())
    }
}

pub fn to_bool_helper(_ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("toBool", args, 1)?;
    to_bool(&args[0])
        .map(Value::Bool)
        .map_err(|err| render_error("toBool", err))
}

pub fn to_int_helper(_ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("toInt", args, 1)?;
    to_int(&args[0])
        .map(|i| json!(i))
        .map_err(|err| render_error("toInt", err))
}

pub fn to_int64_helper(_ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("toInt64", args, 1)?;
    to_int(&args[0])
        .map(|i| json!(i))
        .map_err(|err| render_error("toInt64", err))
}

pub fn to_uint_helper(_ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("toUint", args, 1)?;
    to_uint(&args[0])
        .map(|u| json!(u))
        .map_err(|err| render_error("toUint", err))
}

pub fn to_uint64_helper(_ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("toUint64", args, 1)?;
    to_uint(&args[0])
        .map(|u| json!(u))
        .map_err(|err| render_error("toUint64", err))
}

pub fn to_float64_helper(_ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("toFloat64", args, 1)?;
    let float = to_float64(&args[0]).map_err(|err| render_error("toFloat64", err))?;
    serde_json::Number::from_f64(float)
        .map(Value::Number)
        .ok_or_else(|| render_error("toFloat64", format!("{float} is not a finite number")))
}

pub fn to_octal_helper(_ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("toOctal", args, 1)?;
    to_octal(&args[0])
        .map(|i| json!(i))
        .map_err(|err| render_error("toOctal", err))
}

pub fn to_string_helper(_ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("toString", args, 1)?;
    Ok(Value::String(to_string(&args[0])))
}

pub fn to_date_helper(_ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("toDate", args, 2)?;
    let layout = expect_string("toDate", &args[0], 1)?;
    let value = expect_string("toDate", &args[1], 2)?;
    let date = to_date(&layout, &value).map_err(|err| render_error("toDate", err))?;
    Ok(Value::String(date.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
}

pub fn to_duration_helper(_ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("toDuration", args, 1)?;
    to_duration(&args[0])
        .map(|duration| Value::String(duration.to_string()))
        .map_err(|err| render_error("toDuration", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::empty_context;
    use serde_json::json;

    #[test]
    fn to_bool_follows_parse_bool() {
        assert!(to_bool(&json!(true)).unwrap());
        assert!(to_bool(&json!(1)).unwrap());
        assert!(!to_bool(&json!(0.0)).unwrap());
        assert!(to_bool(&json!("T")).unwrap());
        assert!(!to_bool(&json!("")).unwrap());
        assert!(!to_bool(&Value::Null).unwrap());
        assert_eq!(
            to_bool(&json!("yes")).unwrap_err().to_string(),
            "strconv.ParseBool: parsing \"yes\": invalid syntax"
        );
        assert_eq!(
            to_bool(&json!([1])).unwrap_err().to_string(),
            "unable to cast [1] of type array to bool"
        );
    }

    #[test]
    fn to_int_handles_prefixes_and_decimal_tails() {
        assert_eq!(to_int(&json!("42")).unwrap(), 42);
        assert_eq!(to_int(&json!("0x1f")).unwrap(), 31);
        assert_eq!(to_int(&json!("0o17")).unwrap(), 15);
        assert_eq!(to_int(&json!("017")).unwrap(), 15);
        assert_eq!(to_int(&json!("0b101")).unwrap(), 5);
        assert_eq!(to_int(&json!("-12.000")).unwrap(), -12);
        assert_eq!(to_int(&json!(3.9)).unwrap(), 3);
        assert_eq!(to_int(&json!(-3.9)).unwrap(), -3);
        assert_eq!(to_int(&json!(true)).unwrap(), 1);
        assert_eq!(to_int(&Value::Null).unwrap(), 0);
        assert_eq!(
            to_int(&json!("1.5")).unwrap_err().to_string(),
            "unable to cast \"1.5\" of type string to int64"
        );
        assert!(to_int(&json!("12.")).is_err());
        assert!(to_uint(&json!("12.")).is_err());
    }

    #[test]
    fn to_uint_rejects_negative_values() {
        assert_eq!(to_uint(&json!("7")).unwrap(), 7);
        assert_eq!(to_uint(&json!(u64::MAX)).unwrap(), u64::MAX);
        assert_eq!(
            to_uint(&json!(-1)).unwrap_err().to_string(),
            "unable to cast negative value -1 to uint64"
        );
    }

    #[test]
    fn to_float64_parses_strings() {
        assert!((to_float64(&json!("2.5")).unwrap() - 2.5).abs() < f64::EPSILON);
        assert!((to_float64(&json!(true)).unwrap() - 1.0).abs() < f64::EPSILON);
        assert!(to_float64(&json!("abc")).is_err());
    }

    #[test]
    fn to_octal_reads_decimal_form_as_base_eight() {
        assert_eq!(to_octal(&json!(777)).unwrap(), 511);
        assert_eq!(to_octal(&json!("10")).unwrap(), 8);
        assert_eq!(
            to_octal(&json!(1.1)).unwrap_err().to_string(),
            "strconv.ParseInt: parsing \"1.1\": invalid syntax"
        );
    }

    #[test]
    fn to_string_accepts_bytes_and_display_values() {
        assert_eq!(to_string(&json!("abc")), "abc");
        assert_eq!(to_string(&json!(1.50)), "1.5");
        assert_eq!(to_string(&Value::Null), "");
        assert_eq!(to_string(&json!({"a": 1})), "{\"a\":1}");
        assert_eq!(to_string(b"abc".as_slice()), "abc");

        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(to_string(Stringable::display(&err)), "disk full");
    }

    #[test]
    fn to_duration_defaults_to_nanoseconds() {
        assert_eq!(to_duration(&json!(1_000)).unwrap().to_string(), "1µs");
        assert_eq!(to_duration(&json!("1h")).unwrap().to_string(), "1h0m0s");
        assert_eq!(to_duration(&json!("1500")).unwrap().to_string(), "1.5µs");
        assert!(to_duration(&json!("1x")).is_err());
    }

    #[test]
    fn helpers_name_the_function_in_errors() {
        let mut ctx = empty_context();
        let err = to_bool_helper(&mut ctx, &[json!("maybe")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "render error: toBool: strconv.ParseBool: parsing \"maybe\": invalid syntax"
        );
        let err = to_int_helper(&mut ctx, &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "render error: toInt expected 1 argument, got 0"
        );
    }

    #[test]
    fn helpers_return_template_values() {
        let mut ctx = empty_context();
        assert_eq!(to_bool_helper(&mut ctx, &[json!(1)]).unwrap(), json!(true));
        assert_eq!(to_int64_helper(&mut ctx, &[json!("9")]).unwrap(), json!(9));
        assert_eq!(to_float64_helper(&mut ctx, &[json!(2)]).unwrap(), json!(2.0));
        assert_eq!(to_octal_helper(&mut ctx, &[json!(777)]).unwrap(), json!(511));
        assert_eq!(
            to_duration_helper(&mut ctx, &[json!("90s")]).unwrap(),
            json!("1m30s")
        );
        assert_eq!(
            to_date_helper(&mut ctx, &[json!("2006-01-02T15:04:05Z07:00"), json!("2024-01-02T03:04:05Z")])
                .unwrap(),
            json!("2024-01-02T03:04:05Z")
        );
    }

    #[test]
    fn registry_declares_aliases_and_notice() {
        let registry = ConversionRegistry::new();
        let mut aliases = AliasMap::new();
        registry.register_aliases(&mut aliases).unwrap();
        assert_eq!(aliases.original_of("atoi"), Some("toInt"));
        assert_eq!(aliases.original_of("toDecimal"), Some("toOctal"));

        let mut notices = Vec::new();
        registry.register_notices(&mut notices).unwrap();
        assert!(notices[0].applies_to("toDecimal"));
    }
}
