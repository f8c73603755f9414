// SPDX-License-Identifier: Apache-2.0 OR MIT
#[cfg(test)]
use lithos_gotmpl_engine::{EvalContext, FunctionRegistryBuilder};
use lithos_gotmpl_engine::Error;
use serde_json::Value;
use std::fmt;

use crate::number::Number;

pub mod conversion;
pub mod numeric;
pub mod time;

pub(crate) fn expect_exact_args(name: &str, args: &[Value], expected: usize) -> Result<(), Error> {
    if args.len() != expected {
        return Err(Error::render(
            format!(
                "{name} expected {expected} argument{}, got {}",
                if expected == 1 { "" } else { "s" },
                args.len()
            ),
            None,
        ));
    }
    Ok(())
}

pub(crate) fn expect_args_between(
    name: &str,
    args: &[Value],
    min: usize,
    max: usize,
) -> Result<(), Error> {
    if args.len() < min || args.len() > max {
        return Err(Error::render(
            format!(
                "{name} expected between {min} and {max} arguments, got {}",
                args.len()
            ),
            None,
        ));
    }
    Ok(())
}

pub(crate) fn expect_string(name: &str, value: &Value, position: usize) -> Result<String, Error> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(Error::render(
            format!("{name} argument {position} must be coercible to string, got {value:?}"),
            None,
        )),
    }
}

pub(crate) fn expect_number(name: &str, value: &Value, position: usize) -> Result<Number, Error> {
    Number::from_value(value).map_err(|err| {
        Error::render(format!("{name} argument {position}: {err}"), None)
    })
}

pub(crate) fn expect_numbers(name: &str, args: &[Value]) -> Result<Vec<Number>, Error> {
    args.iter()
        .enumerate()
        .map(|(idx, value)| expect_number(name, value, idx + 1))
        .collect()
}

/// Wraps a typed helper failure into the engine's render error, prefixed with
/// the template-facing function name.
pub(crate) fn render_error(name: &str, err: impl fmt::Display) -> Error {
    Error::render(format!("{name}: {err}"), None)
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
pub(crate) fn empty_context() -> EvalContext {
    EvalContext::new(Value::Null, FunctionRegistryBuilder::new().build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn arity_errors_name_the_function() {
        let err = expect_exact_args("toBool", &[], 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "render error: toBool expected 1 argument, got 0"
        );

        let err = expect_args_between("round", &[json!(1)], 2, 3).unwrap_err();
        assert_eq!(
            err.to_string(),
            "render error: round expected between 2 and 3 arguments, got 1"
        );
    }

    #[test]
    fn expect_number_reports_position() {
        let err = expect_number("add", &json!([1]), 2).unwrap_err();
        assert!(
            err.to_string().starts_with("render error: add argument 2:"),
            "unexpected error: {err}"
        );
    }
}
