// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Arithmetic helpers.
//!
//! Integer helpers (`add`, `mul`, ...) keep the kind of their first operand;
//! the `...f` variants always produce floats.

use lithos_gotmpl_engine::{Error, EvalContext};
use serde_json::Value;

use super::{expect_args_between, expect_exact_args, expect_number, expect_numbers, render_error};
use crate::error::HandlerError;
use crate::handler::HandlerLink;
use crate::notice::Notice;
pub use crate::number::{Number, NumericError, Operation};
use crate::registry::{AliasMap, FunctionMap, Registry};

const DEFAULT_ROUND_THRESHOLD: f64 = 0.5;

pub fn floor(value: Number) -> f64 {
    value.as_f64().floor()
}

pub fn ceil(value: Number) -> f64 {
    value.as_f64().ceil()
}

/// Rounds `value` to `places` decimals. The fractional remainder rounds up
/// once it reaches `threshold` (0.5 when `None`).
pub fn round(value: Number, places: i32, threshold: Option<f64>) -> f64 {
    let threshold = threshold.unwrap_or(DEFAULT_ROUND_THRESHOLD);
    let pow = 10f64.powi(places);
    let digit = value.as_f64() * pow;
    if digit.fract() >= threshold {
        digit.ceil() / pow
    } else {
        digit.floor() / pow
    }
}

/// `value + 1`, in the kind of `value`.
pub fn add1(value: Number) -> Result<Number, NumericError> {
    Operation::Add.reduce(&[value, Number::Int(1)])
}

pub fn add1f(value: Number) -> f64 {
    value.as_f64() + 1.0
}

/// Registry for the numeric helpers.
#[derive(Debug, Default)]
pub struct NumericRegistry {
    link: Option<HandlerLink>,
}

impl NumericRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&self) -> Option<&HandlerLink> {
        self.link.as_ref()
    }
}

impl Registry for NumericRegistry {
    fn uid(&self) -> &str {
        "lithos/sprout.numeric"
    }

    fn link_handler(&mut self, link: HandlerLink) {
        self.link = Some(link);
    }

    fn register_functions(&self, functions: &mut FunctionMap) -> Result<(), HandlerError> {
        functions
            .add("floor", floor_helper)
            .add("ceil", ceil_helper)
            .add("round", round_helper)
            .add("add1", add1_helper)
            .add("add1f", add1f_helper)
            .add("add", |_ctx, args| reduce_helper("add", Operation::Add, args))
            .add("sub", |_ctx, args| reduce_helper("sub", Operation::Sub, args))
            .add("mul", |_ctx, args| reduce_helper("mul", Operation::Mul, args))
            .add("div", |_ctx, args| reduce_helper("div", Operation::Div, args))
            .add("mod", |_ctx, args| reduce_helper("mod", Operation::Mod, args))
            .add("min", |_ctx, args| reduce_helper("min", Operation::Min, args))
            .add("max", |_ctx, args| reduce_helper("max", Operation::Max, args))
            .add("addf", |_ctx, args| {
                reduce_float_helper("addf", Operation::Add, args)
            })
            .add("subf", |_ctx, args| {
                reduce_float_helper("subf", Operation::Sub, args)
            })
            .add("mulf", |_ctx, args| {
                reduce_float_helper("mulf", Operation::Mul, args)
            })
            .add("divf", |_ctx, args| {
                reduce_float_helper("divf", Operation::Div, args)
            })
            .add("minf", |_ctx, args| {
                reduce_float_helper("minf", Operation::Min, args)
            })
            .add("maxf", |_ctx, args| {
                reduce_float_helper("maxf", Operation::Max, args)
            });
        Ok(())
    }

    fn register_aliases(&self, aliases: &mut AliasMap) -> Result<(), HandlerError> {
        aliases.add("max", ["biggest"]);
        Ok(())
    }

    fn register_notices(&self, notices: &mut Vec<Notice>) -> Result<(), HandlerError> {
        notices.push(Notice::deprecated("biggest", "use `max` instead"));
        Ok(())
    }
}

fn reduce_helper(name: &str, operation: Operation, args: &[Value]) -> Result<Value, Error> {
    let operands = expect_numbers(name, args)?;
    operation
        .reduce(&operands)
        .and_then(Number::into_value)
        .map_err(|err| render_error(name, err))
}

fn reduce_float_helper(name: &str, operation: Operation, args: &[Value]) -> Result<Value, Error> {
    let operands = expect_numbers(name, args)?;
    operation
        .reduce_float(&operands)
        .and_then(|result| Number::Float(result).into_value())
        .map_err(|err| render_error(name, err))
}

fn float_value(name: &str, value: f64) -> Result<Value, Error> {
    Number::Float(value)
        .into_value()
        .map_err(|err| render_error(name, err))
}

pub fn floor_helper(_ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("floor", args, 1)?;
    let value = expect_number("floor", &args[0], 1)?;
    float_value("floor", floor(value))
}

pub fn ceil_helper(_ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("ceil", args, 1)?;
    let value = expect_number("ceil", &args[0], 1)?;
    float_value("ceil", ceil(value))
}

#[allow(clippy::cast_possible_truncation)]
pub fn round_helper(_ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
    expect_args_between("round", args, 2, 3)?;
    let value = expect_number("round", &args[0], 1)?;
    let places = expect_number("round", &args[1], 2)?.as_f64().trunc();
    let places = places.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32;
    let threshold = match args.get(2) {
        Some(arg) => Some(expect_number("round", arg, 3)?.as_f64()),
        None => None,
    };
    float_value("round", round(value, places, threshold))
}

pub fn add1_helper(_ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("add1", args, 1)?;
    let value = expect_number("add1", &args[0], 1)?;
    add1(value)
        .and_then(Number::into_value)
        .map_err(|err| render_error("add1", err))
}

pub fn add1f_helper(_ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
    expect_exact_args("add1f", args, 1)?;
    let value = expect_number("add1f", &args[0], 1)?;
    float_value("add1f", add1f(value))
}
