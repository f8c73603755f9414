// SPDX-License-Identifier: Apache-2.0 OR MIT
use serde_json::Value;
use thiserror::Error;

use crate::functions::value_kind;

/// Errors raised by the numeric helpers.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NumericError {
    #[error("cannot use {kind} value {value} as a number")]
    NotNumeric { kind: &'static str, value: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("modulo by zero")]
    ModuloByZero,
    #[error("result {0} is not a finite number")]
    NotFinite(f64),
}

/// A template number tagged with the kind it arrived as.
///
/// Arithmetic widens to `f64`; the result is converted back to the kind of
/// the first operand with [`Number::with_kind_of`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Uint(u64),
    Float(f64),
}

impl Number {
    /// Reads a template value as a number. Bools count as 0/1, null as 0 and
    /// numeric strings are parsed.
    pub fn from_value(value: &Value) -> Result<Self, NumericError> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Number::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(Number::Uint(u))
                } else {
                    Ok(Number::Float(n.as_f64().unwrap_or_default()))
                }
            }
            Value::Bool(b) => Ok(Number::Int(i64::from(*b))),
            Value::Null => Ok(Number::Int(0)),
            Value::String(s) => Self::parse(s).ok_or_else(|| NumericError::NotNumeric {
                kind: "string",
                value: format!("{s:?}"),
            }),
            other => Err(NumericError::NotNumeric {
                kind: value_kind(other),
                value: other.to_string(),
            }),
        }
    }

    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(i) = text.parse::<i64>() {
            return Some(Number::Int(i));
        }
        if let Ok(u) = text.parse::<u64>() {
            return Some(Number::Uint(u));
        }
        text.parse::<f64>().ok().map(Number::Float)
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Uint(u) => u as f64,
            Number::Float(f) => f,
        }
    }

    /// Converts `value` to the kind of `self`. Integer kinds truncate toward
    /// zero and saturate at their bounds.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn with_kind_of(self, value: f64) -> Number {
        match self {
            Number::Int(_) => Number::Int(value.trunc() as i64),
            Number::Uint(_) => Number::Uint(value.trunc() as u64),
            Number::Float(_) => Number::Float(value),
        }
    }

    /// Converts back into a template value; non-finite floats have no JSON
    /// representation and are rejected.
    pub fn into_value(self) -> Result<Value, NumericError> {
        match self {
            Number::Int(i) => Ok(Value::from(i)),
            Number::Uint(u) => Ok(Value::from(u)),
            Number::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .ok_or(NumericError::NotFinite(f)),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        Number::Uint(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

/// Left-to-right reductions shared by the numeric helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
}

impl Operation {
    /// Result of reducing an empty argument list.
    pub fn identity(self) -> Number {
        match self {
            Operation::Add | Operation::Sub | Operation::Mod | Operation::Min | Operation::Max => {
                Number::Int(0)
            }
            Operation::Mul | Operation::Div => Number::Int(1),
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> Result<f64, NumericError> {
        match self {
            Operation::Add => Ok(lhs + rhs),
            Operation::Sub => Ok(lhs - rhs),
            Operation::Mul => Ok(lhs * rhs),
            Operation::Div if rhs == 0.0 => Err(NumericError::DivisionByZero),
            Operation::Div => Ok(lhs / rhs),
            Operation::Mod if rhs == 0.0 => Err(NumericError::ModuloByZero),
            Operation::Mod => Ok(lhs % rhs),
            Operation::Min => Ok(lhs.min(rhs)),
            Operation::Max => Ok(lhs.max(rhs)),
        }
    }

    /// Reduces `operands`, keeping the kind of the first one.
    pub fn reduce(self, operands: &[Number]) -> Result<Number, NumericError> {
        let Some((first, rest)) = operands.split_first() else {
            return Ok(self.identity());
        };
        let result = self.fold(first.as_f64(), rest)?;
        Ok(first.with_kind_of(result))
    }

    /// Reduces `operands` and always yields a float.
    pub fn reduce_float(self, operands: &[Number]) -> Result<f64, NumericError> {
        match operands.split_first() {
            None => Ok(self.identity().as_f64()),
            Some((first, rest)) => self.fold(first.as_f64(), rest),
        }
    }

    fn fold(self, initial: f64, rest: &[Number]) -> Result<f64, NumericError> {
        rest.iter()
            .try_fold(initial, |acc, operand| self.apply(acc, operand.as_f64()))
    }
}
