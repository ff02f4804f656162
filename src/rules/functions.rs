//! Value conversion functions usable in rule transform chains.

use std::fmt;
use std::str::FromStr;

use crate::resource::Value;

/// A named unary conversion, e.g. the `int` in `int(year)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformFn {
    Int,
    Float,
    Str,
    Bool,
    Lower,
    Upper,
    Title,
}

impl TransformFn {
    pub fn name(self) -> &'static str {
        match self {
            TransformFn::Int => "int",
            TransformFn::Float => "float",
            TransformFn::Str => "str",
            TransformFn::Bool => "bool",
            TransformFn::Lower => "lower",
            TransformFn::Upper => "upper",
            TransformFn::Title => "title",
        }
    }

    /// Apply the conversion. Null passes through every function unchanged.
    pub fn apply(self, value: Value) -> Result<Value, String> {
        if value == Value::Null {
            return Ok(Value::Null);
        }
        match self {
            TransformFn::Int => to_int(value),
            TransformFn::Float => to_float(value),
            TransformFn::Str => to_str(value),
            TransformFn::Bool => to_bool(value),
            TransformFn::Lower => map_text(value, |s| s.to_lowercase()),
            TransformFn::Upper => map_text(value, |s| s.to_uppercase()),
            TransformFn::Title => map_text(value, title_case),
        }
    }
}

impl FromStr for TransformFn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(TransformFn::Int),
            "float" => Ok(TransformFn::Float),
            "str" => Ok(TransformFn::Str),
            "bool" => Ok(TransformFn::Bool),
            "lower" => Ok(TransformFn::Lower),
            "upper" => Ok(TransformFn::Upper),
            "title" => Ok(TransformFn::Title),
            other => Err(format!("unknown transform function '{}'", other)),
        }
    }
}

impl fmt::Display for TransformFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn to_int(value: Value) -> Result<Value, String> {
    match value {
        Value::Int(i) => Ok(Value::Int(i)),
        Value::Bool(b) => Ok(Value::Int(i64::from(b))),
        Value::Float(f) => float_to_int(f).map(Value::Int),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| format!("'{}' is not an integer", s)),
        other => Err(format!("expecting a scalar, got {}", other.kind())),
    }
}

/// Exact conversion only: no rounding, no saturation.
fn float_to_int(f: f64) -> Result<i64, String> {
    // 2^63 is exactly representable; i64::MAX is not.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if !f.is_finite() {
        return Err(format!("{} is not an integer", f));
    }
    if f.fract() != 0.0 {
        return Err(format!("{} has a fractional part", f));
    }
    if f < -LIMIT || f >= LIMIT {
        return Err(format!("{} is out of integer range", f));
    }
    Ok(f as i64)
}

fn to_float(value: Value) -> Result<Value, String> {
    match value {
        Value::Float(f) => Ok(Value::Float(f)),
        Value::Int(i) => Ok(Value::Float(i as f64)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| format!("'{}' is not a number", s)),
        other => Err(format!("expecting a number, got {}", other.kind())),
    }
}

fn to_str(value: Value) -> Result<Value, String> {
    match value.scalar_text() {
        Some(text) => Ok(Value::String(text)),
        None => Err(format!("expecting a scalar, got {}", value.kind())),
    }
}

fn to_bool(value: Value) -> Result<Value, String> {
    match value {
        Value::Bool(b) => Ok(Value::Bool(b)),
        Value::Int(i) => Ok(Value::Bool(i != 0)),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(format!("'{}' is not a boolean", s)),
        },
        other => Err(format!("expecting a boolean, got {}", other.kind())),
    }
}

fn map_text(value: Value, f: impl Fn(&str) -> String) -> Result<Value, String> {
    match value {
        Value::String(s) => Ok(Value::String(f(&s))),
        other => Err(format!("expecting a string, got {}", other.kind())),
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
