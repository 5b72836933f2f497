//! Arithmetic, comparison and builtin functions for compiled expressions.
//!
//! Integers and floats mix freely; an integer meeting a float is widened.
//! Integer overflow is an error rather than a wrap.

use std::cmp::Ordering;

use aurora_foundation::{Error, ErrorKind, Result, Value};

use crate::ast::Builtin;

fn number_mismatch(v: &Value) -> Error {
    Error::type_mismatch("number", v.type_name())
}

fn overflow() -> Error {
    Error::new(ErrorKind::Overflow)
}

/// Applies an integer op and its float counterpart, widening mixed operands.
#[allow(clippy::cast_precision_loss)]
fn numeric(
    a: &Value,
    b: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => int_op(*x, *y).map(Value::Int).ok_or_else(overflow),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(float_op(*x, *y))),
        (Value::Int(x), Value::Float(y)) => Ok(Value::Float(float_op(*x as f64, *y))),
        (Value::Float(x), Value::Int(y)) => Ok(Value::Float(float_op(*x, *y as f64))),
        (Value::Int(_) | Value::Float(_), other) | (other, _) => Err(number_mismatch(other)),
    }
}

/// Adds two numbers, or concatenates two strings.
pub(crate) fn add_values(a: &Value, b: &Value) -> Result<Value> {
    if let (Value::String(x), Value::String(y)) = (a, b) {
        return Ok(Value::String(format!("{x}{y}").into()));
    }
    numeric(a, b, i64::checked_add, |x, y| x + y)
}

/// Subtracts two numbers.
pub(crate) fn sub_values(a: &Value, b: &Value) -> Result<Value> {
    numeric(a, b, i64::checked_sub, |x, y| x - y)
}

/// Multiplies two numbers.
pub(crate) fn mul_values(a: &Value, b: &Value) -> Result<Value> {
    numeric(a, b, i64::checked_mul, |x, y| x * y)
}

fn is_zero(v: &Value) -> bool {
    match v {
        Value::Int(n) => *n == 0,
        Value::Float(n) => *n == 0.0,
        _ => false,
    }
}

/// Divides two numbers. Integer division truncates toward zero.
pub(crate) fn div_values(a: &Value, b: &Value) -> Result<Value> {
    if a.is_number() && is_zero(b) {
        return Err(Error::new(ErrorKind::DivisionByZero));
    }
    numeric(a, b, i64::checked_div, |x, y| x / y)
}

/// Remainder of two numbers, with the sign of the dividend.
pub(crate) fn rem_values(a: &Value, b: &Value) -> Result<Value> {
    if a.is_number() && is_zero(b) {
        return Err(Error::new(ErrorKind::DivisionByZero));
    }
    numeric(a, b, i64::checked_rem, |x, y| x % y)
}

/// Negates a number.
pub(crate) fn neg_value(a: &Value) -> Result<Value> {
    match a {
        Value::Int(x) => x.checked_neg().map(Value::Int).ok_or_else(overflow),
        Value::Float(x) => Ok(Value::Float(-x)),
        other => Err(number_mismatch(other)),
    }
}

/// Extracts a boolean operand.
pub(crate) fn truthy(v: &Value) -> Result<bool> {
    v.as_bool()
        .ok_or_else(|| Error::type_mismatch("boolean", v.type_name()))
}

/// Orders two values of the same kind; numbers compare by magnitude.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn compare_values(a: &Value, b: &Value) -> Result<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => Ok(x.total_cmp(y)),
        (Value::Int(x), Value::Float(y)) => Ok((*x as f64).total_cmp(y)),
        (Value::Float(x), Value::Int(y)) => Ok(x.total_cmp(&(*y as f64))),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Ok(x.cmp(y)),
        _ => Err(Error::type_mismatch(a.type_name(), b.type_name())),
    }
}

/// Equality as seen by `==`: numbers by magnitude, other kinds exactly.
/// Values of different kinds are never equal.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    if a.is_number() && b.is_number() {
        return compare_values(a, b).is_ok_and(Ordering::is_eq);
    }
    a == b
}

/// Rounds a number to an integer value, keeping floats that do not fit.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn round_with(a: &Value, op: fn(f64) -> f64) -> Result<Value> {
    match a {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(x) => {
            let rounded = op(*x);
            if rounded.is_finite() && rounded.abs() < i64::MAX as f64 {
                Ok(Value::Int(rounded as i64))
            } else {
                Ok(Value::Float(rounded))
            }
        }
        other => Err(number_mismatch(other)),
    }
}

fn extreme(args: &[Value], keep: Ordering) -> Result<Value> {
    let mut best = &args[0];
    for arg in &args[1..] {
        if compare_values(arg, best)? == keep {
            best = arg;
        }
    }
    Ok(best.clone())
}

/// Calls a builtin. Arity has already been checked by the parser.
pub(crate) fn call_builtin(builtin: Builtin, args: &[Value]) -> Result<Value> {
    if !builtin.accepts(args.len()) {
        return Err(Error::internal(format!(
            "{} called with {} arguments",
            builtin.name(),
            args.len()
        )));
    }
    match builtin {
        Builtin::Abs => match &args[0] {
            Value::Int(n) => n.checked_abs().map(Value::Int).ok_or_else(overflow),
            Value::Float(x) => Ok(Value::Float(x.abs())),
            other => Err(number_mismatch(other)),
        },
        Builtin::Min => extreme(args, Ordering::Less),
        Builtin::Max => extreme(args, Ordering::Greater),
        Builtin::Floor => round_with(&args[0], f64::floor),
        Builtin::Ceil => round_with(&args[0], f64::ceil),
        Builtin::Len => match &args[0] {
            Value::String(s) => Ok(Value::from(s.chars().count())),
            other => Err(Error::type_mismatch("string", other.type_name())),
        },
        Builtin::Str => Ok(Value::from(args[0].to_string())),
    }
}
