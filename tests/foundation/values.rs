//! Integration tests for Value and Bound
//!
//! Tests the single total order shared by sorted indexes and the solver.

use aurora_foundation::{Bound, Value};
use proptest::prelude::*;
use std::collections::BTreeSet;

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn types_order_boolean_number_string() {
    let mut set = BTreeSet::new();
    set.insert(Value::from("a"));
    set.insert(Value::Int(3));
    set.insert(Value::Bool(true));
    set.insert(Value::Float(-2.5));
    let ordered: Vec<Value> = set.into_iter().collect();
    assert_eq!(
        ordered,
        vec![
            Value::Bool(true),
            Value::Float(-2.5),
            Value::Int(3),
            Value::from("a")
        ]
    );
}

#[test]
fn strings_order_lexicographically() {
    assert!(Value::from("apple") < Value::from("banana"));
    assert!(Value::from("") < Value::from("a"));
}

#[test]
fn rows_order_column_by_column() {
    let a = vec![Value::Int(1), Value::from("z")];
    let b = vec![Value::Int(2), Value::from("a")];
    assert!(a < b);
}

#[test]
fn padded_key_sorts_around_prefix() {
    let stored = vec![Bound::Value(Value::Int(5)), Bound::Value(Value::from("x"))];
    let low = vec![Bound::Value(Value::Int(5)), Bound::Least];
    let high = vec![Bound::Value(Value::Int(5)), Bound::Greatest];
    assert!(low < stored);
    assert!(stored < high);
}

// =============================================================================
// Conversions
// =============================================================================

#[test]
fn conversions() {
    assert_eq!(Value::from(3i32), Value::Int(3));
    assert_eq!(Value::from(2usize), Value::Int(2));
    assert_eq!(Value::from(String::from("s")).as_str(), Some("s"));
    assert_eq!(Value::from(1.5).as_number(), Some(1.5));
    assert_eq!(Value::Int(4).as_number(), Some(4.0));
    assert_eq!(Value::from("x").type_name(), "string");
}

proptest! {
    #[test]
    fn ints_and_floats_order_by_magnitude(a in -1_000i64..1_000, b in -1_000.0f64..1_000.0) {
        #[allow(clippy::cast_precision_loss)]
        let af = a as f64;
        if af < b {
            prop_assert!(Value::Int(a) < Value::Float(b));
        } else if af > b {
            prop_assert!(Value::Int(a) > Value::Float(b));
        }
    }

    #[test]
    fn bounds_bracket_every_value(n in any::<i64>(), s in ".{0,8}") {
        for v in [Value::Int(n), Value::from(s.as_str())] {
            prop_assert!(Bound::Least < Bound::Value(v.clone()));
            prop_assert!(Bound::Value(v) < Bound::Greatest);
        }
    }
}
