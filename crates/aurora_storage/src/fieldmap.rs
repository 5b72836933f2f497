//! Positional mappings between two field orderings of the same relation.

use aurora_foundation::{Error, Result, Value};

/// For each field of `to`, the position of the same field name in `from`.
///
/// Remapping a tuple laid out in `from` order with the result yields a tuple
/// in `to` order. `to` may be a subset of `from`.
///
/// # Errors
/// Returns `FieldMismatch` if any name in `to` is absent from `from`.
pub fn make_fieldmap(from: &[String], to: &[String]) -> Result<Vec<usize>> {
    to.iter()
        .map(|field| {
            from.iter()
                .position(|f| f == field)
                .ok_or_else(|| Error::field_mismatch(from, to))
        })
        .collect()
}

/// Like [`make_fieldmap`], but `from` may contain unnamed positions.
///
/// Used for sinks, whose incoming tuples are solver rows where only some
/// columns are bound to table fields.
///
/// # Errors
/// Returns `FieldMismatch` if any name in `to` is absent from `from`.
pub fn make_sparse_fieldmap(from: &[Option<String>], to: &[String]) -> Result<Vec<usize>> {
    to.iter()
        .map(|field| {
            from.iter()
                .position(|f| f.as_deref() == Some(field.as_str()))
                .ok_or_else(|| {
                    let named: Vec<String> = from.iter().flatten().cloned().collect();
                    Error::field_mismatch(&named, to)
                })
        })
        .collect()
}

/// Applies a fieldmap to a tuple.
#[must_use]
pub fn remap(fieldmap: &[usize], tuple: &[Value]) -> Vec<Value> {
    fieldmap.iter().map(|&ix| tuple[ix].clone()).collect()
}
