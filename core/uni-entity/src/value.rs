//! Structural equality and field diffs over JSON values.
//!
//! Objects compare key-by-key regardless of key order, and numbers compare
//! by value, so `1` and `1.0` are equal. Records are compared in their
//! serialized form, which makes any `Serialize` type comparable.

use crate::error::{EntityError, EntityResult};
use serde_json::{Map, Number, Value};

/// Deep value equality.
pub fn structural_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| structural_eq(value, other)))
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| structural_eq(l, r))
        }
        (Value::Number(x), Value::Number(y)) => numbers_eq(x, y),
        _ => a == b,
    }
}

fn numbers_eq(x: &Number, y: &Number) -> bool {
    if let (Some(l), Some(r)) = (x.as_i64(), y.as_i64()) {
        return l == r;
    }
    if let (Some(l), Some(r)) = (x.as_u64(), y.as_u64()) {
        return l == r;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => false,
    }
}

/// Fields of `buffer` that differ from `canonical`.
///
/// A field is included when `canonical` lacks it or holds a structurally
/// different value. Fields only present in `canonical` are not reported:
/// the update endpoint has partial-update semantics and cannot express
/// removal.
pub fn diff_fields(buffer: &Value, canonical: &Value) -> EntityResult<Map<String, Value>> {
    let buffer = buffer.as_object().ok_or(EntityError::NotAnObject)?;
    let canonical = canonical.as_object().ok_or(EntityError::NotAnObject)?;

    Ok(buffer
        .iter()
        .filter(|(key, value)| {
            !canonical
                .get(key.as_str())
                .is_some_and(|other| structural_eq(value, other))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect())
}

/// The `updated` stamp of a record, `null` when absent.
pub(crate) fn updated_stamp(record: &Value) -> &Value {
    record.get("updated").unwrap_or(&Value::Null)
}
