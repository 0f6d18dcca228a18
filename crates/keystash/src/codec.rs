//! Value encoding between typed call sites and backend values.
//!
//! Writes serialize through `serde_json`: primitives stay primitives and
//! structures become JSON text. Reads decode the stored value's string form
//! as JSON, falling back to treating the text as a plain string so values
//! written as strings read back unchanged.

use keystash_storage::{StashError, StashResult, StashValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Encode a value for storage.
pub(crate) fn encode<V: Serialize + ?Sized>(value: &V) -> StashResult<StashValue> {
    match serde_json::to_value(value).map_err(|e| StashError::Encode(e.to_string()))? {
        Value::Null => Err(StashError::Encode(
            "null (or a non-finite number) cannot be stored; use delete instead".into(),
        )),
        Value::Bool(b) => Ok(StashValue::Bool(b)),
        Value::Number(n) => exact_f64(&n)
            .map(StashValue::Number)
            .ok_or_else(|| StashError::Encode(format!("{n} cannot be stored exactly"))),
        Value::String(s) => Ok(StashValue::String(s)),
        structured @ (Value::Array(_) | Value::Object(_)) => {
            Ok(StashValue::String(structured.to_string()))
        },
    }
}

/// `n` as an `f64`, or `None` when the conversion would round.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn exact_f64(n: &serde_json::Number) -> Option<f64> {
    if let Some(i) = n.as_i64() {
        let f = i as f64;
        return (f as i128 == i128::from(i)).then_some(f);
    }
    if let Some(u) = n.as_u64() {
        let f = u as f64;
        return (f as i128 == i128::from(u)).then_some(f);
    }
    n.as_f64()
}

/// Decode a raw value read from a backend.
///
/// An empty string decodes as `""` when `T` can hold a string and is
/// absent for every other target type.
pub(crate) fn decode<T: DeserializeOwned>(
    key: &str,
    raw: Option<StashValue>,
) -> StashResult<Option<T>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let text = raw.encode();
    if text.is_empty() {
        return Ok(serde_json::from_value::<T>(Value::String(text)).ok());
    }
    match serde_json::from_str::<T>(&text) {
        Ok(value) => Ok(Some(value)),
        Err(parse_err) => serde_json::from_value::<T>(Value::String(text))
            .map(Some)
            .map_err(|_| StashError::decode(key, parse_err)),
    }
}

/// Decode the call's default into the accessor's type. `null` is no default.
pub(crate) fn default_value<T: DeserializeOwned>(
    key: &str,
    default: Option<&Value>,
) -> StashResult<Option<T>> {
    match default {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| StashError::decode(key, format!("default: {e}"))),
    }
}
