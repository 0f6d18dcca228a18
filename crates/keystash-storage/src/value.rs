//! Stored value representation and the primitive encode/decode rules.
//!
//! String-only media store [`StashValue::encode`]; typed media may keep the
//! variant as-is. Decoding a typed accessor from either form goes through
//! [`decode_boolean`] / [`decode_number`] so every backend agrees on the
//! result.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StashError, StashResult};

/// A value as it crosses the backend boundary.
///
/// Structured values never appear here: the facade serializes them to JSON
/// text and hands them over as [`StashValue::String`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StashValue {
    /// A boolean, encoded as `"true"` / `"false"`.
    Bool(bool),
    /// A number, encoded in decimal.
    Number(f64),
    /// A string, stored as-is.
    String(String),
}

impl StashValue {
    /// The string form a string-only medium stores.
    ///
    /// Integral numbers render without a fraction (`1`, not `1.0`).
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.clone(),
        }
    }

    /// Name of the variant, for error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
        }
    }
}

impl fmt::Display for StashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            other => f.write_str(&other.encode()),
        }
    }
}

impl From<bool> for StashValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for StashValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for StashValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<String> for StashValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for StashValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// Decode a boolean from a raw value.
///
/// Strings must be exactly `"true"` or `"false"`.
///
/// # Errors
///
/// Returns [`StashError::Decode`] for a stored number or any other string.
pub fn decode_boolean(key: &str, value: &StashValue) -> StashResult<bool> {
    match value {
        StashValue::Bool(b) => Ok(*b),
        StashValue::String(s) => match s.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(StashError::decode(key, format!("'{s}' is not a boolean"))),
        },
        StashValue::Number(_) => Err(StashError::decode(key, "expected boolean, found number")),
    }
}

/// Decode a number from a raw value.
///
/// # Errors
///
/// Returns [`StashError::Decode`] for a stored boolean or a string that is
/// not a decimal number.
pub fn decode_number(key: &str, value: &StashValue) -> StashResult<f64> {
    match value {
        StashValue::Number(n) => Ok(*n),
        StashValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| StashError::decode(key, format!("'{s}' is not a number: {e}"))),
        StashValue::Bool(_) => Err(StashError::decode(key, "expected number, found boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_primitives() {
        assert_eq!(StashValue::Bool(true).encode(), "true");
        assert_eq!(StashValue::Bool(false).encode(), "false");
        assert_eq!(StashValue::Number(1.0).encode(), "1");
        assert_eq!(StashValue::Number(-2.5).encode(), "-2.5");
        assert_eq!(StashValue::from("plain").encode(), "plain");
    }

    #[test]
    fn test_decode_boolean_from_string_medium() {
        assert!(decode_boolean("k", &StashValue::from("true")).unwrap());
        assert!(!decode_boolean("k", &StashValue::from("false")).unwrap());
        assert!(decode_boolean("k", &StashValue::Number(1.0)).is_err());
    }

    #[test]
    fn test_decode_boolean_rejects_other_strings() {
        for raw in ["", "1", "hello", "TRUE"] {
            let err = decode_boolean("k", &StashValue::from(raw)).unwrap_err();
            assert!(matches!(err, StashError::Decode { ref key, .. } if key == "k"), "{raw}");
        }
    }

    #[test]
    fn test_decode_number() {
        assert_eq!(decode_number("k", &StashValue::from("42")).unwrap(), 42.0);
        assert_eq!(decode_number("k", &StashValue::Number(0.0)).unwrap(), 0.0);
        let err = decode_number("k", &StashValue::from("forty")).unwrap_err();
        assert!(matches!(err, StashError::Decode { ref key, .. } if key == "k"));
    }

    #[test]
    fn test_untagged_serde_keeps_json_types() {
        let values: Vec<StashValue> = serde_json::from_str(r#"[true, 3.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                StashValue::Bool(true),
                StashValue::Number(3.5),
                StashValue::from("x")
            ]
        );
    }
}
