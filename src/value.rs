//! Typed option values and the flat option map.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single typed option value.
///
/// This enum stores every scalar type a search space may enumerate. Signed
/// and unsigned integers are kept apart so the best-candidate report can
/// preserve the distinction the caller put into the grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A boolean flag.
    Bool(bool),
    /// An unsigned integer value. Declared before [`ParamValue::Int`] so
    /// untagged deserialization keeps non-negative integers unsigned.
    UInt(u64),
    /// A signed integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// A string value.
    Str(String),
}

impl ParamValue {
    /// Converts a JSON scalar into a typed value.
    ///
    /// Non-negative integers become [`ParamValue::UInt`], negative ones
    /// [`ParamValue::Int`], other numbers [`ParamValue::Float`]. Arrays,
    /// objects and `null` are not valid option values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for non-scalar JSON.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Ok(Self::UInt(u))
                } else if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else {
                    // f64 is the only remaining representation serde_json uses.
                    Ok(Self::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            serde_json::Value::String(s) => Ok(Self::Str(s.clone())),
            other => Err(Error::config(format!(
                "option value should be bool, int, uint, double or string, got: {other}"
            ))),
        }
    }

    /// Returns the string payload, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// The flat option map handed to the options parser.
///
/// Keys iterate in lexicographic order, which makes every per-candidate
/// option assignment and report deterministic.
pub type PlainOptions = BTreeMap<String, ParamValue>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(
            ParamValue::from_json(&json!(true)).unwrap(),
            ParamValue::Bool(true)
        );
        assert_eq!(
            ParamValue::from_json(&json!(32)).unwrap(),
            ParamValue::UInt(32)
        );
        assert_eq!(
            ParamValue::from_json(&json!(-7)).unwrap(),
            ParamValue::Int(-7)
        );
        assert_eq!(
            ParamValue::from_json(&json!(0.03)).unwrap(),
            ParamValue::Float(0.03)
        );
        assert_eq!(
            ParamValue::from_json(&json!("Median")).unwrap(),
            ParamValue::Str("Median".into())
        );
    }

    #[test]
    fn test_from_json_rejects_compound_values() {
        assert!(matches!(
            ParamValue::from_json(&json!([1, 2])),
            Err(crate::Error::Config(_))
        ));
        assert!(matches!(
            ParamValue::from_json(&json!({"a": 1})),
            Err(crate::Error::Config(_))
        ));
        assert!(matches!(
            ParamValue::from_json(&serde_json::Value::Null),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_display_matches_payload() {
        assert_eq!(ParamValue::UInt(64).to_string(), "64");
        assert_eq!(ParamValue::Str("Min".into()).to_string(), "Min");
    }

    #[test]
    fn test_serde_untagged_round_trip() {
        let values = vec![
            ParamValue::Bool(false),
            ParamValue::UInt(128),
            ParamValue::Float(0.1),
            ParamValue::Str("GreedyLogSum".into()),
        ];
        let text = serde_json::to_string(&values).unwrap();
        let back: Vec<ParamValue> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, values);
    }
}
