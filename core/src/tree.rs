//! Schema-less document tree.
//!
//! [`RawValue`] is what the text parser hands to the validators and the pack
//! reader. It carries no schema information: every shape check happens in
//! the validation layer.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered key/value properties of a compound value.
pub type PropertyMap = IndexMap<String, RawValue>;

const I64_MIN_F: f64 = i64::MIN as f64;
const I64_END_F: f64 = 9_223_372_036_854_775_808.0;

/// A parsed value: scalar, ordered list, or ordered compound.
///
/// # Examples
///
/// ```
/// use questpack_core::RawValue;
///
/// let value = RawValue::from(serde_json::json!({"id": 42, "title": "Intro"}));
/// assert_eq!(value.get("id").and_then(RawValue::as_id).as_deref(), Some("42"));
/// assert_eq!(value.get("title").unwrap().kind_name(), "string");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum RawValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<RawValue>),
    Compound(PropertyMap),
}

impl RawValue {
    /// Human-readable kind used in validation messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) | Self::Float(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Compound(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            // -2^63 is exact as f64; 2^63 is the first value past i64::MAX.
            Self::Float(f) if f.fract() == 0.0 && (I64_MIN_F..I64_END_F).contains(f) => {
                Some(*f as i64)
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[RawValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&PropertyMap> {
        match self {
            Self::Compound(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a property when this value is a compound.
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.as_compound().and_then(|map| map.get(key))
    }

    /// Normalizes an identifier value.
    ///
    /// Strings are returned as-is and whole numbers in their decimal form;
    /// every other kind yields `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use questpack_core::RawValue;
    ///
    /// assert_eq!(RawValue::Int(7).as_id().as_deref(), Some("7"));
    /// assert_eq!(RawValue::from("intro").as_id().as_deref(), Some("intro"));
    /// assert_eq!(RawValue::Bool(true).as_id(), None);
    /// ```
    pub fn as_id(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(_) => self.as_i64().map(|i| i.to_string()),
            _ => None,
        }
    }

    /// Renders any value as display text.
    ///
    /// Scalars use their natural form; lists and compounds fall back to JSON.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.clone(),
            Self::List(_) | Self::Compound(_) => serde_json::to_string(self).unwrap_or_default(),
        }
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map_or(Self::Null, Self::Float),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Compound(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
