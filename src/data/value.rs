//! Typed field values
//!
//! Every extracted field starts life as a string. A job may declare a type per
//! field; the declared [`FieldType`] converts the raw string into a
//! [`FieldValue`] variant.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

static INTEGER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d[\d,_]*").expect("integer token pattern is valid"));

static FLOAT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\d[\d,_]*(?:\.\d+)?|-?\.\d+").expect("float token pattern is valid")
});

/// A raw value could not be converted to the declared type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert '{raw}' to {kind}")]
pub struct ConversionError {
    pub raw: String,
    pub kind: &'static str,
}

/// Declared type of an extracted field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum FieldType {
    #[default]
    #[serde(rename = "string")]
    String,
    #[serde(rename = "integer")]
    Integer,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "list[string]")]
    StringList,
    #[serde(rename = "any")]
    Any,
}

impl FieldType {
    /// The configuration name of this type
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::StringList => "list[string]",
            Self::Any => "any",
        }
    }

    /// True when the field collects every matching element instead of the first
    pub fn collects_all(&self) -> bool {
        matches!(self, Self::StringList)
    }

    /// Converts one trimmed raw string into a value of this type
    ///
    /// Empty input converts to [`FieldValue::Null`] for the numeric types.
    ///
    /// ```
    /// use web_extractor::data::{FieldType, FieldValue};
    ///
    /// assert_eq!(FieldType::Float.convert("$1,234.50").unwrap(), FieldValue::Float(1234.5));
    /// assert_eq!(FieldType::Integer.convert("1,024 reviews").unwrap(), FieldValue::Integer(1024));
    /// assert!(FieldType::Integer.convert("n/a").is_err());
    /// ```
    pub fn convert(&self, raw: &str) -> Result<FieldValue, ConversionError> {
        match self {
            Self::String | Self::Any => Ok(FieldValue::Text(raw.to_string())),
            Self::StringList => Ok(FieldValue::List(vec![raw.to_string()])),
            Self::Integer => {
                if raw.is_empty() {
                    return Ok(FieldValue::Null);
                }
                INTEGER_TOKEN
                    .find(raw)
                    .and_then(|m| strip_separators(m.as_str()).parse::<i64>().ok())
                    .map(FieldValue::Integer)
                    .ok_or_else(|| self.conversion_error(raw))
            }
            Self::Float => {
                if raw.is_empty() {
                    return Ok(FieldValue::Null);
                }
                FLOAT_TOKEN
                    .find(raw)
                    .and_then(|m| strip_separators(m.as_str()).parse::<f64>().ok())
                    .map(FieldValue::Float)
                    .ok_or_else(|| self.conversion_error(raw))
            }
        }
    }

    fn conversion_error(&self, raw: &str) -> ConversionError {
        ConversionError {
            raw: raw.to_string(),
            kind: self.name(),
        }
    }
}

fn strip_separators(token: &str) -> String {
    token.chars().filter(|c| *c != ',' && *c != '_').collect()
}

/// A single extracted value
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    List(Vec<String>),
}

impl FieldValue {
    pub fn text(value: &str) -> Self {
        Self::Text(value.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True for null, empty text and empty lists
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Integer(_) | Self::Float(_) => false,
        }
    }

    /// Renders the value as a single spreadsheet cell; null is empty
    pub fn to_cell(&self) -> String {
        match self {
            Self::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Representation used when comparing values for deduplication
    ///
    /// The variant is part of the key, so `Text("1")` and `Integer(1)`
    /// never collide.
    pub fn key_repr(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Text(s) => Some(format!("text:{}", s)),
            Self::Integer(n) => Some(format!("int:{}", n)),
            Self::Float(n) => Some(format!("float:{}", n)),
            Self::List(items) => Some(format!("list:{}", items.join("\u{1f}"))),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Text(s) => write!(f, "{}", s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::List(items) => write!(f, "{}", items.join("; ")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map(Self::Text).unwrap_or(Self::Null)
    }
}
