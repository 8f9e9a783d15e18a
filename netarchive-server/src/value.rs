//! Metadata values and their stored string form
//!
//! Analysers produce native scalars; the store keeps every value as a
//! string. [`MetadataValue`]'s `Display` is the one place a scalar becomes a
//! stored string, and [`StoredValue`] is the one place a stored string is read
//! back as text or as a number. Queries compare through these two types only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar produced by an analyser or supplied in a query constraint
///
/// Booleans are stored capitalised (`True`, `False`), the form already found
/// in existing archives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl MetadataValue {
    /// Numeric reading of the value, if it has one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetadataValue::Integer(i) => Some(*i as f64),
            MetadataValue::Float(f) => Some(*f),
            MetadataValue::Text(s) => StoredValue::new(s).as_number(),
            MetadataValue::Boolean(_) => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Boolean(true) => f.write_str("True"),
            MetadataValue::Boolean(false) => f.write_str("False"),
            MetadataValue::Integer(i) => write!(f, "{}", i),
            // Whole floats keep a fractional digit so they still read as floats
            MetadataValue::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => {
                write!(f, "{:.1}", x)
            }
            MetadataValue::Float(x) => write!(f, "{}", x),
            MetadataValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Boolean(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        MetadataValue::Integer(value.into())
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        MetadataValue::Integer(value as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

/// Typed view of a value as it sits in the metadata table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredValue<'a>(&'a str);

impl<'a> StoredValue<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self(raw)
    }

    /// The exact stored string, for equality comparisons
    pub fn as_text(&self) -> &'a str {
        self.0
    }

    /// The stored string read as a floating-point number
    pub fn as_number(&self) -> Option<f64> {
        self.0.trim().parse::<f64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_forms() {
        assert_eq!(MetadataValue::from(500usize).to_string(), "500");
        assert_eq!(MetadataValue::from(10.0).to_string(), "10.0");
        assert_eq!(MetadataValue::from(9.976).to_string(), "9.976");
        assert_eq!(MetadataValue::from(true).to_string(), "True");
        assert_eq!(MetadataValue::from(false).to_string(), "False");
        assert_eq!(MetadataValue::from("ER").to_string(), "ER");
    }

    #[test]
    fn test_untagged_deserialization() {
        let values: Vec<MetadataValue> = serde_json::from_str(r#"[300, 2.5, 10.0, "abc", false]"#).unwrap();
        assert_eq!(
            values,
            vec![
                MetadataValue::Integer(300),
                MetadataValue::Float(2.5),
                MetadataValue::Float(10.0),
                MetadataValue::Text("abc".to_string()),
                MetadataValue::Boolean(false),
            ]
        );
    }

    #[test]
    fn test_stored_value_coercion() {
        assert_eq!(StoredValue::new("300").as_number(), Some(300.0));
        assert_eq!(StoredValue::new("9.5").as_number(), Some(9.5));
        assert_eq!(StoredValue::new("ER").as_number(), None);
        assert_eq!(StoredValue::new("").as_number(), None);
        assert_eq!(StoredValue::new("300").as_text(), "300");
    }

    #[test]
    fn test_numeric_reading_of_constraint_values() {
        assert_eq!(MetadataValue::from("250").as_number(), Some(250.0));
        assert_eq!(MetadataValue::from(true).as_number(), None);
        assert_eq!(MetadataValue::from(3i64).as_number(), Some(3.0));
    }
}
