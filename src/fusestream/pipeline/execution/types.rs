//! Core pipeline data types.
//!
//! This module contains the fundamental data types that flow through every
//! transformation slot:
//! - [`FieldValue`] - the dynamic record value type
//! - [`Pair`] - one key/value record as it appears on the wire

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;

/// One key/value record. Every phase consumes and produces sequences of
/// these; the key half is what external sort/shuffle clusters on.
pub type Pair = (FieldValue, FieldValue);

/// A value in a record field
///
/// This enum represents all data shapes the record codec can move across the
/// wire: scalars, timestamps, homogeneous arrays and structs with named
/// fields.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent value; not encodable on the wire
    Null,
    /// Boolean value (true/false)
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Timestamp type (YYYY-MM-DDTHH:MM:SS[.nnn])
    Timestamp(NaiveDateTime),
    /// Array of values - all elements must share one shape
    Array(Vec<FieldValue>),
    /// Structured data with named fields
    Struct(HashMap<String, FieldValue>),
}

impl FieldValue {
    /// Returns the type name for error messages and schema derivation
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "NULL",
            FieldValue::Boolean(_) => "BOOLEAN",
            FieldValue::Integer(_) => "INTEGER",
            FieldValue::Float(_) => "FLOAT",
            FieldValue::String(_) => "STRING",
            FieldValue::Timestamp(_) => "TIMESTAMP",
            FieldValue::Array(_) => "ARRAY",
            FieldValue::Struct(_) => "STRUCT",
        }
    }

    /// Convenience accessor for integer values
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Convenience accessor for numeric values widened to f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Convenience accessor for string values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Display implementation for FieldValue for clean string formatting
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "NULL"),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Timestamp(t) => write!(f, "{}", t),
            FieldValue::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            FieldValue::Struct(map) => {
                write!(f, "{{")?;
                // Sort for stable output; HashMap iteration order is not.
                let mut fields: Vec<_> = map.iter().collect();
                fields.sort_by(|a, b| a.0.cmp(b.0));
                for (i, (k, v)) in fields.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_nested_values() {
        let v = FieldValue::Array(vec![
            FieldValue::Integer(1),
            FieldValue::String("x".to_string()),
        ]);
        assert_eq!(v.to_string(), "[1, x]");
    }

    #[test]
    fn struct_display_is_sorted() {
        let mut fields = HashMap::new();
        fields.insert("b".to_string(), FieldValue::Integer(2));
        fields.insert("a".to_string(), FieldValue::Integer(1));
        assert_eq!(FieldValue::Struct(fields).to_string(), "{a: 1, b: 2}");
    }

    #[test]
    fn as_float_widens_integers() {
        assert_eq!(FieldValue::Integer(3).as_float(), Some(3.0));
        assert_eq!(FieldValue::Float(1.5).as_float(), Some(1.5));
        assert_eq!(FieldValue::String("x".into()).as_float(), None);
    }
}
