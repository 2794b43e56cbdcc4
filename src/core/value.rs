//! Value types exchanged with the execution engine
//!
//! Rows travel between entities and the engine as maps of `Value`, so an
//! entity only ever converts to and from one neutral representation no
//! matter which engine backs the store.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single bound or stored value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit floating point
    Float(f32),
    /// 64-bit floating point
    Double(f64),
    /// String value
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Timestamp (Unix timestamp in microseconds)
    Timestamp(i64),
}

impl Value {
    /// Get the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            Value::Long(v) => Some(*v != 0),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Get the value as an i32
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Long(v) => i32::try_from(*v).ok(),
            Value::Float(v) => Some(*v as i32),
            Value::Double(v) => Some(*v as i32),
            Value::String(s) => s.parse().ok(),
            Value::Bool(v) => Some(*v as i32),
            _ => None,
        }
    }

    /// Get the value as an i64
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            Value::Int(v) => Some(*v as i64),
            Value::Float(v) => Some(*v as i64),
            Value::Double(v) => Some(*v as i64),
            Value::String(s) => s.parse().ok(),
            Value::Bool(v) => Some(*v as i64),
            Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as an f32
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Double(v) => Some(*v as f32),
            Value::Int(v) => Some(*v as f32),
            Value::Long(v) => Some(*v as f32),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Get the value as an f64
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Float(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            Value::Long(v) => Some(*v as f64),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Get the value as a string reference without conversion
    ///
    /// Only `String` values yield a reference; everything else returns
    /// `None`. Use [`Value::as_string`] for converting display.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get the value as a string (with conversion)
    pub fn as_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::String(s) => s.clone(),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
            Value::Timestamp(v) => match Utc.timestamp_micros(*v).single() {
                Some(dt) => dt.to_rfc3339(),
                None => v.to_string(),
            },
        }
    }

    /// Get the value as bytes (zero-copy)
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Get the value as a UTC timestamp
    ///
    /// `Timestamp` values convert from their microsecond representation;
    /// `String` values are accepted when they parse as RFC 3339.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(v) => Utc.timestamp_micros(*v).single(),
            Value::Long(v) => Utc.timestamp_micros(*v).single(),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v.timestamp_micros())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// A row exchanged with the engine (field name -> value mapping)
pub type Row = HashMap<String, Value>;

/// Multiple rows returned from a query
pub type Rows = Vec<Row>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_conversions() {
        let val = Value::Int(42);
        assert_eq!(val.as_int(), Some(42));
        assert_eq!(val.as_long(), Some(42));
        assert_eq!(val.as_string(), "42");

        let val = Value::String("123".to_string());
        assert_eq!(val.as_int(), Some(123));
        assert_eq!(val.as_long(), Some(123));

        let val = Value::Long(i64::from(i32::MAX) + 1);
        assert_eq!(val.as_int(), None);
    }

    #[test]
    fn test_bool_conversions() {
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Bool(true).as_int(), Some(1));
        assert_eq!(Value::String("yes".to_string()).as_bool(), Some(true));
        assert_eq!(Value::String("0".to_string()).as_bool(), Some(false));
        assert_eq!(Value::String("maybe".to_string()).as_bool(), None);
    }

    #[test]
    fn test_from_impls() {
        let val: Value = 42.into();
        assert_eq!(val, Value::Int(42));

        let val: Value = "hello".into();
        assert_eq!(val, Value::String("hello".to_string()));

        let val: Value = Some(7i64).into();
        assert_eq!(val, Value::Long(7));

        let val: Value = Option::<i32>::None.into();
        assert_eq!(val, Value::Null);
        assert!(val.is_null());
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let dt = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).single().unwrap();
        let val = Value::from(dt);
        assert_eq!(val.type_name(), "timestamp");
        assert_eq!(val.as_timestamp(), Some(dt));
        assert_eq!(val.as_long(), Some(dt.timestamp_micros()));
    }

    #[test]
    fn test_timestamp_from_rfc3339_string() {
        let val = Value::String("2024-06-01T12:30:00+00:00".to_string());
        let dt = val.as_timestamp().unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).single().unwrap());

        assert_eq!(Value::String("not a date".to_string()).as_timestamp(), None);
    }

    #[test]
    fn test_row_alias() {
        let mut row = Row::new();
        row.insert("name".to_string(), Value::from("Alice"));
        row.insert("age".to_string(), Value::from(30));

        assert_eq!(row.get("name").and_then(Value::as_str), Some("Alice"));
        assert_eq!(row.get("age").and_then(Value::as_int), Some(30));
        assert!(row.get("missing").is_none());
    }
}
