//! Runtime cell values and rows.
//!
//! Rows produced by a data source are maps from qualified column key
//! (`table.column`) to a typed [`Value`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::schema::SemanticType;

/// A row keyed by qualified column key.
pub type Row = BTreeMap<String, Value>;

/// A typed cell value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    String(String),
    Integer(i64),
    Decimal(f64),
    Date(NaiveDate),
    Boolean(bool),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert a JSON value to a cell of the given semantic type.
    ///
    /// Returns a description of the mismatch when the JSON value cannot
    /// represent the type.
    pub fn from_json(json: &serde_json::Value, ty: SemanticType) -> Result<Value, String> {
        use serde_json::Value as Json;

        if json.is_null() {
            return Ok(Value::Null);
        }

        match (ty, json) {
            (SemanticType::String, Json::String(s)) => Ok(Value::String(s.clone())),
            (SemanticType::String, Json::Number(n)) => Ok(Value::String(n.to_string())),
            (SemanticType::String, Json::Bool(b)) => Ok(Value::String(b.to_string())),
            (SemanticType::Integer, Json::Number(n)) => n
                .as_i64()
                .map(Value::Integer)
                .ok_or_else(|| format!("{} is not an integer", n)),
            (SemanticType::Integer, Json::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| format!("'{}' is not an integer", s)),
            (SemanticType::Decimal, Json::Number(n)) => n
                .as_f64()
                .map(Value::Decimal)
                .ok_or_else(|| format!("{} is not a decimal", n)),
            (SemanticType::Decimal, Json::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Value::Decimal)
                .map_err(|_| format!("'{}' is not a decimal", s)),
            (SemanticType::Date, Json::String(s)) => parse_date(s)
                .map(Value::Date)
                .ok_or_else(|| format!("'{}' is not a date", s)),
            (SemanticType::Boolean, Json::Bool(b)) => Ok(Value::Boolean(*b)),
            (SemanticType::Boolean, Json::String(s)) => parse_bool(s)
                .map(Value::Boolean)
                .ok_or_else(|| format!("'{}' is not a boolean", s)),
            (ty, other) => Err(format!("{} is not a {}", other, ty)),
        }
    }

    /// Compare two values of compatible types.
    ///
    /// Integers and decimals compare numerically with each other. Returns
    /// `None` for nulls and for incompatible types.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Decimal(a), Value::Decimal(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Decimal(b)) => (*a as f64).partial_cmp(b),
            (Value::Decimal(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Key used to match rows in an equi-join. Nulls never join.
    pub fn join_key(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Decimal(d) if d.fract() == 0.0 => Some(format!("{}", *d as i64)),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::String(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Decimal(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

/// Parse a calendar date.
///
/// Accepts `YYYY-MM-DD`, `MM/DD/YYYY`, and timestamps (RFC 3339 or
/// `YYYY-MM-DDTHH:MM:SS`), whose time-of-day is discarded.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%m/%d/%Y") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    None
}

pub(crate) fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
