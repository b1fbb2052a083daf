//! Input records evaluated by rules

use crate::error::{Result, RuleEngineError};
use ahash::RandomState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Concrete type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Build a value from a dynamically typed host object
    ///
    /// Conversions are tried in integer, float, string order and the first
    /// that succeeds wins, so a host boolean that converts to an integer is an
    /// integer.
    pub fn from_conversions<I, F, S>(
        field: &str,
        as_int: I,
        as_float: F,
        as_str: S,
    ) -> Result<Self>
    where
        I: FnOnce() -> Option<i64>,
        F: FnOnce() -> Option<f64>,
        S: FnOnce() -> Option<String>,
    {
        if let Some(i) = as_int() {
            return Ok(Value::Integer(i));
        }
        if let Some(f) = as_float() {
            return Ok(Value::Float(f));
        }
        if let Some(s) = as_str() {
            return Ok(Value::String(s));
        }
        Err(RuleEngineError::InvalidRecord(format!(
            "unsupported value type for field '{}'",
            field
        )))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// Field name to value mapping, read-only during evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: HashMap<String, Value, RandomState>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse a record from a JSON object, e.g. `{"age": 35, "department": "Sales"}`
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}
