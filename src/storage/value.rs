//! 存储层的值与行

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::core::error::{CoreError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// 列名到值的映射
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.values.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn required(&self, column: &str) -> Result<&Value> {
        match self.values.get(column) {
            None | Some(Value::Null) => Err(CoreError::NotNullViolation {
                column: column.to_string(),
            }),
            Some(v) => Ok(v),
        }
    }

    fn mismatch(column: &str, expected: &'static str, found: &Value) -> CoreError {
        CoreError::TypeMismatch {
            column: column.to_string(),
            expected,
            found: found.type_name(),
        }
    }

    pub fn integer(&self, column: &str) -> Result<i64> {
        match self.required(column)? {
            Value::Integer(v) => Ok(*v),
            other => Err(Self::mismatch(column, "integer", other)),
        }
    }

    pub fn text(&self, column: &str) -> Result<&str> {
        match self.required(column)? {
            Value::Text(v) => Ok(v),
            other => Err(Self::mismatch(column, "text", other)),
        }
    }

    pub fn timestamp(&self, column: &str) -> Result<NaiveDateTime> {
        match self.required(column)? {
            Value::Timestamp(v) => Ok(*v),
            other => Err(Self::mismatch(column, "timestamp", other)),
        }
    }
}
