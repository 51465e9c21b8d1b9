//! 表定义

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::column::Column;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("table \"{table}\" declares column \"{column}\" more than once")]
    DuplicateColumn { table: String, column: String },

    #[error("table \"{0}\" must declare exactly one primary key column, found {1}")]
    PrimaryKey(String, usize),

    #[error("table \"{0}\" declares no columns")]
    Empty(String),
}

/// 反序列化的原始形态，经 [`Table::new`] 校验后才成为 [`Table`]
#[derive(Deserialize)]
struct RawTable {
    name: String,
    columns: Vec<Column>,
}

impl TryFrom<RawTable> for Table {
    type Error = SchemaError;

    fn try_from(raw: RawTable) -> Result<Self, SchemaError> {
        Table::new(raw.name, raw.columns)
    }
}

/// 已校验的表声明：列名唯一，恰好一个主键
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    /// 主键列在 `columns` 中的下标
    #[serde(skip_serializing)]
    primary_key: usize,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self, SchemaError> {
        let name = name.into();
        if columns.is_empty() {
            return Err(SchemaError::Empty(name));
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(SchemaError::DuplicateColumn {
                    table: name,
                    column: column.name.clone(),
                });
            }
        }

        let primary_keys = columns.iter().filter(|c| c.primary_key).count();
        let primary_key = match columns.iter().position(|c| c.primary_key) {
            Some(index) if primary_keys == 1 => index,
            _ => return Err(SchemaError::PrimaryKey(name, primary_keys)),
        };

        Ok(Self {
            name,
            columns,
            primary_key,
        })
    }

    /// 用于静态声明，不做校验；调用方须传入非空且含主键的列表，
    /// `users` 的声明由测试覆盖
    pub(crate) fn declare(name: &str, columns: Vec<Column>) -> Self {
        let primary_key = columns.iter().position(|c| c.primary_key).unwrap_or(0);
        Self {
            name: name.to_string(),
            columns,
            primary_key,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> &Column {
        &self.columns[self.primary_key]
    }

    pub fn identity_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_identity())
    }
}
