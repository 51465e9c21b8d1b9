//! 核心错误处理模块

use thiserror::Error;

use crate::schema::SchemaError;

/// 核心错误类型
///
/// 约束类错误（非空、唯一、长度、标识列）由存储边界产生，
/// 无论底层是内存引擎还是 PostgreSQL，都映射到同一组变体。
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("null value in column \"{column}\" violates not-null constraint")]
    NotNullViolation { column: String },

    #[error("duplicate value in column \"{column}\" violates unique constraint")]
    UniqueViolation { column: String },

    #[error("value too long for column \"{column}\" (max {max} characters)")]
    ValueTooLong { column: String, max: usize },

    #[error("value out of range for integer column \"{column}\"")]
    OutOfRange { column: String },

    #[error("cannot write a value into identity column \"{column}\"")]
    IdentityNotWritable { column: String },

    #[error("column \"{column}\" is set on insert and cannot be updated")]
    ImmutableColumn { column: String },

    #[error("column \"{column}\" must not be earlier than \"{earlier}\"")]
    TimestampOrder { column: String, earlier: String },

    #[error("column \"{0}\" does not exist")]
    UnknownColumn(String),

    #[error("value of type {found} does not match column \"{column}\" of type {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("record {0} not found")]
    NotFound(i64),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[cfg(feature = "database")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CoreError {
    /// 是否为存储层约束冲突
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            CoreError::NotNullViolation { .. }
                | CoreError::UniqueViolation { .. }
                | CoreError::ValueTooLong { .. }
                | CoreError::OutOfRange { .. }
                | CoreError::IdentityNotWritable { .. }
                | CoreError::ImmutableColumn { .. }
                | CoreError::TimestampOrder { .. }
        )
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = err
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    error
                        .message
                        .as_ref()
                        .map(|msg| format!("{}: {}", field, msg))
                        .unwrap_or_else(|| format!("{}: invalid value", field))
                })
            })
            .collect();
        messages.sort();

        CoreError::Validation(messages.join(", "))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
