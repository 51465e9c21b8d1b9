//! 用户数据模型

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::error::{CoreError, Result};
use crate::schema::users::{AGE, CREATED_AT, EMAIL, ID, NAME, UPDATED_AT};
use crate::storage::Row;

/// `users` 表中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct User {
    pub id: i32,
    pub name: String,
    pub age: i32,
    pub email: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<&Row> for User {
    type Error = CoreError;

    fn try_from(row: &Row) -> Result<Self> {
        let int = |column: &str| -> Result<i32> {
            i32::try_from(row.integer(column)?).map_err(|_| CoreError::OutOfRange {
                column: column.to_string(),
            })
        };

        Ok(Self {
            id: int(ID)?,
            name: row.text(NAME)?.to_string(),
            age: int(AGE)?,
            email: row.text(EMAIL)?.to_string(),
            created_at: row.timestamp(CREATED_AT)?,
            updated_at: row.timestamp(UPDATED_AT)?,
        })
    }
}

/// 创建用户请求；id 与时间戳由存储层生成
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub name: String,

    pub age: i32,

    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub email: String,
}

impl NewUser {
    pub fn new(name: impl Into<String>, age: i32, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age,
            email: email.into(),
        }
    }

    pub fn to_row(&self) -> Row {
        Row::new()
            .with(NAME, self.name.as_str())
            .with(AGE, self.age)
            .with(EMAIL, self.email.as_str())
    }
}

/// 更新用户请求；不包含 id 与 created_at
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserChanges {
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub name: Option<String>,

    pub age: Option<i32>,

    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub email: Option<String>,
}

impl UserChanges {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn age(mut self, age: i32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn to_row(&self) -> Row {
        let mut row = Row::new();
        if let Some(name) = &self.name {
            row.set(NAME, name.as_str());
        }
        if let Some(age) = self.age {
            row.set(AGE, age);
        }
        if let Some(email) = &self.email {
            row.set(EMAIL, email.as_str());
        }
        row
    }
}
