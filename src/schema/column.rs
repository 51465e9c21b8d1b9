//! 列定义与链式构建器

use serde::{Deserialize, Serialize};

/// 列类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Varchar { length: usize },
    Timestamp,
}

impl ColumnType {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Varchar { .. } => "varchar",
            ColumnType::Timestamp => "timestamp",
        }
    }

    /// 字符串列的最大字符数
    pub fn max_length(&self) -> Option<usize> {
        match self {
            ColumnType::Varchar { length } => Some(*length),
            _ => None,
        }
    }
}

/// 标识列生成方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identity {
    /// GENERATED ALWAYS AS IDENTITY，写入方不能提供值
    Always,
}

/// 插入时的默认值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnDefault {
    Now,
}

/// 更新钩子：每次更新时重新赋值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnUpdate {
    Now,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub not_null: bool,
    pub primary_key: bool,
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ColumnDefault>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<OnUpdate>,
}

impl Column {
    fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            not_null: false,
            primary_key: false,
            unique: false,
            identity: None,
            default: None,
            on_update: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// 主键隐含 NOT NULL
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn generated_always_as_identity(mut self) -> Self {
        self.identity = Some(Identity::Always);
        self
    }

    pub fn default_now(mut self) -> Self {
        self.default = Some(ColumnDefault::Now);
        self
    }

    pub fn on_update_now(mut self) -> Self {
        self.on_update = Some(OnUpdate::Now);
        self
    }

    /// 插入时必须由写入方提供值
    pub fn is_required_on_insert(&self) -> bool {
        self.not_null && self.default.is_none() && self.identity.is_none()
    }

    /// 插入时取当前时间、之后不再改变的列
    pub fn is_immutable(&self) -> bool {
        self.default == Some(ColumnDefault::Now) && self.on_update.is_none()
    }

    pub fn is_identity(&self) -> bool {
        self.identity.is_some()
    }
}

pub fn integer(name: impl Into<String>) -> Column {
    Column::new(name, ColumnType::Integer)
}

pub fn varchar(name: impl Into<String>, length: usize) -> Column {
    Column::new(name, ColumnType::Varchar { length })
}

pub fn timestamp(name: impl Into<String>) -> Column {
    Column::new(name, ColumnType::Timestamp)
}

/// 插入时间列：非空，默认当前时间
pub fn created_at() -> Column {
    timestamp("created_at").not_null().default_now()
}

/// 更新时间列：非空，默认当前时间，每次更新时刷新
pub fn updated_at() -> Column {
    timestamp("updated_at")
        .not_null()
        .default_now()
        .on_update_now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_key_implies_not_null() {
        let col = integer("id").primary_key();
        assert!(col.not_null);
        assert!(col.primary_key);
    }

    #[test]
    fn required_on_insert() {
        assert!(varchar("name", 255).not_null().is_required_on_insert());
        assert!(!varchar("nick", 255).is_required_on_insert());
        assert!(!created_at().is_required_on_insert());
        assert!(!integer("id")
            .primary_key()
            .generated_always_as_identity()
            .is_required_on_insert());
    }

    #[test]
    fn timestamp_helpers() {
        let updated = updated_at();
        assert_eq!(updated.default, Some(ColumnDefault::Now));
        assert_eq!(updated.on_update, Some(OnUpdate::Now));
        assert_eq!(created_at().on_update, None);
        assert!(created_at().is_immutable());
        assert!(!updated.is_immutable());
        assert!(!varchar("name", 255).not_null().is_immutable());
    }
}
