//! 用户表声明

use std::sync::OnceLock;

use super::column::{created_at, integer, updated_at, varchar, Column};
use super::table::Table;

pub const TABLE_NAME: &str = "users";

pub const ID: &str = "id";
pub const NAME: &str = "name";
pub const AGE: &str = "age";
pub const EMAIL: &str = "email";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// 名称与邮箱的最大字符数
pub const MAX_TEXT_LENGTH: usize = 255;

static USERS: OnceLock<Table> = OnceLock::new();

fn users_columns() -> Vec<Column> {
    vec![
        integer(ID).primary_key().generated_always_as_identity(),
        varchar(NAME, MAX_TEXT_LENGTH).not_null(),
        integer(AGE).not_null(),
        varchar(EMAIL, MAX_TEXT_LENGTH).not_null().unique(),
        created_at(),
        updated_at(),
    ]
}

/// 用户信息表
pub fn users_table() -> &'static Table {
    USERS.get_or_init(|| Table::declare(TABLE_NAME, users_columns()))
}
