//! 表结构声明
//!
//! 以链式构建器声明列与约束，再由 [`ddl`] 渲染为 PostgreSQL 建表语句，
//! 由 [`crate::storage`] 在写入边界执行约束检查。

pub mod column;
pub mod ddl;
pub mod table;
pub mod users;

pub use column::{
    created_at, integer, timestamp, updated_at, varchar, Column, ColumnDefault, ColumnType,
    Identity, OnUpdate,
};
pub use table::{SchemaError, Table};
pub use users::users_table;
