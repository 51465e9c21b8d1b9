//! # users-schema
//!
//! `users` 表的声明式定义：
//! - `schema`：列与约束的链式声明，及 PostgreSQL DDL 渲染
//! - `storage`：按声明执行约束的写入边界（内存引擎）
//! - `app::users`：类型化模型、存储抽象（内存 / PostgreSQL）与服务
//! - `infrastructure`：配置、日志、数据库连接

pub mod app;
pub mod core;
pub mod infrastructure;
pub mod schema;
pub mod storage;

pub use crate::core::error::{CoreError, Result};
pub use schema::users_table;
