//! 数据库基础设施

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info};

use super::config::DatabaseConfig;
use crate::core::error::Result;
use crate::schema::{ddl, Table};

pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database: {}", config.redacted_url());

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// 按表声明建表（已存在时不做任何事）
    pub async fn apply_schema(&self, table: &Table) -> Result<()> {
        let sql = ddl::create_table_sql(table);
        debug!("{}", sql);
        sqlx::query(&sql).execute(&self.pool).await?;
        info!("Table \"{}\" is in place", table.name());
        Ok(())
    }
}
