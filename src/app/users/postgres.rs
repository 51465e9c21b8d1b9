//! PostgreSQL 用户存储

use async_trait::async_trait;
use sqlx::{postgres::PgDatabaseError, PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::model::{NewUser, User, UserChanges};
use super::store::UserStore;
use crate::core::error::{CoreError, Result};
use crate::schema::{ddl::quote_identifier, users, users_table, OnUpdate, Table};

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn table(&self) -> &'static Table {
        users_table()
    }

    fn returning(&self) -> String {
        let columns: Vec<String> = self
            .table()
            .columns()
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect();
        format!(" RETURNING {}", columns.join(", "))
    }
}

/// 将 PostgreSQL 约束错误映射为 [`CoreError`]
///
/// `written` 为本次写入的文本值，用于定位 `22001` 中未给出列名的情况。
pub fn map_database_error(err: sqlx::Error, table: &Table, written: &[(&str, &str)]) -> CoreError {
    let db_err = match &err {
        sqlx::Error::Database(db_err) => db_err,
        _ => return CoreError::Database(err),
    };

    let pg = db_err.try_downcast_ref::<PgDatabaseError>();
    let column = pg.and_then(|e| e.column()).map(str::to_string);
    let constraint = db_err.constraint().map(str::to_string);
    let code = db_err.code().map(|c| c.into_owned());

    // 约束名形如 users_email_key
    let column_from_constraint = || {
        constraint.as_deref().and_then(|name| {
            table
                .columns()
                .iter()
                .find(|c| name.contains(&format!("_{}_", c.name)))
                .map(|c| c.name.clone())
        })
    };

    let mapped = match code.as_deref() {
        Some("23502") => CoreError::NotNullViolation {
            column: column.unwrap_or_default(),
        },
        Some("23505") => CoreError::UniqueViolation {
            column: column_from_constraint().unwrap_or_default(),
        },
        Some("22001") => {
            let overlong = written.iter().find_map(|(name, value)| {
                let max = table.column(name)?.column_type.max_length()?;
                (value.chars().count() > max).then(|| (name.to_string(), max))
            });
            let (column, max) = overlong.unwrap_or_default();
            CoreError::ValueTooLong { column, max }
        }
        Some("22003") => CoreError::OutOfRange {
            column: column.unwrap_or_default(),
        },
        Some("428C9") => CoreError::IdentityNotWritable {
            column: table
                .identity_column()
                .map(|c| c.name.clone())
                .unwrap_or_default(),
        },
        _ => return CoreError::Database(err),
    };

    debug!(table = table.name(), error = %mapped, "write rejected by database");
    mapped
}

/// `SET` 子句中更新钩子的表达式
pub fn on_update_sql(quoted_column: &str) -> String {
    format!(
        "{0} = GREATEST(LOCALTIMESTAMP, {0} + interval '1 microsecond')",
        quoted_column
    )
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, new_user: &NewUser) -> Result<User> {
        let table = self.table();
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {} ({}, {}, {}) VALUES (",
            quote_identifier(table.name()),
            quote_identifier(users::NAME),
            quote_identifier(users::AGE),
            quote_identifier(users::EMAIL),
        ));
        query
            .separated(", ")
            .push_bind(new_user.name.clone())
            .push_bind(new_user.age)
            .push_bind(new_user.email.clone());
        query.push(")");
        query.push(self.returning());

        let user = query
            .build_query_as::<User>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                map_database_error(
                    e,
                    table,
                    &[
                        (users::NAME, new_user.name.as_str()),
                        (users::EMAIL, new_user.email.as_str()),
                    ],
                )
            })?;

        debug!(id = user.id, "inserted user");
        Ok(user)
    }

    async fn update(&self, id: i32, changes: &UserChanges) -> Result<User> {
        let table = self.table();
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "UPDATE {} SET ",
            quote_identifier(table.name())
        ));
        {
            let mut sets = query.separated(", ");
            if let Some(name) = &changes.name {
                sets.push(format!("{} = ", quote_identifier(users::NAME)));
                sets.push_bind_unseparated(name.clone());
            }
            if let Some(age) = changes.age {
                sets.push(format!("{} = ", quote_identifier(users::AGE)));
                sets.push_bind_unseparated(age);
            }
            if let Some(email) = &changes.email {
                sets.push(format!("{} = ", quote_identifier(users::EMAIL)));
                sets.push_bind_unseparated(email.clone());
            }

            // 更新钩子：取服务端时间，与 DEFAULT now() 同一会话时区；
            // 至少比原值晚 1 微秒
            for column in table.columns() {
                if let Some(OnUpdate::Now) = column.on_update {
                    let name = quote_identifier(&column.name);
                    sets.push(on_update_sql(&name));
                }
            }
        }
        query.push(format!(
            " WHERE {} = ",
            quote_identifier(&table.primary_key().name)
        ));
        query.push_bind(id);
        query.push(self.returning());

        let mut written = Vec::new();
        if let Some(name) = &changes.name {
            written.push((users::NAME, name.as_str()));
        }
        if let Some(email) = &changes.email {
            written.push((users::EMAIL, email.as_str()));
        }

        let user = query
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_database_error(e, table, &written))?
            .ok_or(CoreError::NotFound(id.into()))?;

        debug!(id = user.id, "updated user");
        Ok(user)
    }

    async fn get(&self, id: i32) -> Result<Option<User>> {
        let table = self.table();
        let columns: Vec<String> = table
            .columns()
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect();
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1",
            columns.join(", "),
            quote_identifier(table.name()),
            quote_identifier(&table.primary_key().name)
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        let table = self.table();
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1",
            quote_identifier(table.name()),
            quote_identifier(&table.primary_key().name)
        );

        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
