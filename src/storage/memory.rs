//! 内存存储引擎
//!
//! 按表声明在写入时执行约束：标识列、非空、类型、长度、唯一，
//! 并处理 `DEFAULT now()` 与更新钩子。任何失败都不会改变表内容。

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, SubsecRound, Utc};
use tracing::debug;

use super::value::{Row, Value};
use crate::core::error::{CoreError, Result};
use crate::schema::{Column, ColumnDefault, ColumnType, OnUpdate, Table};

pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// 当前 UTC 时间，截断到微秒（与 PostgreSQL timestamp 精度一致）
pub fn utc_now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}

/// 更新钩子使用的时间：至少比上一次值晚 1 微秒
pub fn advance(previous: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
    let floor = previous + Duration::microseconds(1);
    if now > floor {
        now
    } else {
        floor
    }
}

pub struct MemoryTable {
    table: Table,
    rows: BTreeMap<i64, Row>,
    next_identity: i64,
    clock: Clock,
}

impl MemoryTable {
    pub fn new(table: Table) -> Self {
        Self::with_clock(table, Arc::new(utc_now))
    }

    pub fn with_clock(table: Table, clock: Clock) -> Self {
        Self {
            table,
            rows: BTreeMap::new(),
            next_identity: 1,
            clock,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Row> {
        self.rows.get(&id)
    }

    pub fn delete(&mut self, id: i64) -> bool {
        self.rows.remove(&id).is_some()
    }

    pub fn insert(&mut self, values: Row) -> Result<Row> {
        self.check_known_columns(&values)?;

        let now = (self.clock)();
        let mut row = Row::new();
        for column in self.table.columns() {
            if column.is_identity() {
                if values.contains(&column.name) {
                    return Err(self.reject(CoreError::IdentityNotWritable {
                        column: column.name.clone(),
                    }));
                }
                continue;
            }

            // 显式 NULL 不会触发默认值
            let value = match values.get(&column.name) {
                Some(v) => v.clone(),
                None => match column.default {
                    Some(ColumnDefault::Now) => Value::Timestamp(now),
                    None => Value::Null,
                },
            };
            check_value(column, &value).map_err(|e| self.reject(e))?;
            row.set(&column.name, value);
        }

        self.check_timestamp_order(&row)?;
        self.check_unique(&row, None)?;

        // 标识列同样受列类型约束，超出范围时不写入
        let id = self.next_identity;
        let pk = self.table.primary_key();
        check_value(pk, &Value::Integer(id)).map_err(|e| self.reject(e))?;
        let pk = pk.name.clone();
        row.set(&pk, id);
        self.next_identity += 1;
        self.rows.insert(id, row.clone());

        debug!(table = self.table.name(), id, "inserted row");
        Ok(row)
    }

    pub fn update(&mut self, id: i64, changes: Row) -> Result<Row> {
        self.check_known_columns(&changes)?;

        let current = self.rows.get(&id).ok_or(CoreError::NotFound(id))?;
        let mut row = current.clone();
        let now = (self.clock)();

        for column in self.table.columns() {
            match changes.get(&column.name) {
                Some(_) if column.is_identity() => {
                    return Err(self.reject(CoreError::IdentityNotWritable {
                        column: column.name.clone(),
                    }));
                }
                Some(_) if column.is_immutable() => {
                    return Err(self.reject(CoreError::ImmutableColumn {
                        column: column.name.clone(),
                    }));
                }
                Some(value) => {
                    check_value(column, value).map_err(|e| self.reject(e))?;
                    row.set(&column.name, value.clone());
                }
                None => {
                    if let Some(OnUpdate::Now) = column.on_update {
                        let refreshed = match current.get(&column.name) {
                            Some(Value::Timestamp(previous)) => advance(*previous, now),
                            _ => now,
                        };
                        row.set(&column.name, refreshed);
                    }
                }
            }
        }

        self.check_timestamp_order(&row)?;
        self.check_unique(&row, Some(id))?;

        self.rows.insert(id, row.clone());
        debug!(table = self.table.name(), id, "updated row");
        Ok(row)
    }

    fn check_known_columns(&self, values: &Row) -> Result<()> {
        for (name, _) in values.iter() {
            if self.table.column(name).is_none() {
                return Err(CoreError::UnknownColumn(name.to_string()));
            }
        }
        Ok(())
    }

    /// 带更新钩子的时间列不得早于插入时间列
    fn check_timestamp_order(&self, row: &Row) -> Result<()> {
        let columns = self.table.columns();
        for later in columns.iter().filter(|c| c.on_update.is_some()) {
            for earlier in columns.iter().filter(|c| c.is_immutable()) {
                if let (Some(Value::Timestamp(l)), Some(Value::Timestamp(e))) =
                    (row.get(&later.name), row.get(&earlier.name))
                {
                    if l < e {
                        return Err(self.reject(CoreError::TimestampOrder {
                            column: later.name.clone(),
                            earlier: earlier.name.clone(),
                        }));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_unique(&self, row: &Row, skip_id: Option<i64>) -> Result<()> {
        for column in self.table.columns().iter().filter(|c| c.unique) {
            let value = match row.get(&column.name) {
                Some(v) if !v.is_null() => v,
                _ => continue,
            };
            let duplicate = self
                .rows
                .iter()
                .filter(|(id, _)| Some(**id) != skip_id)
                .any(|(_, existing)| existing.get(&column.name) == Some(value));
            if duplicate {
                return Err(self.reject(CoreError::UniqueViolation {
                    column: column.name.clone(),
                }));
            }
        }
        Ok(())
    }

    fn reject(&self, err: CoreError) -> CoreError {
        debug!(table = self.table.name(), error = %err, "write rejected");
        err
    }
}

fn check_value(column: &Column, value: &Value) -> Result<()> {
    let mismatch = || CoreError::TypeMismatch {
        column: column.name.clone(),
        expected: column.column_type.name(),
        found: value.type_name(),
    };

    match (&column.column_type, value) {
        (_, Value::Null) if column.not_null => Err(CoreError::NotNullViolation {
            column: column.name.clone(),
        }),
        (_, Value::Null) => Ok(()),
        (ColumnType::Integer, Value::Integer(v)) => {
            if i32::try_from(*v).is_err() {
                return Err(CoreError::OutOfRange {
                    column: column.name.clone(),
                });
            }
            Ok(())
        }
        (ColumnType::Varchar { length }, Value::Text(s)) => {
            if s.chars().count() > *length {
                return Err(CoreError::ValueTooLong {
                    column: column.name.clone(),
                    max: *length,
                });
            }
            Ok(())
        }
        (ColumnType::Timestamp, Value::Timestamp(_)) => Ok(()),
        _ => Err(mismatch()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::users::{self, users_table};
    use chrono::NaiveDate;
    use std::sync::Mutex;

    fn at(micros: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::microseconds(micros)
    }

    /// 返回固定时间的时钟，可在测试中手动设置
    fn fixed_clock(start: NaiveDateTime) -> (Clock, Arc<Mutex<NaiveDateTime>>) {
        let time = Arc::new(Mutex::new(start));
        let handle = Arc::clone(&time);
        let clock: Clock = Arc::new(move || *handle.lock().unwrap());
        (clock, time)
    }

    fn alice() -> Row {
        Row::new()
            .with(users::NAME, "Alice")
            .with(users::AGE, 30)
            .with(users::EMAIL, "alice@example.com")
    }

    fn table() -> MemoryTable {
        MemoryTable::new(users_table().clone())
    }

    #[test]
    fn insert_assigns_identity_and_timestamps() {
        let (clock, _) = fixed_clock(at(0));
        let mut t = MemoryTable::with_clock(users_table().clone(), clock);

        let row = t.insert(alice()).unwrap();
        assert_eq!(row.integer(users::ID).unwrap(), 1);
        assert_eq!(row.text(users::NAME).unwrap(), "Alice");
        assert_eq!(row.timestamp(users::CREATED_AT).unwrap(), at(0));
        assert_eq!(row.timestamp(users::UPDATED_AT).unwrap(), at(0));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn missing_email_is_not_null_violation() {
        let mut t = table();
        let err = t
            .insert(Row::new().with(users::NAME, "Alice").with(users::AGE, 30))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotNullViolation { ref column } if column == "email"));
        assert!(t.is_empty());
    }

    #[test]
    fn explicit_null_timestamp_is_rejected() {
        let mut t = table();
        let err = t
            .insert(alice().with(users::CREATED_AT, Value::Null))
            .unwrap_err();
        assert!(
            matches!(err, CoreError::NotNullViolation { ref column } if column == "created_at")
        );
    }

    #[test]
    fn duplicate_email_is_unique_violation() {
        let mut t = table();
        t.insert(alice()).unwrap();
        let err = t
            .insert(
                Row::new()
                    .with(users::NAME, "Alice Two")
                    .with(users::AGE, 31)
                    .with(users::EMAIL, "alice@example.com"),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::UniqueViolation { ref column } if column == "email"));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn identity_is_not_client_settable() {
        let mut t = table();
        let err = t.insert(alice().with(users::ID, 42)).unwrap_err();
        assert!(matches!(err, CoreError::IdentityNotWritable { .. }));

        let row = t.insert(alice()).unwrap();
        let id = row.integer(users::ID).unwrap();
        let err = t.update(id, Row::new().with(users::ID, 7)).unwrap_err();
        assert!(matches!(err, CoreError::IdentityNotWritable { .. }));
    }

    #[test]
    fn text_longer_than_255_chars_rejected() {
        let mut t = table();
        let long = "a".repeat(256);
        let err = t.insert(alice().with(users::NAME, long.as_str())).unwrap_err();
        assert!(matches!(err, CoreError::ValueTooLong { ref column, max: 255 } if column == "name"));

        let err = t
            .insert(alice().with(users::EMAIL, format!("{}@x.io", long)))
            .unwrap_err();
        assert!(matches!(err, CoreError::ValueTooLong { ref column, .. } if column == "email"));

        // 按字符计数，而非字节
        let multibyte = "名".repeat(255);
        assert!(t.insert(alice().with(users::NAME, multibyte.as_str())).is_ok());
    }

    #[test]
    fn type_and_range_checks() {
        let mut t = table();
        let err = t.insert(alice().with(users::AGE, "thirty")).unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { expected: "integer", found: "text", .. }));

        let err = t.insert(alice().with(users::AGE, i64::from(i32::MAX) + 1)).unwrap_err();
        assert!(matches!(err, CoreError::OutOfRange { .. }));

        let err = t.insert(alice().with("nickname", "al")).unwrap_err();
        assert!(matches!(err, CoreError::UnknownColumn(ref c) if c == "nickname"));
    }

    #[test]
    fn sequential_inserts_get_increasing_ids_never_reused() {
        let mut t = table();
        let first = t.insert(alice()).unwrap().integer(users::ID).unwrap();
        let second = t
            .insert(alice().with(users::EMAIL, "bob@example.com"))
            .unwrap()
            .integer(users::ID)
            .unwrap();
        assert!(second > first);

        assert!(t.delete(second));
        assert!(!t.delete(second));
        let third = t
            .insert(alice().with(users::EMAIL, "carol@example.com"))
            .unwrap()
            .integer(users::ID)
            .unwrap();
        assert!(third > second);
    }

    #[test]
    fn update_refreshes_updated_at_only() {
        let (clock, time) = fixed_clock(at(0));
        let mut t = MemoryTable::with_clock(users_table().clone(), clock);
        let row = t.insert(alice()).unwrap();
        let id = row.integer(users::ID).unwrap();

        *time.lock().unwrap() = at(5_000);
        let updated = t.update(id, Row::new().with(users::AGE, 31)).unwrap();
        assert_eq!(updated.integer(users::AGE).unwrap(), 31);
        assert_eq!(updated.timestamp(users::CREATED_AT).unwrap(), at(0));
        assert_eq!(updated.timestamp(users::UPDATED_AT).unwrap(), at(5_000));
    }

    #[test]
    fn updated_at_advances_even_when_clock_stalls() {
        let (clock, _) = fixed_clock(at(0));
        let mut t = MemoryTable::with_clock(users_table().clone(), clock);
        let id = t.insert(alice()).unwrap().integer(users::ID).unwrap();

        let first = t.update(id, Row::new().with(users::AGE, 31)).unwrap();
        let second = t.update(id, Row::new().with(users::AGE, 32)).unwrap();
        let u1 = first.timestamp(users::UPDATED_AT).unwrap();
        let u2 = second.timestamp(users::UPDATED_AT).unwrap();
        assert!(u1 > at(0));
        assert!(u2 > u1);
        assert_eq!(second.timestamp(users::CREATED_AT).unwrap(), at(0));
    }

    #[test]
    fn update_to_taken_email_fails_and_leaves_row() {
        let mut t = table();
        t.insert(alice()).unwrap();
        let bob = t
            .insert(alice().with(users::EMAIL, "bob@example.com"))
            .unwrap();
        let bob_id = bob.integer(users::ID).unwrap();

        let err = t
            .update(bob_id, Row::new().with(users::EMAIL, "alice@example.com"))
            .unwrap_err();
        assert!(matches!(err, CoreError::UniqueViolation { .. }));
        assert_eq!(t.get(bob_id), Some(&bob));

        // 自身的值不算重复
        assert!(t
            .update(bob_id, Row::new().with(users::EMAIL, "bob@example.com"))
            .is_ok());
    }

    #[test]
    fn update_missing_row() {
        let mut t = table();
        assert!(matches!(
            t.update(99, Row::new().with(users::AGE, 1)),
            Err(CoreError::NotFound(99))
        ));
    }

    #[test]
    fn created_at_cannot_be_rewritten() {
        let (clock, _) = fixed_clock(at(1_000));
        let mut t = MemoryTable::with_clock(users_table().clone(), clock);
        let row = t.insert(alice()).unwrap();
        let id = row.integer(users::ID).unwrap();

        let err = t
            .update(id, Row::new().with(users::CREATED_AT, at(0)))
            .unwrap_err();
        assert!(
            matches!(err, CoreError::ImmutableColumn { ref column } if column == "created_at")
        );
        assert_eq!(t.get(id), Some(&row));
    }

    #[test]
    fn updated_at_never_precedes_created_at() {
        let (clock, _) = fixed_clock(at(1_000));
        let mut t = MemoryTable::with_clock(users_table().clone(), clock);
        let row = t.insert(alice()).unwrap();
        let id = row.integer(users::ID).unwrap();

        let err = t
            .update(id, Row::new().with(users::UPDATED_AT, at(0)))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::TimestampOrder { ref column, ref earlier }
                if column == "updated_at" && earlier == "created_at"
        ));
        assert_eq!(t.get(id), Some(&row));

        let err = t
            .insert(
                alice()
                    .with(users::EMAIL, "bob@example.com")
                    .with(users::CREATED_AT, at(500))
                    .with(users::UPDATED_AT, at(100)),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::TimestampOrder { .. }));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn exhausted_identity_stores_nothing() {
        let mut t = table();
        t.next_identity = i64::from(i32::MAX) + 1;

        let err = t.insert(alice()).unwrap_err();
        assert!(matches!(err, CoreError::OutOfRange { ref column } if column == "id"));
        assert!(t.is_empty());
        assert_eq!(t.next_identity, i64::from(i32::MAX) + 1);
    }

    #[test]
    fn last_identity_value_is_usable() {
        let mut t = table();
        t.next_identity = i64::from(i32::MAX);
        let row = t.insert(alice()).unwrap();
        assert_eq!(row.integer(users::ID).unwrap(), i64::from(i32::MAX));
    }

    #[test]
    fn advance_is_strict() {
        assert_eq!(advance(at(10), at(10)), at(11));
        assert_eq!(advance(at(10), at(3)), at(11));
        assert_eq!(advance(at(10), at(20)), at(20));
    }
}
