//! 用户存储抽象与内存实现

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::model::{NewUser, User, UserChanges};
use crate::core::error::Result;
use crate::schema::users_table;
use crate::storage::{Clock, MemoryTable};

/// 用户表的写入路径
///
/// 实现不做请求校验，只在存储边界执行表声明中的约束。
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, new_user: &NewUser) -> Result<User>;

    /// 更新提供的字段，并触发 `updated_at` 更新钩子
    async fn update(&self, id: i32, changes: &UserChanges) -> Result<User>;

    async fn get(&self, id: i32) -> Result<Option<User>>;

    async fn delete(&self, id: i32) -> Result<bool>;
}

pub struct MemoryUserStore {
    table: Mutex<MemoryTable>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(MemoryTable::new(users_table().clone())),
        }
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            table: Mutex::new(MemoryTable::with_clock(users_table().clone(), clock)),
        }
    }

    pub async fn len(&self) -> usize {
        self.table.lock().await.len()
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, new_user: &NewUser) -> Result<User> {
        let row = self.table.lock().await.insert(new_user.to_row())?;
        User::try_from(&row)
    }

    async fn update(&self, id: i32, changes: &UserChanges) -> Result<User> {
        let row = self
            .table
            .lock()
            .await
            .update(id.into(), changes.to_row())?;
        User::try_from(&row)
    }

    async fn get(&self, id: i32) -> Result<Option<User>> {
        let table = self.table.lock().await;
        table.get(id.into()).map(User::try_from).transpose()
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        Ok(self.table.lock().await.delete(id.into()))
    }
}
