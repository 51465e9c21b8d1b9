//! 用户业务服务

use std::sync::Arc;

use tracing::{info, warn};
use validator::Validate;

use super::model::{NewUser, User, UserChanges};
use super::store::UserStore;
use crate::core::error::{CoreError, Result};

/// 校验请求后委托给存储层
pub struct UserService<S> {
    store: Arc<S>,
}

impl<S> Clone for UserService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

/// 存储层拒绝写入时记录告警
fn log_rejection(action: &str, err: CoreError) -> CoreError {
    if err.is_constraint_violation() {
        warn!("Rejected {}: {}", action, err);
    }
    err
}

impl<S: UserStore> UserService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn create(&self, new_user: NewUser) -> Result<User> {
        new_user.validate()?;
        let user = self
            .store
            .insert(&new_user)
            .await
            .map_err(|e| log_rejection("create", e))?;
        info!("Created user: {} ({})", user.name, user.id);
        Ok(user)
    }

    pub async fn update(&self, id: i32, changes: UserChanges) -> Result<User> {
        changes.validate()?;
        let user = self
            .store
            .update(id, &changes)
            .await
            .map_err(|e| log_rejection("update", e))?;
        info!("Updated user: {} ({})", user.name, user.id);
        Ok(user)
    }

    pub async fn find(&self, id: i32) -> Result<User> {
        self.store
            .get(id)
            .await?
            .ok_or(CoreError::NotFound(id.into()))
    }

    pub async fn remove(&self, id: i32) -> Result<()> {
        if !self.store.delete(id).await? {
            return Err(CoreError::NotFound(id.into()));
        }
        info!("Deleted user: {}", id);
        Ok(())
    }
}
