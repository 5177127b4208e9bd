//! Mock todo service backed by the shared store

use std::sync::Arc;

use async_trait::async_trait;
use fictive::{Settler, Store, StoreError};
use serde_json::{Value, json};
use thiserror::Error;

/// Collection holding the todo records
pub const TODOS: &str = "todos";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("todo {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Operations a todo backend offers
#[async_trait]
pub trait TodoApi: Send + Sync {
    async fn list(&self) -> Result<Vec<Value>, ServiceError>;
    async fn add(&self, title: &str) -> Result<i64, ServiceError>;
    async fn rename(&self, id: i64, title: &str) -> Result<usize, ServiceError>;
    async fn remove(&self, id: i64) -> Result<usize, ServiceError>;
}

/// Todo backend that lives entirely in memory
pub struct FakeTodoApi {
    store: Arc<Store>,
    settler: Settler,
}

impl FakeTodoApi {
    pub fn new(store: Arc<Store>, settler: Settler) -> Self {
        Self { store, settler }
    }

    fn require_match(id: i64, count: usize) -> Result<usize, ServiceError> {
        if count == 0 {
            return Err(ServiceError::NotFound(id));
        }
        Ok(count)
    }
}

#[async_trait]
impl TodoApi for FakeTodoApi {
    async fn list(&self) -> Result<Vec<Value>, ServiceError> {
        let result = self.store.search_all(TODOS).map_err(ServiceError::from);
        self.settler.after_delay(result, None).await
    }

    async fn add(&self, title: &str) -> Result<i64, ServiceError> {
        let result = self
            .store
            .insert(TODOS, json!({"title": title, "done": false}), Some("id"))
            .map(|key| key.unwrap_or_default())
            .map_err(ServiceError::from);
        self.settler.after_delay(result, None).await
    }

    async fn rename(&self, id: i64, title: &str) -> Result<usize, ServiceError> {
        let result = self
            .store
            .update(TODOS, json!({"title": title}), |r| r["id"] == id)
            .map_err(ServiceError::from)
            .and_then(|count| Self::require_match(id, count));
        self.settler.after_delay(result, None).await
    }

    async fn remove(&self, id: i64) -> Result<usize, ServiceError> {
        let result = self
            .store
            .delete(TODOS, |r| r["id"] == id)
            .map_err(ServiceError::from)
            .and_then(|count| Self::require_match(id, count));
        // slower than the other calls, like a real delete
        self.settler.after_delay(result, Some(400)).await
    }
}
