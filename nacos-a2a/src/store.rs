//! Task storage.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::task::{Task, TaskId};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Task was not found.
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    /// Task already exists.
    #[error("Task already exists: {0}")]
    AlreadyExists(TaskId),

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Backend(String),
}

/// Persistence for A2A tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Get a task by ID.
    async fn get(&self, task_id: &str) -> Result<Option<Task>, StoreError>;

    /// Save a new task.
    async fn save(&self, task: &Task) -> Result<(), StoreError>;

    /// Replace an existing task.
    async fn update(&self, task: &Task) -> Result<(), StoreError>;

    /// Delete a task.
    async fn delete(&self, task_id: &str) -> Result<(), StoreError>;
}

/// In-memory task store. Tasks are lost when the process exits.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl InMemoryTaskStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get(&self, task_id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(task_id).cloned())
    }

    async fn save(&self, task: &Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(StoreError::AlreadyExists(task.id.clone()));
        }
        tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn update(&self, task: &Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&task.id) {
            Some(existing) => {
                *existing = task.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(task.id.clone())),
        }
    }

    async fn delete(&self, task_id: &str) -> Result<(), StoreError> {
        if self.tasks.write().await.remove(task_id).is_none() {
            return Err(StoreError::NotFound(task_id.to_string()));
        }
        Ok(())
    }
}
