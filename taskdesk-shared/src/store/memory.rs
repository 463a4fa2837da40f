/// In-memory store
///
/// Mirrors the PostgreSQL store: unique names, case-insensitive unique
/// emails, insertion-ordered listings and soft task ownership.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, StoreResult, TaskStore, UserStore};
use crate::models::{NewTask, NewUser, Task, TaskPatch, User, UserPatch};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    tasks: Vec<Task>,
}

impl Tables {
    fn check_user_unique(&self, id: Option<Uuid>, name: Option<&str>, email: Option<&str>) -> StoreResult<()> {
        let others = self.users.iter().filter(|user| Some(user.id) != id);

        for user in others {
            if name.is_some_and(|name| user.name == name) {
                return Err(StoreError::Duplicate { field: "name" });
            }
            if email.is_some_and(|email| user.email.to_lowercase() == email.to_lowercase()) {
                return Err(StoreError::Duplicate { field: "email" });
            }
        }

        Ok(())
    }

    fn check_task_unique(&self, id: Option<Uuid>, name: &str) -> StoreResult<()> {
        if self
            .tasks
            .iter()
            .any(|task| Some(task.id) != id && task.name == name)
        {
            return Err(StoreError::Duplicate { field: "name" });
        }

        Ok(())
    }
}

fn page<T: Clone>(rows: &[T], offset: u64, limit: u64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    rows.iter().skip(offset).take(limit).cloned().collect()
}

/// Store held in process memory; clones share the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, new_user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        tables.check_user_unique(None, Some(&new_user.name), Some(&new_user.email))?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            email_validated: new_user.email_validated,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|user| user.email.to_lowercase() == email)
            .cloned())
    }

    async fn list(&self, offset: u64, limit: u64) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(page(&tables.users, offset, limit))
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.tables.read().await.users.len() as u64)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        tables.check_user_unique(Some(id), patch.name.as_deref(), patch.email.as_deref())?;

        let Some(user) = tables.users.iter_mut().find(|user| user.id == id) else {
            return Ok(None);
        };
        patch.apply(user);

        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.users.len();
        tables.users.retain(|user| user.id != id);
        Ok(tables.users.len() < before)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert(&self, new_task: NewTask) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;
        tables.check_task_unique(None, &new_task.name)?;

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            name: new_task.name,
            description: new_task.description,
            status: new_task.status,
            priority: new_task.priority,
            user_id: new_task.user_id,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.push(task.clone());

        Ok(task)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let tables = self.tables.read().await;
        Ok(tables.tasks.iter().find(|task| task.id == id).cloned())
    }

    async fn list(&self, offset: u64, limit: u64) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read().await;
        Ok(page(&tables.tasks, offset, limit))
    }

    async fn list_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .iter()
            .filter(|task| task.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.tables.read().await.tasks.len() as u64)
    }

    async fn update(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>> {
        let mut tables = self.tables.write().await;
        if let Some(name) = patch.name.as_deref() {
            tables.check_task_unique(Some(id), name)?;
        }

        let Some(task) = tables.tasks.iter_mut().find(|task| task.id == id) else {
            return Ok(None);
        };
        patch.apply(task);

        Ok(Some(task.clone()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.tasks.len();
        tables.tasks.retain(|task| task.id != id);
        Ok(tables.tasks.len() < before)
    }

    async fn delete_by_owner(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.tasks.len();
        tables.tasks.retain(|task| task.user_id != user_id);
        Ok((before - tables.tasks.len()) as u64)
    }
}
