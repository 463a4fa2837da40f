/// Persistence contracts
///
/// The domain services talk to storage only through [`UserStore`] and
/// [`TaskStore`]. Two implementations exist:
///
/// - [`PgStore`]: PostgreSQL through a `sqlx` pool
/// - [`MemoryStore`]: in-process, same semantics, used by tests and local runs
///
/// Listings are ordered by creation time (oldest first) so pagination is
/// stable across requests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{NewTask, NewUser, Task, TaskPatch, User, UserPatch};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Error type for storage operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A unique field already holds this value
    #[error("Duplicate value for unique field {field}")]
    Duplicate { field: &'static str },

    /// Storage cannot be reached
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Any other storage failure
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                let field = match db_err.constraint() {
                    Some(constraint) if constraint.contains("email") => "email",
                    _ => "name",
                };
                StoreError::Duplicate { field }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// User persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user; fails with `Duplicate` on a taken name or email
    async fn insert(&self, new_user: NewUser) -> StoreResult<User>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Case-insensitive email lookup
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn list(&self, offset: u64, limit: u64) -> StoreResult<Vec<User>>;

    async fn count(&self) -> StoreResult<u64>;

    /// Applies a partial update; `None` when no user has this id
    async fn update(&self, id: Uuid, patch: UserPatch) -> StoreResult<Option<User>>;

    /// Returns whether a user was deleted
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    /// Checks connectivity
    async fn ping(&self) -> StoreResult<()>;
}

/// Task persistence
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a task; fails with `Duplicate` on a taken name
    async fn insert(&self, new_task: NewTask) -> StoreResult<Task>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Task>>;

    async fn list(&self, offset: u64, limit: u64) -> StoreResult<Vec<Task>>;

    /// All tasks owned by `user_id`
    async fn list_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Task>>;

    async fn count(&self) -> StoreResult<u64>;

    async fn update(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>>;

    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    /// Deletes every task owned by `user_id`, returning how many were removed
    async fn delete_by_owner(&self, user_id: Uuid) -> StoreResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn test_other_errors_are_database() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }
}
