/// Domain models for TaskDesk
///
/// # Models
///
/// - `user`: User accounts, roles and the patch type used for updates
/// - `task`: Tasks owned by users
///
/// Models are plain data. Persistence lives behind the traits in
/// [`crate::store`], so the same types flow through the PostgreSQL and
/// in-memory backends.

pub mod task;
pub mod user;

pub use task::{NewTask, Task, TaskPatch, TaskPriority, TaskStatus};
pub use user::{NewUser, Role, User, UserPatch};
