/// Authorization core
///
/// Single source of truth for "may actor A mutate resource R". Reads need
/// only an authenticated principal; mutations follow one decision table for
/// both users and tasks:
///
/// | Actor is owner | Actor role | Owner role         | Allowed |
/// |----------------|------------|--------------------|---------|
/// | yes            | any        | any                | yes     |
/// | no             | readonly   | any                | no      |
/// | no             | editor     | any                | no      |
/// | no             | admin      | admin              | no      |
/// | no             | admin      | readonly or editor | yes     |
///
/// Task creation additionally requires `editor` or `admin`.
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::authorization::is_modification_allowed;
/// use taskdesk_shared::models::Role;
/// use uuid::Uuid;
///
/// let admin = Uuid::new_v4();
/// let owner = Uuid::new_v4();
///
/// assert!(is_modification_allowed(admin, Role::Admin, owner, Role::Editor));
/// assert!(!is_modification_allowed(admin, Role::Admin, owner, Role::Admin));
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::Claims;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{Role, Task, User};
use crate::store::{TaskStore, UserStore};

/// Message returned for every denied mutation
pub const FORBIDDEN_MESSAGE: &str = "You are not allowed to modify this resource";

/// Message returned when a readonly user tries to create a task
pub const TASK_CREATION_FORBIDDEN: &str = "Only editors and admins can create tasks";

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Actor may not modify the resource
    #[error("{}", FORBIDDEN_MESSAGE)]
    NotAllowed,

    /// Actor's role is below the one required
    #[error("Insufficient permissions: requires {required}, has {actual}")]
    InsufficientRole { required: Role, actual: Role },

    /// Session token without a subject
    #[error("Token has no subject")]
    MissingSubject,
}

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotAllowed => ServiceError::Forbidden(FORBIDDEN_MESSAGE.to_string()),
            AuthzError::InsufficientRole { .. } => {
                ServiceError::Forbidden(TASK_CREATION_FORBIDDEN.to_string())
            }
            AuthzError::MissingSubject => ServiceError::Unauthorized(err.to_string()),
        }
    }
}

/// The authenticated caller, as established from a session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,

    /// Role at token issue time; mutations re-read the current role
    pub role: Role,
}

impl Principal {
    /// Builds the principal from verified session claims
    pub fn from_claims(claims: &Claims) -> Result<Self, AuthzError> {
        let id = claims.sub.ok_or(AuthzError::MissingSubject)?;
        Ok(Self {
            id,
            role: claims.role.unwrap_or_default(),
        })
    }
}

/// Applies the mutation decision table
pub fn is_modification_allowed(actor_id: Uuid, actor_role: Role, owner_id: Uuid, owner_role: Role) -> bool {
    if actor_id == owner_id {
        return true;
    }

    actor_role == Role::Admin && owner_role != Role::Admin
}

pub fn require_modification(
    actor_id: Uuid,
    actor_role: Role,
    owner_id: Uuid,
    owner_role: Role,
) -> Result<(), AuthzError> {
    if is_modification_allowed(actor_id, actor_role, owner_id, owner_role) {
        Ok(())
    } else {
        Err(AuthzError::NotAllowed)
    }
}

/// Checks that the actor may create tasks
pub fn require_task_creation(actor_role: Role) -> Result<(), AuthzError> {
    if actor_role.has_permission(Role::Editor) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole {
            required: Role::Editor,
            actual: actor_role,
        })
    }
}

/// Resolves a user mutation: loads the target and applies the decision table
///
/// `actor` is the acting user as currently stored. Returns the target for the
/// caller to mutate.
///
/// # Errors
///
/// - `NotFound` if the target does not exist
/// - `Forbidden` if the decision table denies the mutation
pub async fn authorize_user_modification(
    users: &dyn UserStore,
    actor: &User,
    target_id: Uuid,
) -> ServiceResult<User> {
    if actor.id == target_id {
        return Ok(actor.clone());
    }

    let target = users
        .find_by_id(target_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("User", target_id))?;

    require_modification(actor.id, actor.role, target.id, target.role)?;
    Ok(target)
}

/// Resolves a task mutation: loads the task, then its owner when the actor
/// is not the owner, and applies the decision table
///
/// A task whose owner no longer exists is treated as owned by a readonly
/// user, so only admins may modify it.
///
/// # Errors
///
/// - `NotFound` if the task does not exist
/// - `Forbidden` if the decision table denies the mutation
pub async fn authorize_task_modification(
    users: &dyn UserStore,
    tasks: &dyn TaskStore,
    actor: &User,
    task_id: Uuid,
) -> ServiceResult<Task> {
    let task = tasks
        .find_by_id(task_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Task", task_id))?;

    if task.user_id == actor.id {
        return Ok(task);
    }

    let owner_role = users
        .find_by_id(task.user_id)
        .await?
        .map(|owner| owner.role)
        .unwrap_or_default();

    require_modification(actor.id, actor.role, task.user_id, owner_role)?;
    Ok(task)
}
