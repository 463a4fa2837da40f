/// Task service: task CRUD on behalf of an authenticated user

use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use super::{reject_duplicate, Page, PageRequest, UserService};
use crate::auth::authorization::{authorize_task_modification, require_task_creation, Principal};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{NewTask, Task, TaskPatch};
use crate::store::TaskStore;
use crate::validation::{CreateTaskInput, UpdateTaskInput};

pub struct TaskService {
    tasks: Arc<dyn TaskStore>,
    users: Arc<UserService>,
}

impl TaskService {
    /// Owner lookups go through `users`
    pub fn new(tasks: Arc<dyn TaskStore>, users: Arc<UserService>) -> Self {
        Self { tasks, users }
    }

    /// Creates a task owned by the caller; editors and admins only
    #[instrument(skip_all, fields(actor = %principal.id, name = %input.name))]
    pub async fn create(&self, principal: &Principal, input: CreateTaskInput) -> ServiceResult<Task> {
        let actor = self.users.load_actor(principal).await?;
        require_task_creation(actor.role)?;

        let name = input.name.clone();
        let task = self
            .tasks
            .insert(NewTask {
                name: input.name,
                description: input.description,
                status: input.status,
                priority: input.priority,
                user_id: actor.id,
            })
            .await
            .map_err(|e| reject_duplicate(e, &[("name", name.as_str())]))?;

        tracing::info!(task_id = %task.id, owner = %actor.id, "Task created");
        Ok(task)
    }

    #[instrument(skip_all, fields(task_id = %id))]
    pub async fn find_one(&self, id: Uuid) -> ServiceResult<Task> {
        self.tasks
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Task", id))
    }

    #[instrument(skip_all, fields(limit = request.limit, page = request.page))]
    pub async fn find_all(&self, request: PageRequest) -> ServiceResult<Page<Task>> {
        let total = self.tasks.count().await?;
        request.check_against(total)?;

        let items = self.tasks.list(request.offset(), request.limit).await?;
        Ok(Page {
            items,
            total,
            page: request.page,
            limit: request.limit,
        })
    }

    /// Tasks owned by `owner_id`; the owner must exist
    #[instrument(skip_all, fields(owner = %owner_id))]
    pub async fn find_all_by_user(&self, owner_id: Uuid) -> ServiceResult<Vec<Task>> {
        let owner = self.users.find_one(owner_id).await?;
        Ok(self.tasks.list_by_owner(owner.id).await?)
    }

    #[instrument(skip_all, fields(actor = %principal.id, task_id = %id))]
    pub async fn delete_one(&self, principal: &Principal, id: Uuid) -> ServiceResult<()> {
        let actor = self.users.load_actor(principal).await?;
        let task =
            authorize_task_modification(self.users.store(), self.tasks.as_ref(), &actor, id).await?;

        if !self.tasks.delete(task.id).await? {
            return Err(ServiceError::not_found("Task", task.id));
        }

        tracing::info!(task_id = %task.id, "Task deleted");
        Ok(())
    }

    #[instrument(skip_all, fields(actor = %principal.id, task_id = %id))]
    pub async fn update_one(
        &self,
        principal: &Principal,
        id: Uuid,
        input: UpdateTaskInput,
    ) -> ServiceResult<Task> {
        let actor = self.users.load_actor(principal).await?;
        let task =
            authorize_task_modification(self.users.store(), self.tasks.as_ref(), &actor, id).await?;

        let name = input.name.clone().unwrap_or_default();
        let patch = TaskPatch {
            name: input.name,
            description: input.description,
            status: input.status,
            priority: input.priority,
        };

        let task = self
            .tasks
            .update(task.id, patch)
            .await
            .map_err(|e| reject_duplicate(e, &[("name", name.as_str())]))?
            .ok_or_else(|| ServiceError::not_found("Task", task.id))?;

        tracing::info!(task_id = %task.id, "Task updated");
        Ok(task)
    }
}
