/// Task endpoints
///
/// - `POST   /v1/tasks` - editors and admins only; the caller becomes owner
/// - `GET    /v1/tasks` - paginated listing
/// - `GET    /v1/tasks/:id`
/// - `PATCH  /v1/tasks/:id`
/// - `DELETE /v1/tasks/:id`
/// - `GET    /v1/users/:id/tasks` - every task of one user

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{validated, ListQuery},
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::Value;
use taskdesk_shared::{
    auth::Principal,
    models::Task,
    services::{parse_id, Page},
    validation::{CreateTaskInput, UpdateTaskInput},
};

/// Create a task
///
/// ```text
/// POST /v1/tasks
///
/// { "name": "write docs", "description": "...", "status": "pending", "priority": "high" }
/// ```
///
/// `status` defaults to `pending` and `priority` to `medium`.
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let input: CreateTaskInput = validated(body)?;
    let task = state.tasks.create(&principal, input).await?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn find_all(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<Task>>> {
    let request = query.page_request()?;
    Ok(Json(state.tasks.find_all(request).await?))
}

pub async fn find_all_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    let user_id = parse_id(&user_id)?;
    Ok(Json(state.tasks.find_all_by_user(user_id).await?))
}

pub async fn find_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let id = parse_id(&id)?;
    Ok(Json(state.tasks.find_one(id).await?))
}

pub async fn update_one(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let id = parse_id(&id)?;
    let input: UpdateTaskInput = validated(body)?;

    Ok(Json(state.tasks.update_one(&principal, id, input).await?))
}

pub async fn delete_one(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    state.tasks.delete_one(&principal, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
