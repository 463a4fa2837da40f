/// User endpoints
///
/// - `POST   /v1/users` - register, answers the user and a session token
/// - `POST   /v1/users/login` - exchange credentials for a session token
/// - `POST   /v1/users/validate-email` - resend the validation email
/// - `GET    /v1/users/validate-email/:token` - redeem a validation token
/// - `GET    /v1/users` - paginated listing
/// - `GET    /v1/users/:id`
/// - `PATCH  /v1/users/:id`
/// - `DELETE /v1/users/:id` - also removes the user's tasks

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{validated, ListQuery},
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use taskdesk_shared::{
    auth::Principal,
    models::User,
    services::{parse_id, Page},
    validation::{CreateUserInput, UpdateUserInput},
};
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "email must be an email"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "password should not be empty"))]
    pub password: String,
}

impl LoginRequest {
    /// First failing rule, email before password
    fn check(&self) -> ApiResult<()> {
        let Err(errors) = self.validate() else {
            return Ok(());
        };

        let fields = errors.field_errors();
        let message = ["email", "password"]
            .iter()
            .filter_map(|field| fields.get(*field))
            .flat_map(|errors| errors.iter())
            .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "Invalid credentials".to_string());

        Err(ApiError::BadRequest(message))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Register a new user
///
/// ```text
/// POST /v1/users
///
/// { "name": "alice", "email": "alice@example.com", "password": "s3cret-pass" }
/// ```
///
/// New users start as `readonly` with an unvalidated email.
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let input: CreateUserInput = validated(body)?;
    let (user, token) = state.users.create(input).await?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user, token })))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(req) = body?;
    req.check()?;

    let token = state.users.login(&req.email, &req.password).await?;
    Ok(Json(LoginResponse { token }))
}

pub async fn send_validation_email(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<StatusCode> {
    state.users.send_validation_email(&principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Redeem a validation token, answering the updated user
pub async fn validate_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.users.validate_email(&token).await?))
}

pub async fn find_all(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<User>>> {
    let request = query.page_request()?;
    Ok(Json(state.users.find_all(request).await?))
}

pub async fn find_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let id = parse_id(&id)?;
    Ok(Json(state.users.find_one(id).await?))
}

/// Partial update of a user's own profile (or, for admins, of a non-admin)
///
/// Changing the email drops the user back to `readonly` until the new
/// address is validated.
pub async fn update_one(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let id = parse_id(&id)?;
    let input: UpdateUserInput = validated(body)?;

    Ok(Json(state.users.update_one(&principal, id, input).await?))
}

pub async fn delete_one(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    state.users.delete_one(&principal, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
