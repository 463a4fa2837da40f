/// API route handlers, one module per resource
///
/// Handlers stay thin: extract, run the validation layer, call one service
/// operation and shape the response.

pub mod health;
pub mod tasks;
pub mod users;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use taskdesk_shared::services::PageRequest;
use taskdesk_shared::validation::{validate_and_transform, Payload};

use crate::error::{ApiError, ApiResult};

/// `?limit=&page=` query of listing endpoints, kept raw so that the
/// pagination rules can word their own errors
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
    pub page: Option<String>,
}

impl ListQuery {
    pub fn page_request(&self) -> ApiResult<PageRequest> {
        Ok(PageRequest::parse(self.limit.as_deref(), self.page.as_deref())?)
    }
}

/// Runs a JSON body through the validation layer
pub fn validated<T: Payload>(body: Result<Json<Value>, JsonRejection>) -> ApiResult<T> {
    let Json(value) = body?;
    validate_and_transform(&value).map_err(ApiError::BadRequest)
}
