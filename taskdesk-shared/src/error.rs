/// Error taxonomy of the domain services
///
/// | Kind           | Meaning                                                     |
/// |----------------|-------------------------------------------------------------|
/// | `BadRequest`   | invalid input, duplicate unique value, credential mismatch |
/// | `Unauthorized` | missing, invalid or expired token                           |
/// | `Forbidden`    | authenticated but denied by the authorization core          |
/// | `NotFound`     | no record with this id, or an unparseable id                |
/// | `Internal`     | misconfiguration or broken invariant; detail is not exposed |
/// | `Unavailable`  | storage or token blacklist unreachable                      |
///
/// The HTTP layer maps each kind to exactly one status code.

use uuid::Uuid;

use crate::auth::blacklist::BlacklistError;
use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::mail::MailError;
use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// `NotFound` for a well-formed id without a matching record
    pub fn not_found(entity: &str, id: Uuid) -> Self {
        ServiceError::NotFound(format!("{} with id {} not found", entity, id))
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => ServiceError::Unavailable(msg),
            // Services translate duplicates themselves; reaching here means one slipped through
            StoreError::Duplicate { field } => {
                ServiceError::BadRequest(format!("{} is already taken", field))
            }
            StoreError::Database(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::Internal(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ServiceError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ServiceError::Internal(msg),
            JwtError::Expired => ServiceError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => {
                ServiceError::Unauthorized("Invalid token issuer".to_string())
            }
            _ => ServiceError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

impl From<BlacklistError> for ServiceError {
    fn from(err: BlacklistError) -> Self {
        ServiceError::Unavailable(err.to_string())
    }
}

impl From<MailError> for ServiceError {
    fn from(err: MailError) -> Self {
        ServiceError::Internal(format!("Failed to send email: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let id = Uuid::nil();
        assert_eq!(
            ServiceError::not_found("Task", id),
            ServiceError::NotFound(format!("Task with id {} not found", id))
        );
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            ServiceError::from(StoreError::Unavailable("down".into())),
            ServiceError::Unavailable(_)
        ));
        assert!(matches!(
            ServiceError::from(StoreError::Database("boom".into())),
            ServiceError::Internal(_)
        ));
    }

    #[test]
    fn test_token_errors_are_unauthorized() {
        assert_eq!(
            ServiceError::from(JwtError::Expired),
            ServiceError::Unauthorized("Token expired".to_string())
        );
        assert!(matches!(
            ServiceError::from(JwtError::ValidationError("bad".into())),
            ServiceError::Unauthorized(_)
        ));
        assert!(matches!(
            ServiceError::from(JwtError::CreateError("bad".into())),
            ServiceError::Internal(_)
        ));
    }
}
