/// Domain services
///
/// [`UserService`] and [`TaskService`] hold the business rules: they
/// validate nothing themselves (inputs arrive already typed by the
/// validation layer), consult the authorization core before every mutation,
/// and translate storage failures into the [`ServiceError`] taxonomy.
///
/// Both are stateless apart from their collaborators and are shared behind
/// `Arc` by every request.

pub mod pagination;
pub mod task;
pub mod user;

use uuid::Uuid;

use crate::error::ServiceError;
use crate::store::StoreError;

pub use pagination::{Page, PageRequest};
pub use task::TaskService;
pub use user::UserService;

/// Parses a path id; an unparseable id is reported as not found
pub fn parse_id(raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw).map_err(|_| ServiceError::NotFound(format!("Invalid id: {}", raw)))
}

/// Turns a duplicate-key failure into `BadRequest` naming the offending value
///
/// `values` maps each unique field to the value that was written.
pub(crate) fn reject_duplicate(err: StoreError, values: &[(&str, &str)]) -> ServiceError {
    match err {
        StoreError::Duplicate { field } => {
            let value = values
                .iter()
                .find(|(name, _)| *name == field)
                .map(|(_, value)| *value)
                .unwrap_or_default();
            ServiceError::BadRequest(format!("{} '{}' is already taken", field, value))
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        assert_eq!(
            parse_id("not-a-uuid"),
            Err(ServiceError::NotFound("Invalid id: not-a-uuid".to_string()))
        );
    }

    #[test]
    fn test_reject_duplicate() {
        let err = reject_duplicate(
            StoreError::Duplicate { field: "email" },
            &[("name", "alice"), ("email", "alice@example.com")],
        );
        assert_eq!(
            err,
            ServiceError::BadRequest("email 'alice@example.com' is already taken".to_string())
        );

        let err = reject_duplicate(StoreError::Unavailable("down".into()), &[]);
        assert!(matches!(err, ServiceError::Unavailable(_)));
    }
}
