/// Schemas and typed inputs for user and task payloads
///
/// | Payload     | Fields (in check order)                       |
/// |-------------|-----------------------------------------------|
/// | Create user | name, email, password                         |
/// | Update user | name?, email?, password?                      |
/// | Create task | name, description, status?, priority?        |
/// | Update task | name?, description?, status?, priority?       |
///
/// `role`, `emailValidated` and the task owner are not schema fields, so a
/// client sending them gets `property <x> should not exist`.

use super::{FieldSpec, Fields, Payload, Schema};
use crate::models::{TaskPriority, TaskStatus};

pub const NAME_MIN: usize = 3;
pub const NAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 500;

fn user_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::string("name")
            .required()
            .trimmed_lowercase()
            .length(NAME_MIN, NAME_MAX),
        FieldSpec::string("email").required().email(),
        // Only checked when present on update; stored hashes are never re-checked.
        FieldSpec::string("password")
            .required()
            .length(PASSWORD_MIN, PASSWORD_MAX),
    ]
}

fn task_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::string("name")
            .required()
            .trimmed_lowercase()
            .length(NAME_MIN, NAME_MAX),
        FieldSpec::string("description")
            .required()
            .length(1, DESCRIPTION_MAX),
        FieldSpec::string("status").one_of(&TaskStatus::VALUES),
        FieldSpec::string("priority").one_of(&TaskPriority::VALUES),
    ]
}

fn take(fields: &mut Fields, name: &str) -> Result<String, String> {
    fields
        .remove(name)
        .ok_or_else(|| format!("{} should not be empty", name))
}

fn parse_optional<T: std::str::FromStr<Err = String>>(
    fields: &mut Fields,
    name: &str,
) -> Result<Option<T>, String> {
    fields.remove(name).map(|raw| raw.parse()).transpose()
}

/// Registration payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Payload for CreateUserInput {
    fn schema() -> Schema {
        Schema::create("user", user_fields())
    }

    fn from_fields(mut fields: Fields) -> Result<Self, String> {
        Ok(Self {
            name: take(&mut fields, "name")?,
            email: take(&mut fields, "email")?,
            password: take(&mut fields, "password")?,
        })
    }
}

/// Profile update payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Payload for UpdateUserInput {
    fn schema() -> Schema {
        Schema::update("user", user_fields())
    }

    fn from_fields(mut fields: Fields) -> Result<Self, String> {
        Ok(Self {
            name: fields.remove("name"),
            email: fields.remove("email"),
            password: fields.remove("password"),
        })
    }
}

/// Task creation payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskInput {
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
}

impl Payload for CreateTaskInput {
    fn schema() -> Schema {
        Schema::create("task", task_fields())
    }

    fn from_fields(mut fields: Fields) -> Result<Self, String> {
        Ok(Self {
            name: take(&mut fields, "name")?,
            description: take(&mut fields, "description")?,
            status: parse_optional(&mut fields, "status")?.unwrap_or_default(),
            priority: parse_optional(&mut fields, "priority")?.unwrap_or_default(),
        })
    }
}

/// Task update payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTaskInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

impl Payload for UpdateTaskInput {
    fn schema() -> Schema {
        Schema::update("task", task_fields())
    }

    fn from_fields(mut fields: Fields) -> Result<Self, String> {
        Ok(Self {
            name: fields.remove("name"),
            description: fields.remove("description"),
            status: parse_optional(&mut fields, "status")?,
            priority: parse_optional(&mut fields, "priority")?,
        })
    }
}
