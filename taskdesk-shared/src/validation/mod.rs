/// Request payload validation
///
/// Turns an untyped JSON body into a typed, normalized input value or a
/// single human-readable error message.
///
/// # Rules
///
/// A [`Schema`] is an ordered list of [`FieldSpec`]s. Validation runs one
/// pass and stops at the first failure:
///
/// 1. The body must be a JSON object
/// 2. Update schemas reject an empty object
/// 3. Any property not declared by the schema is rejected
/// 4. Declared fields are checked in declaration order
///
/// The output only carries the declared fields, so extra input can never
/// leak into the typed value.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use taskdesk_shared::validation::{validate_and_transform, CreateUserInput};
///
/// let input = json!({
///     "name": "  Alice ",
///     "email": "alice@example.com",
///     "password": "correct horse"
/// });
///
/// let user: CreateUserInput = validate_and_transform(&input).unwrap();
/// assert_eq!(user.name, "alice");
/// ```

pub mod schemas;

use serde_json::Value;
use std::collections::BTreeMap;
use validator::ValidateEmail;

pub use schemas::{CreateTaskInput, CreateUserInput, UpdateTaskInput, UpdateUserInput};

/// Validated field values keyed by field name
pub type Fields = BTreeMap<&'static str, String>;

/// Rules for a single string field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: &'static str,
    required: bool,
    normalize: bool,
    min_len: Option<usize>,
    max_len: Option<usize>,
    email: bool,
    one_of: Option<&'static [&'static str]>,
}

impl FieldSpec {
    /// Declares an optional string field with no further constraints
    pub fn string(name: &'static str) -> Self {
        Self {
            name,
            required: false,
            normalize: false,
            min_len: None,
            max_len: None,
            email: false,
            one_of: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Trims surrounding whitespace and lowercases the value before any check
    pub fn trimmed_lowercase(mut self) -> Self {
        self.normalize = true;
        self
    }

    /// Character-count bounds, inclusive
    pub fn length(mut self, min: usize, max: usize) -> Self {
        self.min_len = Some(min);
        self.max_len = Some(max);
        self
    }

    pub fn email(mut self) -> Self {
        self.email = true;
        self
    }

    pub fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.one_of = Some(values);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Checks one field value
    ///
    /// Returns `Ok(None)` when an optional field is absent. `null` counts as
    /// absent. In partial mode every field is optional.
    pub fn check(&self, value: Option<&Value>, partial: bool) -> Result<Option<String>, String> {
        let required = self.required && !partial;
        let name = self.name;

        let raw = match value {
            None | Some(Value::Null) if required => {
                return Err(format!("{} should not be empty", name));
            }
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(s)) => s,
            Some(_) => return Err(format!("{} must be a string", name)),
        };

        let value = if self.normalize {
            raw.trim().to_lowercase()
        } else {
            raw.clone()
        };

        if required && value.is_empty() {
            return Err(format!("{} should not be empty", name));
        }

        let len = value.chars().count();
        if let Some(min) = self.min_len {
            if len < min {
                return Err(format!(
                    "{} must be longer than or equal to {} characters",
                    name, min
                ));
            }
        }
        if let Some(max) = self.max_len {
            if len > max {
                return Err(format!(
                    "{} must be shorter than or equal to {} characters",
                    name, max
                ));
            }
        }

        if self.email && !value.validate_email() {
            return Err(format!("{} must be an email", name));
        }

        if let Some(allowed) = self.one_of {
            if !allowed.contains(&value.as_str()) {
                return Err(format!(
                    "{} must be one of the following values: {}",
                    name,
                    allowed.join(", ")
                ));
            }
        }

        Ok(Some(value))
    }
}

/// Ordered set of field rules for one payload kind
#[derive(Debug, Clone)]
pub struct Schema {
    entity: &'static str,
    partial: bool,
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Schema for a create payload: required fields must be present
    pub fn create(entity: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self {
            entity,
            partial: false,
            fields,
        }
    }

    /// Schema for an update payload: every field optional, empty patch rejected
    pub fn update(entity: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self {
            entity,
            partial: true,
            fields,
        }
    }

    /// Runs the ordered validation pass
    pub fn validate(&self, input: &Value) -> Result<Fields, String> {
        let object = input
            .as_object()
            .ok_or_else(|| "Request body must be a JSON object".to_string())?;

        if self.partial && object.is_empty() {
            return Err(format!(
                "At least one field is required to update the {}",
                self.entity
            ));
        }

        if let Some(unknown) = object
            .keys()
            .find(|key| !self.fields.iter().any(|field| field.name == key.as_str()))
        {
            return Err(format!("property {} should not exist", unknown));
        }

        let mut fields = Fields::new();
        for spec in &self.fields {
            if let Some(value) = spec.check(object.get(spec.name), self.partial)? {
                fields.insert(spec.name, value);
            }
        }

        Ok(fields)
    }
}

/// A typed payload produced by a [`Schema`]
pub trait Payload: Sized {
    /// The schema the raw input is checked against
    fn schema() -> Schema;

    /// Builds the typed value from fields that already passed the schema
    fn from_fields(fields: Fields) -> Result<Self, String>;
}

/// Validates `input` against `T`'s schema and converts it
///
/// The error is the message of the first failing rule.
pub fn validate_and_transform<T: Payload>(input: &Value) -> Result<T, String> {
    let fields = T::schema().validate(input)?;
    T::from_fields(fields)
}
