/// User model
///
/// This module provides the User model, the role ladder used by the
/// authorization rules, and the input/patch types consumed by the stores.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('readonly', 'editor', 'admin');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(50) NOT NULL,
///     email VARCHAR(255) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     role user_role NOT NULL DEFAULT 'readonly',
///     email_validated BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// CREATE UNIQUE INDEX users_name_key ON users (name);
/// CREATE UNIQUE INDEX users_email_key ON users (lower(email));
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Privilege tier of a user
///
/// Variants are declared in ascending order of privilege, so the derived
/// `Ord` gives `Readonly < Editor < Admin`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May read everything, may only modify itself
    #[default]
    Readonly,

    /// May additionally create tasks
    Editor,

    /// May additionally modify resources owned by non-admins
    Admin,
}

impl Role {
    /// All roles in ascending privilege order
    pub const ALL: [Role; 3] = [Role::Readonly, Role::Editor, Role::Admin];

    /// Converts role to its wire/database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Readonly => "readonly",
            Role::Editor => "editor",
            Role::Admin => "admin",
        }
    }

    /// Checks if this role is at least as privileged as `required`
    pub fn has_permission(&self, required: Role) -> bool {
        *self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("Unknown role: {}", s))
    }
}

/// User account
///
/// The password hash never leaves the server: it is skipped by serde, so
/// every JSON response built from a `User` omits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Unique name, stored trimmed and lowercase
    pub name: String,

    /// Unique email address (compared case-insensitively)
    pub email: String,

    /// Argon2id password hash
    #[serde(skip)]
    pub password_hash: String,

    /// Privilege tier
    pub role: Role,

    /// Whether the current email address has been confirmed
    pub email_validated: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last modified
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,

    /// Argon2id password hash (NOT the plaintext password!)
    pub password_hash: String,

    pub role: Role,
    pub email_validated: bool,
}

impl NewUser {
    /// Creates a registration record with the server-controlled defaults:
    /// role `readonly` and an unvalidated email.
    pub fn registration(name: String, email: String, password_hash: String) -> Self {
        Self {
            name,
            email,
            password_hash,
            role: Role::Readonly,
            email_validated: false,
        }
    }
}

/// Partial update of a user
///
/// All fields are optional. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub email_validated: Option<bool>,
}

impl UserPatch {
    /// Returns true when the patch would change nothing
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.role.is_none()
            && self.email_validated.is_none()
    }

    /// Applies the patch to an in-memory user
    pub fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(password_hash) = self.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(validated) = self.email_validated {
            user.email_validated = validated;
        }
        user.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::Editor,
            email_validated: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_role_ordering() {
        assert!(Role::Readonly < Role::Editor);
        assert!(Role::Editor < Role::Admin);
        assert!(Role::Admin.has_permission(Role::Editor));
        assert!(!Role::Readonly.has_permission(Role::Editor));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("readonly".parse::<Role>().unwrap(), Role::Readonly);
        assert!("root".parse::<Role>().is_err());
        assert_eq!(Role::default(), Role::Readonly);
    }

    #[test]
    fn test_user_serialization_hides_password() {
        let json = serde_json::to_value(sample_user()).unwrap();

        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "editor");
        assert_eq!(json["emailValidated"], true);
    }

    #[test]
    fn test_registration_defaults() {
        let new_user = NewUser::registration(
            "bob".to_string(),
            "bob@example.com".to_string(),
            "hash".to_string(),
        );
        assert_eq!(new_user.role, Role::Readonly);
        assert!(!new_user.email_validated);
    }

    #[test]
    fn test_patch_apply() {
        let mut user = sample_user();
        let before = user.updated_at;

        let patch = UserPatch {
            role: Some(Role::Readonly),
            email_validated: Some(false),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply(&mut user);

        assert_eq!(user.role, Role::Readonly);
        assert!(!user.email_validated);
        assert_eq!(user.name, "alice");
        assert!(user.updated_at >= before);
        assert!(UserPatch::default().is_empty());
    }
}
