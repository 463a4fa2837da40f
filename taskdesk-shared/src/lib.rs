//! # TaskDesk Shared Library
//!
//! This crate contains the domain types, validation, authorization rules and
//! services used by the TaskDesk API server.
//!
//! ## Module Organization
//!
//! - `models`: Users and tasks as stored
//! - `validation`: Payload schemas for create/update requests
//! - `auth`: Password hashing, session tokens, authorization decisions
//! - `store`: Persistence contracts with PostgreSQL and in-memory backends
//! - `db`: Connection pool and migrations
//! - `mail`: Outbound email dispatch
//! - `redis`: Redis client used by the token blacklist
//! - `services`: User and task services
//! - `error`: Service error taxonomy

pub mod auth;
pub mod db;
pub mod error;
pub mod mail;
pub mod models;
pub mod redis;
pub mod services;
pub mod store;
pub mod validation;

/// Current version of the TaskDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
