//! # Taskdesk API Server Library
//!
//! HTTP surface of taskdesk: configuration, the axum router with its
//! handlers and middleware, and the mapping of domain errors to responses.
//! Business rules live in `taskdesk-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state, router and session authentication
//! - `config`: Configuration from the environment
//! - `error`: Error to HTTP response mapping
//! - `middleware`: Security headers
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
