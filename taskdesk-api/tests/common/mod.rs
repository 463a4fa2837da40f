//! Common test utilities for integration tests
//!
//! Builds the full router over the in-memory store and blacklist, a mailer
//! that records instead of sending, and the cheapest Argon2 parameters, so
//! the HTTP flows run without PostgreSQL, Redis or a mail relay.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use taskdesk_api::app::{build_router, AppState};
use taskdesk_api::config::Config;
use taskdesk_shared::auth::{CredentialHasher, HashingConfig, MemoryTokenBlacklist, TokenService};
use taskdesk_shared::mail::{Mail, MailError, Mailer};
use taskdesk_shared::models::{Role, UserPatch};
use taskdesk_shared::services::user::{UserServiceDeps, VALIDATION_PATH};
use taskdesk_shared::store::{MemoryStore, UserStore};
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "integration-secret-key-at-least-32-bytes";
pub const PASSWORD: &str = "s3cret-pass";

/// Mailer that keeps every message
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Mail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_mail(&self, mail: Mail) -> Result<(), MailError> {
        self.sent.lock().await.push(mail);
        Ok(())
    }
}

impl RecordingMailer {
    /// Token embedded in the most recent validation link sent to `to`
    pub async fn last_token_for(&self, to: &str) -> Option<String> {
        let sent = self.sent.lock().await;
        let mail = sent.iter().rev().find(|mail| mail.to == to)?;

        let start = mail.html.find(VALIDATION_PATH)? + VALIDATION_PATH.len() + 1;
        let rest = &mail.html[start..];
        Some(rest[..rest.find('"')?].to_string())
    }
}

/// A registered user as seen by the tests
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestUser {
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Test context containing the router and its backing store
pub struct TestContext {
    pub app: Router,
    pub store: MemoryStore,
    pub mailer: Arc<RecordingMailer>,
    pub config: Config,
}

impl TestContext {
    pub fn new() -> Self {
        Self::build(true)
    }

    /// Context with email dispatch disabled
    pub fn without_mailer() -> Self {
        Self::build(false)
    }

    fn build(with_mailer: bool) -> Self {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "postgresql://unused/taskdesk_test"),
            ("JWT_SECRET", SECRET),
            ("PUBLIC_URL", "http://taskdesk.test"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
            .expect("test configuration");

        let store = MemoryStore::new();
        let deps = UserServiceDeps {
            users: Arc::new(store.clone()),
            tasks: Arc::new(store.clone()),
            hasher: CredentialHasher::new(HashingConfig::minimal()),
            tokens: TokenService::new(
                SECRET,
                chrono::Duration::hours(1),
                chrono::Duration::hours(1),
            ),
            blacklist: Arc::new(MemoryTokenBlacklist::new()),
        };

        let mailer = Arc::new(RecordingMailer::default());
        let dyn_mailer: Option<Arc<dyn Mailer>> = if with_mailer {
            Some(mailer.clone() as Arc<dyn Mailer>)
        } else {
            None
        };

        let app = build_router(AppState::new(config.clone(), deps, dyn_mailer));

        Self {
            app,
            store,
            mailer,
            config,
        }
    }

    /// Sends one request; returns the status and the JSON body (`Null` when empty)
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        auth: Option<&TestUser>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = auth {
            builder = builder.header("authorization", user.auth_header());
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, value)
    }

    /// Registers `name` with password [`PASSWORD`]
    pub async fn register(&self, name: &str) -> TestUser {
        let email = format!("{}@example.com", name);
        let (status, body) = self
            .send(
                "POST",
                "/v1/users",
                None,
                Some(serde_json::json!({
                    "name": name,
                    "email": email,
                    "password": PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {}: {}", name, body);

        TestUser {
            id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
            email,
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    /// Registers a user and sets its role directly in the store
    pub async fn register_as(&self, name: &str, role: Role) -> TestUser {
        let user = self.register(name).await;
        UserStore::update(
            &self.store,
            user.id,
            UserPatch {
                role: Some(role),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        user
    }

    /// Creates a task owned by `owner` and returns its id
    pub async fn create_task(&self, owner: &TestUser, name: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/v1/tasks",
                Some(owner),
                Some(serde_json::json!({
                    "name": name,
                    "description": "integration test task",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create task {}: {}", name, body);

        body["id"].as_str().unwrap().to_string()
    }
}
