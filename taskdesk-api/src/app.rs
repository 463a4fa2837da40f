/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskdesk_api::{app::{build_router, AppState}, config::Config};
/// use taskdesk_shared::auth::{CredentialHasher, MemoryTokenBlacklist, TokenService};
/// use taskdesk_shared::services::user::UserServiceDeps;
/// use taskdesk_shared::store::MemoryStore;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let store = MemoryStore::new();
/// let deps = UserServiceDeps {
///     users: Arc::new(store.clone()),
///     tasks: Arc::new(store),
///     hasher: CredentialHasher::new(config.hashing),
///     tokens: TokenService::new(
///         config.jwt.secret.clone(),
///         chrono::Duration::seconds(config.jwt.session_ttl_secs),
///         chrono::Duration::seconds(config.jwt.email_ttl_secs),
///     ),
///     blacklist: Arc::new(MemoryTokenBlacklist::new()),
/// };
/// let app = build_router(AppState::new(config, deps, None));
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use taskdesk_shared::{
    auth::{Principal, TokenService},
    error::ServiceError,
    mail::Mailer,
    services::{user::UserServiceDeps, TaskService, UserService},
    store::UserStore,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub tasks: Arc<TaskService>,

    /// Verifies session tokens in the auth middleware
    pub tokens: TokenService,

    /// Probed by the health endpoint
    pub store: Arc<dyn UserStore>,

    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the domain services; `mailer` enables validation emails
    pub fn new(config: Config, deps: UserServiceDeps, mailer: Option<Arc<dyn Mailer>>) -> Self {
        let tokens = deps.tokens.clone();
        let store = deps.users.clone();
        let task_store = deps.tasks.clone();

        let mut users = UserService::new(deps);
        if let Some(mailer) = mailer {
            users = users.with_mailer(mailer, config.api.public_url.clone());
        }
        let users = Arc::new(users);
        let tasks = Arc::new(TaskService::new(task_store, users.clone()));

        Self {
            users,
            tasks,
            tokens,
            store,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /health                              GET            public
/// /v1/users                            POST           public
/// /v1/users/login                      POST           public
/// /v1/users/validate-email/:token      GET            public
/// /v1/users                            GET            session
/// /v1/users/validate-email             POST           session
/// /v1/users/:id                        GET PATCH DEL  session
/// /v1/users/:id/tasks                  GET            session
/// /v1/tasks                            GET POST       session
/// /v1/tasks/:id                        GET PATCH DEL  session
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{health, tasks, users};

    let public_routes = Router::new()
        .route("/users", post(users::create))
        .route("/users/login", post(users::login))
        .route("/users/validate-email/:token", get(users::validate_email));

    let session_routes = Router::new()
        .route("/users", get(users::find_all))
        .route("/users/validate-email", post(users::send_validation_email))
        .route(
            "/users/:id",
            get(users::find_one)
                .patch(users::update_one)
                .delete(users::delete_one),
        )
        .route("/users/:id/tasks", get(tasks::find_all_by_user))
        .route("/tasks", get(tasks::find_all).post(tasks::create))
        .route(
            "/tasks/:id",
            get(tasks::find_one)
                .patch(tasks::update_one)
                .delete(tasks::delete_one),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let v1_routes = public_routes.merge(session_routes);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.cors_origins))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    layer.allow_origin(origins)
}

/// Session authentication middleware
///
/// Verifies the `Authorization: Bearer <token>` header and injects the
/// caller's [`Principal`] into request extensions.
async fn session_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))?;

    let claims = state
        .tokens
        .verify_session(token)
        .map_err(ServiceError::from)?;
    let principal = Principal::from_claims(&claims).map_err(ServiceError::from)?;

    tracing::debug!(user_id = %principal.id, role = %principal.role, "Session authenticated");
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
