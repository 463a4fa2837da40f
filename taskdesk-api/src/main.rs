//! # Taskdesk API Server
//!
//! REST backend for users and tasks with role-based access control.
//!
//! Startup order: configuration, PostgreSQL pool (with retries), schema
//! migrations, token blacklist (Redis when `REDIS_URL` is set), optional
//! mail relay, router. The server drains in-flight requests on Ctrl-C or
//! SIGTERM and closes the pool before exiting.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/taskdesk \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! cargo run -p taskdesk-api
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use taskdesk_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskdesk_shared::{
    auth::{CredentialHasher, MemoryTokenBlacklist, RedisTokenBlacklist, TokenBlacklist, TokenService},
    db::{migrations::run_migrations, pool},
    mail::{HttpMailer, Mailer},
    redis::{RedisClient, RedisConfig},
    services::user::UserServiceDeps,
    store::PgStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MAIL_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Taskdesk API server starting"
    );

    let config = Config::from_env().context("Failed to load configuration")?;

    let db = pool::create_pool(config.database.clone())
        .await
        .context("Failed to connect to the database")?;
    run_migrations(&db)
        .await
        .context("Failed to run database migrations")?;

    let blacklist: Arc<dyn TokenBlacklist> = match &config.redis_url {
        Some(url) => {
            let client = RedisClient::new(RedisConfig::new(url.clone()))
                .await
                .context("Failed to connect to Redis")?;
            Arc::new(RedisTokenBlacklist::new(client))
        }
        None => {
            tracing::warn!("REDIS_URL not set, validation tokens are tracked in process memory");
            Arc::new(MemoryTokenBlacklist::new())
        }
    };

    let mailer: Option<Arc<dyn Mailer>> = match &config.mail {
        Some(mail) => Some(Arc::new(
            HttpMailer::new(mail.clone(), MAIL_TIMEOUT).context("Invalid mail configuration")?,
        )),
        None => {
            tracing::warn!("Mail relay not configured, validation emails are disabled");
            None
        }
    };

    let store = PgStore::new(db.clone());
    let deps = UserServiceDeps {
        users: Arc::new(store.clone()),
        tasks: Arc::new(store),
        hasher: CredentialHasher::new(config.hashing),
        tokens: TokenService::new(
            config.jwt.secret.clone(),
            chrono::Duration::seconds(config.jwt.session_ttl_secs),
            chrono::Duration::seconds(config.jwt.email_ttl_secs),
        ),
        blacklist,
    };

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(config, deps, mailer));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!(address = %bind_address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool::close_pool(db).await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Installs the global subscriber; `LOG_FORMAT=json` switches to JSON lines
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskdesk_api=debug,taskdesk_shared=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
