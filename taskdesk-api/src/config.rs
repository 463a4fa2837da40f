/// Configuration management for the API server
///
/// Configuration is read from environment variables (a `.env` file is
/// honoured in development) into a typed [`Config`].
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default `0.0.0.0:8080`)
/// - `CORS_ORIGINS`: comma separated origins, `*` for any (default `*`)
/// - `PRODUCTION`: enables HSTS (default `false`)
/// - `PUBLIC_URL`: base of email validation links (default `http://localhost:8080`)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`, `DATABASE_CONNECT_TIMEOUT_SECS`,
///   `DATABASE_CONNECT_ATTEMPTS`, `DATABASE_RETRY_BACKOFF_MS`
/// - `JWT_SECRET`: HMAC secret, at least 32 characters (required)
/// - `JWT_SESSION_TTL_SECS`, `JWT_EMAIL_TTL_SECS` (default one day each)
/// - `HASH_MEMORY_KIB`, `HASH_ITERATIONS`, `HASH_PARALLELISM`: Argon2 work factor
/// - `MAIL_ENDPOINT`, `MAIL_API_KEY`, `MAIL_FROM`: all three enable email dispatch
/// - `REDIS_URL`: token blacklist in Redis instead of process memory
///
/// # Example
///
/// ```no_run
/// use taskdesk_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::str::FromStr;

use anyhow::Context;
use taskdesk_shared::auth::HashingConfig;
use taskdesk_shared::db::pool::DatabaseConfig;
use taskdesk_shared::mail::MailConfig;

/// Minimum accepted length of `JWT_SECRET`
pub const MIN_SECRET_LEN: usize = 32;

pub const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400;

/// Upper bound for token lifetimes (one year)
pub const MAX_TOKEN_TTL_SECS: i64 = 31_536_000;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub hashing: HashingConfig,

    /// `None` disables validation emails
    pub mail: Option<MailConfig>,

    /// `None` keeps the token blacklist in memory
    pub redis_url: Option<String>,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode turns on HSTS
    pub production: bool,

    /// Externally visible base URL, used in email links
    pub public_url: String,
}

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for HS256 signing
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub session_ttl_secs: i64,
    pub email_ttl_secs: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("email_ttl_secs", &self.email_ttl_secs)
            .finish()
    }
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api = ApiConfig {
            host: var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&var, "API_PORT", 8080)?,
            cors_origins: var("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| vec!["*".to_string()]),
            production: parse_or(&var, "PRODUCTION", false)?,
            public_url: var("PUBLIC_URL").unwrap_or_else(|| "http://localhost:8080".to_string()),
        };

        let defaults = DatabaseConfig::default();
        let database = DatabaseConfig {
            url: var("DATABASE_URL").context("DATABASE_URL environment variable is required")?,
            max_connections: parse_or(&var, "DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            connect_timeout_seconds: parse_or(
                &var,
                "DATABASE_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_seconds,
            )?,
            connect_attempts: parse_or(&var, "DATABASE_CONNECT_ATTEMPTS", defaults.connect_attempts)?,
            retry_backoff_ms: parse_or(&var, "DATABASE_RETRY_BACKOFF_MS", defaults.retry_backoff_ms)?,
            ..defaults
        };

        let secret = var("JWT_SECRET").context("JWT_SECRET environment variable is required")?;
        if secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_SECRET_LEN);
        }
        let jwt = JwtConfig {
            secret,
            session_ttl_secs: ttl_secs(&var, "JWT_SESSION_TTL_SECS")?,
            email_ttl_secs: ttl_secs(&var, "JWT_EMAIL_TTL_SECS")?,
        };

        let work = HashingConfig::default();
        let hashing = HashingConfig {
            memory_kib: parse_or(&var, "HASH_MEMORY_KIB", work.memory_kib)?,
            iterations: parse_or(&var, "HASH_ITERATIONS", work.iterations)?,
            parallelism: parse_or(&var, "HASH_PARALLELISM", work.parallelism)?,
        };

        let mail = match (var("MAIL_ENDPOINT"), var("MAIL_API_KEY"), var("MAIL_FROM")) {
            (Some(endpoint), Some(api_key), Some(from)) => Some(MailConfig {
                endpoint,
                api_key,
                from,
            }),
            (None, None, None) => None,
            _ => anyhow::bail!("MAIL_ENDPOINT, MAIL_API_KEY and MAIL_FROM must be set together"),
        };

        Ok(Self {
            api,
            database,
            jwt,
            hashing,
            mail,
            redis_url: var("REDIS_URL"),
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

/// Token lifetime in seconds, within `1..=MAX_TOKEN_TTL_SECS`
fn ttl_secs<F>(var: &F, key: &str) -> anyhow::Result<i64>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: i64 = parse_or(var, key, DEFAULT_TOKEN_TTL_SECS)?;
    if !(1..=MAX_TOKEN_TTL_SECS).contains(&secs) {
        anyhow::bail!(
            "{} must be between 1 and {} seconds, got {}",
            key,
            MAX_TOKEN_TTL_SECS,
            secs
        );
    }
    Ok(secs)
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}
