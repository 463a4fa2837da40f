/// JWT token generation and validation
///
/// Two kinds of token are issued, both HS256-signed:
///
/// - **Session**: carries the user id and role; authenticates API requests
/// - **Email validation**: carries the email address being confirmed; used
///   once through the validation link
///
/// Every token carries a random `jti` so a single token can be blacklisted
/// without affecting others.
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::jwt::{create_token, validate_token, Claims, TokenKind};
/// use taskdesk_shared::models::Role;
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let claims = Claims::session(user_id, Role::Editor, Duration::hours(24));
/// let token = create_token(&claims, "your-secret-key")?;
///
/// let validated = validate_token(&token, "your-secret-key", TokenKind::Session)?;
/// assert_eq!(validated.sub, Some(user_id));
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Role, User};

/// Issuer claim on every token
pub const ISSUER: &str = "taskdesk";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid issuer: expected {expected}, got {actual}")]
    InvalidIssuer { expected: String, actual: String },

    /// Token is valid but of the wrong kind
    #[error("Expected {expected:?} token, got {actual:?}")]
    WrongKind { expected: TokenKind, actual: TokenKind },
}

/// Token kind identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Authenticates API requests
    Session,

    /// Confirms ownership of an email address, single use
    EmailValidation,
}

/// JWT claims structure
///
/// # Standard Claims
///
/// - `sub`: Subject (user ID), session tokens only
/// - `jti`: Unique token ID
/// - `iss`: Issuer (always "taskdesk")
/// - `iat` / `nbf` / `exp`: Issued at, not before, expiry (Unix seconds)
///
/// # Custom Claims
///
/// - `kind`: Session or email validation
/// - `role`: Role at issue time, session tokens only
/// - `email`: Address being confirmed, validation tokens only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<Uuid>,

    pub jti: Uuid,

    pub iss: String,

    pub iat: i64,

    pub exp: i64,

    pub nbf: i64,

    pub kind: TokenKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Claims {
    fn base(kind: TokenKind, expires_in: Duration) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: None,
            jti: Uuid::new_v4(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            kind,
            role: None,
            email: None,
        }
    }

    /// Claims for a session token
    pub fn session(user_id: Uuid, role: Role, expires_in: Duration) -> Self {
        Self {
            sub: Some(user_id),
            role: Some(role),
            ..Self::base(TokenKind::Session, expires_in)
        }
    }

    /// Claims for an email validation token
    pub fn email_validation(email: &str, expires_in: Duration) -> Self {
        Self {
            email: Some(email.to_string()),
            ..Self::base(TokenKind::EmailValidation, expires_in)
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Gets time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now().timestamp();
        if self.exp > now {
            Some(Duration::seconds(self.exp - now))
        } else {
            None
        }
    }
}

/// Signs claims into a compact JWT (HS256)
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a JWT and extracts its claims
///
/// Verifies signature, expiry, not-before, issuer and that the token is of
/// the `expected` kind.
///
/// # Errors
///
/// Returns `JwtError::Expired` for expired tokens, `JwtError::WrongKind`
/// for a token of the other kind, and `JwtError::ValidationError` otherwise
pub fn validate_token(token: &str, secret: &str, expected: TokenKind) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
            expected: ISSUER.to_string(),
            actual: "unknown".to_string(),
        },
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    let claims = token_data.claims;
    if claims.kind != expected {
        return Err(JwtError::WrongKind {
            expected,
            actual: claims.kind,
        });
    }

    Ok(claims)
}

/// Issues and verifies tokens with the server secret and configured lifetimes
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    session_ttl: Duration,
    email_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"***")
            .field("session_ttl", &self.session_ttl)
            .field("email_ttl", &self.email_ttl)
            .finish()
    }
}

impl TokenService {
    pub fn new(secret: impl Into<String>, session_ttl: Duration, email_ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            session_ttl,
            email_ttl,
        }
    }

    /// Signs arbitrary claims
    pub fn generate(&self, claims: &Claims) -> Result<String, JwtError> {
        create_token(claims, &self.secret)
    }

    /// Issues a session token bound to the user's id and current role
    pub fn issue_session(&self, user: &User) -> Result<String, JwtError> {
        self.generate(&Claims::session(user.id, user.role, self.session_ttl))
    }

    /// Issues a single-use email validation token
    pub fn issue_email_validation(&self, email: &str) -> Result<String, JwtError> {
        self.generate(&Claims::email_validation(email, self.email_ttl))
    }

    pub fn verify_session(&self, token: &str) -> Result<Claims, JwtError> {
        validate_token(token, &self.secret, TokenKind::Session)
    }

    pub fn verify_email_validation(&self, token: &str) -> Result<Claims, JwtError> {
        validate_token(token, &self.secret, TokenKind::EmailValidation)
    }

    pub fn email_ttl(&self) -> Duration {
        self.email_ttl
    }
}
