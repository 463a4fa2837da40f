/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: session and email validation tokens
/// - [`blacklist`]: single-use enforcement for validation tokens
/// - [`authorization`]: the mutation decision table and its resolvers
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::password::{CredentialHasher, HashingConfig};
/// use taskdesk_shared::auth::jwt::TokenService;
/// use chrono::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = CredentialHasher::new(HashingConfig::minimal());
/// let hash = hasher.hash("user_password")?;
/// assert!(hasher.compare("user_password", &hash)?);
///
/// let tokens = TokenService::new("secret-key", Duration::hours(24), Duration::hours(24));
/// let token = tokens.issue_email_validation("someone@example.com")?;
/// assert!(tokens.verify_email_validation(&token).is_ok());
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod blacklist;
pub mod jwt;
pub mod password;

pub use authorization::Principal;
pub use blacklist::{MemoryTokenBlacklist, RedisTokenBlacklist, TokenBlacklist};
pub use jwt::TokenService;
pub use password::{CredentialHasher, HashingConfig};
