/// Password hashing using Argon2id
///
/// The work factor is configurable so production can run with strong
/// parameters while tests use the cheapest valid ones.
///
/// # Security
///
/// - **Algorithm**: Argon2id (hybrid of Argon2i and Argon2d)
/// - **Defaults**: 64 MB memory, 3 iterations, 4 lanes, 32-byte output
/// - **Salt**: 16 random bytes per hash from the OS RNG
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::password::{CredentialHasher, HashingConfig};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = CredentialHasher::new(HashingConfig::default());
/// let hash = hasher.hash("super_secret_password_123")?;
///
/// assert!(hasher.compare("super_secret_password_123", &hash)?);
/// assert!(!hasher.compare("wrong_password", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use serde::{Deserialize, Serialize};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Argon2id work factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashingConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism (lanes)
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl HashingConfig {
    /// Smallest parameters argon2 accepts; only meant for tests
    pub fn minimal() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Hashes and verifies passwords with a fixed work factor
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    config: HashingConfig,
}

impl CredentialHasher {
    pub fn new(config: HashingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> HashingConfig {
        self.config
    }

    /// Hashes a password
    ///
    /// Returns the PHC string, which embeds algorithm, parameters and salt:
    ///
    /// ```text
    /// $argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHRzYWx0$hash...
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::HashError` if the parameters are invalid or
    /// hashing fails
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let params = ParamsBuilder::new()
            .m_cost(self.config.memory_kib)
            .t_cost(self.config.iterations)
            .p_cost(self.config.parallelism)
            .output_len(32)
            .build()
            .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    /// Verifies a password against a stored hash
    ///
    /// Parameters are read from the hash itself, so hashes produced under an
    /// older work factor keep verifying after the configuration changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the hash cannot be parsed or verification fails
    /// for a reason other than a wrong password
    pub fn compare(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
        }
    }
}
