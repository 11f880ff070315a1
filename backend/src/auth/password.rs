//! Password hashing using argon2
//!
//! New hashes are Argon2id PHC strings. Verification also accepts bcrypt
//! hashes so accounts created before the argon2 switch keep working.
//!
//! # Performance Considerations
//!
//! Both algorithms are intentionally CPU-intensive. In async contexts use
//! the `*_async` variants, which run on the blocking thread pool.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::OnceLock;
use thiserror::Error;

/// Throwaway hash verified when no account matches a login
static PLACEHOLDER_HASH: OnceLock<String> = OnceLock::new();

/// Credential hashing failures
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to hash password: {0}")]
    Hashing(String),

    #[error("Invalid hash format: {0}")]
    MalformedHash(String),
}

/// Password hashing service
pub struct PasswordService;

impl PasswordService {
    /// Hash a password using argon2 with a fresh random salt (blocking)
    pub fn hash(password: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| HashError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Hash a password on the blocking thread pool
    pub async fn hash_async(password: String) -> Result<String, HashError> {
        tokio::task::spawn_blocking(move || Self::hash(&password))
            .await
            .map_err(|e| HashError::Hashing(format!("Task join error: {}", e)))?
    }

    /// Verify a password against a stored hash (blocking)
    ///
    /// A mismatch is `Ok(false)`; only an unparseable hash is an error.
    pub fn verify(password: &str, hash: &str) -> Result<bool, HashError> {
        if is_bcrypt(hash) {
            return bcrypt::verify(password, hash)
                .map_err(|e| HashError::MalformedHash(e.to_string()));
        }

        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| HashError::MalformedHash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Verify a password on the blocking thread pool
    pub async fn verify_async(password: String, hash: String) -> Result<bool, HashError> {
        tokio::task::spawn_blocking(move || Self::verify(&password, &hash))
            .await
            .map_err(|e| HashError::Hashing(format!("Task join error: {}", e)))?
    }

    /// Spend one argon2 verification on a placeholder hash
    ///
    /// Called when the account does not exist, so a lookup miss costs about
    /// as much as a wrong password. The result is always discarded.
    pub async fn verify_placeholder_async(password: String) -> Result<(), HashError> {
        tokio::task::spawn_blocking(move || {
            let hash = match PLACEHOLDER_HASH.get() {
                Some(hash) => hash,
                None => {
                    let fresh = Self::hash("placeholder-credential")?;
                    PLACEHOLDER_HASH.get_or_init(|| fresh)
                }
            };
            Self::verify(&password, hash).map(|_| ())
        })
        .await
        .map_err(|e| HashError::Hashing(format!("Task join error: {}", e)))?
    }
}

fn is_bcrypt(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}
