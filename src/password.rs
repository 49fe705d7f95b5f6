//! Password hashing with bcrypt.
//!
//! bcrypt is deliberately slow, so callers in async code go through
//! [`hash_password`] and [`verify_password`], which run on the blocking pool.

use rand::{Rng, distr::Alphanumeric};

/// Default bcrypt cost for new password hashes.
pub const DEFAULT_PASSWORD_COST: u32 = 11;

/// Length of generated bootstrap passwords.
const GENERATED_PASSWORD_LENGTH: usize = 20;

/// Hash a password with the given bcrypt cost.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|_| PasswordError::TaskFailed)?
        .map_err(PasswordError::Bcrypt)
}

/// Verify a password against a stored bcrypt hash.
/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let result = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|_| PasswordError::TaskFailed)?;

    Ok(result.unwrap_or(false))
}

/// Generate a random alphanumeric password.
pub fn generate_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Errors that can occur while hashing or verifying passwords.
#[derive(Debug)]
pub enum PasswordError {
    /// bcrypt rejected the input or cost
    Bcrypt(bcrypt::BcryptError),
    /// The blocking task panicked or was cancelled
    TaskFailed,
}

impl std::fmt::Display for PasswordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PasswordError::Bcrypt(e) => write!(f, "Password hashing failed: {}", e),
            PasswordError::TaskFailed => write!(f, "Password hashing task failed"),
        }
    }
}

impl std::error::Error for PasswordError {}
