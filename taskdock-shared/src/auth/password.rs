/// Password hashing
///
/// New hashes are bcrypt at cost 10 (`$2b$10$...`), the format user records
/// carry in every deployment of the service. Verification also accepts
/// Argon2id hashes in PHC string format, so both kinds can sit side by side
/// in one store.
///
/// # Example
///
/// ```
/// use taskdock_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("secret123")?;
/// assert!(verify_password("secret123", &hash)?);
/// assert!(!verify_password("secret124", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};

/// bcrypt work factor for new hashes
pub const BCRYPT_COST: u32 = 10;

/// Minimum accepted password length, in characters
pub const MIN_PASSWORD_LEN: usize = 6;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Stored hash is neither bcrypt nor a PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hashes a password with bcrypt at [`BCRYPT_COST`] and a fresh salt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))
}

fn is_bcrypt(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}

/// Verifies a password against a stored bcrypt or Argon2id hash
///
/// Returns `Ok(false)` on mismatch and an error only when the stored hash
/// itself is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    if is_bcrypt(hash) {
        return bcrypt::verify(password, hash)
            .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse bcrypt hash: {}", e)));
    }

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}
