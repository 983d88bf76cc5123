/// Authentication primitives for TaskDock
///
/// # Modules
///
/// - [`password`]: bcrypt password hashing and verification
/// - [`jwt`]: HS256 token issuance and validation
/// - [`middleware`]: bearer-token middleware and the `AuthContext` extractor
///
/// # Example
///
/// ```no_run
/// use taskdock_shared::auth::password::{hash_password, verify_password};
/// use taskdock_shared::auth::jwt::{create_token, validate_token, Claims};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("secret123")?;
/// assert!(verify_password("secret123", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), "ana@example.com", Duration::hours(1));
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
