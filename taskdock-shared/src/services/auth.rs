//! Registration, login and token verification

use chrono::Duration;
use tracing::{info, instrument, warn};

use crate::auth::jwt::{create_token, validate_token, Claims, DEFAULT_EXPIRES_IN_SECS};
use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::error::{ServiceError, ServiceResult};
use crate::models::user::{NewUser, User};
use crate::store::DualWrite;

/// Minimum name length, in characters
pub const MIN_NAME_LEN: usize = 3;

/// Token signing settings
#[derive(Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub expires_in: Duration,
}

impl TokenSettings {
    pub fn new(secret: impl Into<String>, expires_in_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            expires_in: Duration::seconds(expires_in_secs),
        }
    }
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self::new(String::new(), DEFAULT_EXPIRES_IN_SECS)
    }
}

/// Loose `local@host.tld` check; no whitespace anywhere
pub fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !local.is_empty() && !host.is_empty() && !tld.is_empty()
}

#[derive(Clone)]
pub struct AuthService {
    stores: DualWrite,
    tokens: TokenSettings,
}

impl AuthService {
    pub fn new(stores: DualWrite, tokens: TokenSettings) -> Self {
        Self { stores, tokens }
    }

    /// Creates an account
    ///
    /// # Errors
    ///
    /// - `UnprocessableEntity` for a short name, malformed email or short password
    /// - `Conflict` if the email is already registered
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> ServiceResult<User> {
        if name.chars().count() < MIN_NAME_LEN {
            return Err(ServiceError::UnprocessableEntity(format!(
                "Name must be at least {} characters",
                MIN_NAME_LEN
            )));
        }
        if !looks_like_email(email) {
            return Err(ServiceError::UnprocessableEntity("Invalid email".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::UnprocessableEntity(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let primary = self.stores.primary();
        if primary.find_user_by_email(email).await?.is_some() {
            return Err(ServiceError::Conflict("Email already in use".to_string()));
        }

        let user = User::new(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
        });
        primary.insert_user(&user).await?;

        info!(user_id = %user.id, "user registered");

        let record = &user;
        self.stores
            .mirror("insert_user", |store| async move { store.insert_user(record).await })
            .await;

        Ok(user)
    }

    /// Checks credentials and issues a signed token
    ///
    /// # Errors
    ///
    /// - `BadRequest` for a malformed email or empty password
    /// - `NotFound` when no account has this email
    /// - `Unauthorized` when the password does not match
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<String> {
        if !looks_like_email(email) {
            return Err(ServiceError::BadRequest("Invalid email".to_string()));
        }
        if password.is_empty() {
            return Err(ServiceError::BadRequest("Password is required".to_string()));
        }

        let user = self
            .stores
            .primary()
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(ServiceError::Unauthorized("Invalid password".to_string()));
        }

        let claims = Claims::new(user.id, user.email.clone(), self.tokens.expires_in);
        let token = create_token(&claims, &self.tokens.secret)?;

        info!(user_id = %user.id, "user logged in");
        Ok(token)
    }

    /// Decodes a token; `None` on any verification failure
    pub fn verify_token(&self, token: &str) -> Option<Claims> {
        validate_token(token, &self.tokens.secret).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("ana@example.com"));
        assert!(looks_like_email("a.b+c@sub.example.co"));
        assert!(!looks_like_email("ana@example"));
        assert!(!looks_like_email("ana.example.com"));
        assert!(!looks_like_email("ana @example.com"));
        assert!(!looks_like_email(""));
    }

    #[test]
    fn test_token_settings_debug_hides_secret() {
        let settings = TokenSettings::new("super-secret-value-of-32-characters", 60);
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
