/// User model
///
/// A registered account. The password is kept only as a bcrypt hash and is
/// never serialized.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     name VARCHAR(120) NOT NULL,
///     email VARCHAR(150) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID (UUID v4, generated by the service)
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Email address, unique across all users
    pub email: String,

    /// bcrypt (or Argon2id PHC) password hash
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,

    /// Password hash (NOT the plaintext password)
    pub password_hash: String,
}

impl User {
    /// Builds a new user record with a fresh ID and timestamps
    pub fn new(data: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    /// Outward representation without credentials or timestamps
    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self)
    }
}

/// Public view of a user, as returned by registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}
