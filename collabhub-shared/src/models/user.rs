/// User accounts
///
/// A user is identified by a unique, lowercased email address. Users created
/// through an external identity provider carry no password hash; they record
/// the provider tag and the provider-side subject id instead.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE system_role AS ENUM ('USER', 'ADMIN');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     email TEXT NOT NULL UNIQUE,
///     name TEXT NOT NULL,
///     password_hash TEXT,
///     role system_role NOT NULL DEFAULT 'USER',
///     provider TEXT,
///     provider_id TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// System-wide role, independent of any project role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "system_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SystemRole {
    User,
    Admin,
}

impl SystemRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemRole::User => "USER",
            SystemRole::Admin => "ADMIN",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, SystemRole::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Always stored lowercased
    pub email: String,

    /// Display name
    pub name: String,

    /// Argon2id PHC string; `None` for externally authenticated accounts
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    pub role: SystemRole,

    /// External identity provider tag (`google`, `naver`, `kakao`)
    pub provider: Option<String>,

    /// Subject id at the external provider
    pub provider_id: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub role: SystemRole,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
}

impl NewUser {
    /// Builds a local-credential user with role USER
    pub fn local(email: &str, name: &str, password_hash: String) -> Self {
        Self {
            email: normalize_email(email),
            name: name.trim().to_string(),
            password_hash: Some(password_hash),
            role: SystemRole::User,
            provider: None,
            provider_id: None,
        }
    }
}

impl User {
    /// Materializes a stored user from creation input
    pub fn from_new(data: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(&data.email),
            name: data.name,
            password_hash: data.password_hash,
            role: data.role,
            provider: data.provider,
            provider_id: data.provider_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Case-insensitive email comparison
    pub fn has_email(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email.trim())
    }
}

/// Canonical form of an email address for storage and comparison
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
