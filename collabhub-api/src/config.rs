/// Configuration management for the API server
///
/// Configuration comes from environment variables, optionally seeded from a
/// `.env` file.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `API_PRODUCTION`: Restricts CORS to `CORS_ORIGINS` (default: false)
/// - `CORS_ORIGINS`: Comma-separated origins, `*` for any (default: *)
/// - `DATABASE_URL`: PostgreSQL connection string; unset selects the in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 characters)
/// - `EXTERNAL_IDENTITY_SECRET`: HMAC key shared with the external sign-in
///   collaborator (at least 32 characters); unset disables `/v1/auth/external`
/// - `SYSTEM_ACCOUNT_EMAIL`: Account that inherits orphaned projects (default: admin@admin.com)
/// - `INVITATION_TTL_DAYS`: Invitation lifetime (default: 3)
/// - `SIGNUP_TOKEN_TTL_MINUTES`: Pending external signup lifetime (default: 30)
/// - `INVITATION_WEBHOOK_URL`: Where invitations are POSTed; unset logs them instead
/// - `INVITATION_WEBHOOK_SECRET`: HMAC key for the webhook signature header
/// - `PUBLIC_BASE_URL`: Base for invitation accept links (default: http://localhost:8080)
///
/// # Example
///
/// ```no_run
/// use collabhub_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::str::FromStr;

use anyhow::Context;
use chrono::Duration;
use collabhub_shared::services::accounts::DEFAULT_SYSTEM_ACCOUNT_EMAIL;
use collabhub_shared::services::ServiceSettings;
use serde::{Deserialize, Serialize};

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,

    /// Absent when running on the in-memory store
    pub database: Option<DatabaseConfig>,

    pub jwt: JwtConfig,

    pub external_identity: ExternalIdentityConfig,

    pub collaboration: CollaborationConfig,

    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    pub production: bool,

    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalIdentityConfig {
    /// Key the sign-in collaborator signs attribute bags with
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationConfig {
    pub system_account_email: String,

    pub invitation_ttl_days: i64,

    pub signup_token_ttl_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub webhook_url: Option<String>,

    pub webhook_secret: Option<String>,

    pub public_base_url: String,
}

fn var_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", name, raw)),
        Err(_) => Ok(default),
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `JWT_SECRET` is missing or shorter than 32 characters
    /// - A numeric or boolean variable cannot be parsed
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = var_or("API_PORT", 8080u16)?;
        let production = var_or("API_PRODUCTION", false)?;
        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let database = match optional_var("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: var_or("DATABASE_MAX_CONNECTIONS", 10u32)?,
            }),
            None => None,
        };

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let external_identity = ExternalIdentityConfig {
            secret: optional_var("EXTERNAL_IDENTITY_SECRET"),
        };
        if external_identity.secret.as_ref().map_or(false, |s| s.len() < 32) {
            anyhow::bail!("EXTERNAL_IDENTITY_SECRET must be at least 32 characters long");
        }

        let collaboration = CollaborationConfig {
            system_account_email: env::var("SYSTEM_ACCOUNT_EMAIL")
                .unwrap_or_else(|_| DEFAULT_SYSTEM_ACCOUNT_EMAIL.to_string()),
            invitation_ttl_days: var_or("INVITATION_TTL_DAYS", 3i64)?,
            signup_token_ttl_minutes: var_or("SIGNUP_TOKEN_TTL_MINUTES", 30i64)?,
        };
        if collaboration.invitation_ttl_days <= 0 || collaboration.signup_token_ttl_minutes <= 0 {
            anyhow::bail!("INVITATION_TTL_DAYS and SIGNUP_TOKEN_TTL_MINUTES must be positive");
        }

        let notifications = NotificationConfig {
            webhook_url: optional_var("INVITATION_WEBHOOK_URL"),
            webhook_secret: optional_var("INVITATION_WEBHOOK_SECRET"),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                production,
                cors_origins,
            },
            database,
            jwt: JwtConfig { secret: jwt_secret },
            external_identity,
            collaboration,
            notifications,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            system_account_email: self.collaboration.system_account_email.clone(),
            invitation_ttl: Duration::days(self.collaboration.invitation_ttl_days),
            signup_ttl: Duration::minutes(self.collaboration.signup_token_ttl_minutes),
        }
    }

    /// Enables external sign-in with the given assertion key
    pub fn with_external_identity_secret(mut self, secret: &str) -> Self {
        self.external_identity.secret = Some(secret.to_string());
        self
    }

    /// Development defaults with the given JWT secret and no database
    pub fn for_secret(secret: &str) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                production: false,
                cors_origins: vec!["*".to_string()],
            },
            database: None,
            jwt: JwtConfig {
                secret: secret.to_string(),
            },
            external_identity: ExternalIdentityConfig::default(),
            collaboration: CollaborationConfig {
                system_account_email: DEFAULT_SYSTEM_ACCOUNT_EMAIL.to_string(),
                invitation_ttl_days: 3,
                signup_token_ttl_minutes: 30,
            },
            notifications: NotificationConfig {
                webhook_url: None,
                webhook_secret: None,
                public_base_url: "http://localhost:8080".to_string(),
            },
        }
    }
}
