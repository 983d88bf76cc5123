/// Configuration management for the API server
///
/// Loads configuration from environment variables (after reading `.env` when
/// present) into typed sub-structs.
///
/// # Environment Variables
///
/// - `APP_ENV`: `production` enables fatal startup failures and HSTS
/// - `API_HOST` / `PORT`: bind address (default `0.0.0.0:3000`)
/// - `JWT_SECRET`: HS256 secret, at least 32 characters (required)
/// - `JWT_EXPIRES_IN`: token lifetime in seconds (default 3600)
/// - `STORE_BACKEND`: `postgres` (default), `mongodb` or `memory`
/// - `DATABASE_URL` / `POSTGRES_URL` or `POSTGRES_HOST`, `_PORT`, `_USER`,
///   `_PASSWORD`, `_DB`: PostgreSQL target
/// - `MONGODB_URI`, `MONGODB_DATABASE`: MongoDB target
/// - `DUAL_WRITE` (alias `MONGODB_DUAL_SYNC`), `SECONDARY_DATABASE_URL`:
///   mirroring
/// - `CORS_ORIGINS`: comma-separated list, `*` for any (default)
///
/// # Example
///
/// ```no_run
/// use taskdock_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;

use anyhow::{bail, Context};
use taskdock_shared::auth::jwt::DEFAULT_EXPIRES_IN_SECS;
use taskdock_shared::db::mongo::MongoConfig;
use taskdock_shared::db::pool::{resolve_tls, DatabaseConfig, PgTarget, SslHints};
use taskdock_shared::services::TokenSettings;
use taskdock_shared::store::connect::{StartupPolicy, StoreTarget};

/// Minimum accepted length of `JWT_SECRET`
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// `APP_ENV=production`
    pub production: bool,

    /// Allowed CORS origins; `["*"]` means any
    pub cors_origins: Vec<String>,
}

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: keep it secret; generate with `openssl rand -hex 32`
    pub secret: String,

    /// Token lifetime in seconds
    pub expires_in: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl JwtConfig {
    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings::new(self.secret.clone(), self.expires_in)
    }
}

/// Where data lives
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub primary: StoreTarget,
    pub secondary: Option<StoreTarget>,
    pub dual_write: bool,
    pub auto_migrate: bool,
}

fn flag(value: Option<String>) -> Option<bool> {
    value.map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
}

fn parse_or<T>(value: Option<String>, default: T, name: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {:?}", name, raw)),
        None => Ok(default),
    }
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if `JWT_SECRET` is missing or too short, or if any
    /// variable has an unparseable value.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from any key lookup
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let production = get("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production"));

        let port = parse_or(get("PORT").or_else(|| get("API_PORT")), 3000u16, "PORT")?;
        let cors_origins = get("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec!["*".to_string()]);

        let secret = get("JWT_SECRET").context("JWT_SECRET environment variable is required")?;
        if secret.len() < MIN_JWT_SECRET_LEN {
            bail!("JWT_SECRET must be at least {} characters long", MIN_JWT_SECRET_LEN);
        }
        let expires_in = parse_or(get("JWT_EXPIRES_IN"), DEFAULT_EXPIRES_IN_SECS, "JWT_EXPIRES_IN")?;
        if expires_in <= 0 {
            bail!("JWT_EXPIRES_IN must be positive");
        }

        let hints = SslHints {
            force: flag(get("POSTGRES_SSL")).unwrap_or(false),
            env_requires: get("PGSSLMODE").is_some_and(|v| v.eq_ignore_ascii_case("require"))
                || flag(get("DATABASE_SSL")).unwrap_or(false),
            reject_unauthorized: flag(get("POSTGRES_SSL_REJECT_UNAUTHORIZED")).unwrap_or(true),
        };
        let postgres = |target: PgTarget| -> anyhow::Result<StoreTarget> {
            let tls = resolve_tls(&target, &hints, production);
            Ok(StoreTarget::Postgres(DatabaseConfig {
                target,
                tls,
                max_connections: parse_or(get("POSTGRES_POOL_SIZE"), 10, "POSTGRES_POOL_SIZE")?,
                connect_timeout_ms: parse_or(
                    get("POSTGRES_CONNECT_TIMEOUT_MS"),
                    5000,
                    "POSTGRES_CONNECT_TIMEOUT_MS",
                )?,
                ..Default::default()
            }))
        };
        let mongo = |uri: String| {
            let mut config = MongoConfig::new(uri);
            config.database = get("MONGODB_DATABASE");
            StoreTarget::Mongo(config)
        };

        let pg_url = get("DATABASE_URL").or_else(|| get("POSTGRES_URL"));
        let pg_target = match pg_url.clone() {
            Some(url) => PgTarget::Url(url),
            None => PgTarget::Parts {
                host: get("POSTGRES_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: parse_or(get("POSTGRES_PORT"), 5432, "POSTGRES_PORT")?,
                user: get("POSTGRES_USER").unwrap_or_else(|| "postgres".to_string()),
                password: get("POSTGRES_PASSWORD").unwrap_or_else(|| "postgres".to_string()),
                database: get("POSTGRES_DB").unwrap_or_else(|| "appdb".to_string()),
            },
        };

        let backend = get("STORE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .to_ascii_lowercase();
        let primary = match backend.as_str() {
            "postgres" | "postgresql" => postgres(pg_target)?,
            "mongodb" | "mongo" => mongo(
                get("MONGODB_URI").context("MONGODB_URI is required when STORE_BACKEND=mongodb")?,
            ),
            "memory" => StoreTarget::Memory,
            other => bail!("STORE_BACKEND must be postgres, mongodb or memory, got {:?}", other),
        };

        let dual_write = flag(get("DUAL_WRITE").or_else(|| get("MONGODB_DUAL_SYNC"))).unwrap_or(false);

        // Without an explicit secondary, mirror into the other backend if it is configured
        let secondary = match get("SECONDARY_DATABASE_URL") {
            Some(url) => Some(secondary_target(url, &postgres, &mongo)?),
            None => match &primary {
                StoreTarget::Postgres(_) => get("MONGODB_URI").map(&mongo),
                StoreTarget::Mongo(_) => pg_url.map(|url| postgres(PgTarget::Url(url))).transpose()?,
                StoreTarget::Memory => None,
            },
        };

        let auto_migrate = flag(get("DATABASE_AUTO_MIGRATE")).unwrap_or(!production);

        Ok(Self {
            api: ApiConfig {
                host: get("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port,
                production,
                cors_origins,
            },
            jwt: JwtConfig { secret, expires_in },
            storage: StorageConfig {
                primary,
                secondary,
                dual_write,
                auto_migrate,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn startup_policy(&self) -> StartupPolicy {
        StartupPolicy {
            production: self.api.production,
            auto_migrate: self.storage.auto_migrate,
        }
    }
}

/// Picks the secondary backend from the URL scheme
fn secondary_target<P, M>(url: String, postgres: &P, mongo: &M) -> anyhow::Result<StoreTarget>
where
    P: Fn(PgTarget) -> anyhow::Result<StoreTarget>,
    M: Fn(String) -> StoreTarget,
{
    let scheme = url.split_once("://").map(|(scheme, _)| scheme.to_ascii_lowercase());
    match scheme.as_deref() {
        Some("postgres" | "postgresql") => postgres(PgTarget::Url(url)),
        Some("mongodb" | "mongodb+srv") => Ok(mongo(url)),
        _ => bail!("SECONDARY_DATABASE_URL must be a postgres:// or mongodb:// URL"),
    }
}
