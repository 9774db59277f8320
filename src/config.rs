use std::env;

/// Development-only signing secret. Never accepted in `Env::Production`.
const LOCAL_JWT_SECRET: &str = "food-delivery-local-development-secret";
const DEFAULT_DB_URL: &str = "sqlite://food_delivery.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5001";
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// AppConfig
///
/// Holds the service's entire configuration. It is loaded once at startup, never mutated
/// afterwards, and handed to the rest of the application through `AppState`. Extractors pull
/// it back out with `FromRef`, so nothing in the crate reads the environment after `load`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // SQLite connection string.
    pub db_url: String,
    // Upper bound on pooled database connections.
    pub max_connections: u32,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Runtime environment marker. Controls log format and which secrets are mandatory.
    pub env: Env,
    // HS256 secret used to sign and verify bearer tokens.
    pub jwt_secret: String,
    // Lifetime of an issued token.
    pub token_ttl_hours: i64,
}

/// Env
///
/// Runtime context: relaxed defaults for local development, mandatory secrets in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking values for test scaffolding.
    fn default() -> Self {
        Self {
            db_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            bind_addr: "127.0.0.1:0".to_string(),
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables (call `dotenv` first).
    ///
    /// # Panics
    /// Panics in `Env::Production` when `DATABASE_URL` or `JWT_SECRET` is missing, so the
    /// service never starts with a development secret or an implicit database file.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let (db_url, jwt_secret) = match env {
            Env::Production => (
                env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in production"),
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production."),
            ),
            Env::Local => (
                env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DB_URL.to_string()),
                env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        Self {
            db_url,
            max_connections: parse_positive("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            env,
            jwt_secret,
            token_ttl_hours: parse_positive("TOKEN_TTL_HOURS").unwrap_or(DEFAULT_TOKEN_TTL_HOURS),
        }
    }
}

// Unset, unparsable and non-positive values all fall back to the caller's default.
fn parse_positive<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<T>().ok())
        .filter(|value| *value > T::default())
}
