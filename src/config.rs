use std::env;

/// Local fallback for the token signing secret. Never accepted in production.
const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

/// Tokens expire seven days after issue unless JWT_TTL_SECONDS says otherwise.
pub const DEFAULT_JWT_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and
/// shared with handlers and the auth extractor through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. When absent in local mode the in-memory store is used.
    pub db_url: Option<String>,
    // Runtime environment marker. Controls secret fallbacks and log format.
    pub env: Env,
    // HS256 secret used to sign and verify bearer tokens.
    pub jwt_secret: String,
    // Fixed token lifetime. There is no refresh.
    pub jwt_ttl_seconds: u64,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
}

/// Env
///
/// Runtime context: developer conveniences locally, mandatory secrets in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Non-panicking configuration for test state scaffolding.
    fn default() -> Self {
        Self {
            db_url: None,
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            jwt_ttl_seconds: DEFAULT_JWT_TTL_SECONDS,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables at startup.
    ///
    /// # Panics
    /// Panics in production when DATABASE_URL or JWT_SECRET is missing, and in any
    /// environment when JWT_TTL_SECONDS is set but not a positive integer.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let jwt_ttl_seconds = match env::var("JWT_TTL_SECONDS") {
            Ok(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ttl| *ttl > 0)
                .expect("FATAL: JWT_TTL_SECONDS must be a positive integer."),
            Err(_) => DEFAULT_JWT_TTL_SECONDS,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        match env {
            Env::Local => Self {
                env: Env::Local,
                db_url: env::var("DATABASE_URL").ok(),
                jwt_secret: env::var("JWT_SECRET")
                    .unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                jwt_ttl_seconds,
                bind_addr,
            },
            Env::Production => Self {
                env: Env::Production,
                db_url: Some(
                    env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
                ),
                jwt_secret: env::var("JWT_SECRET")
                    .expect("FATAL: JWT_SECRET must be set in production."),
                jwt_ttl_seconds,
                bind_addr,
            },
        }
    }
}
