//! Server configuration from the environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | `postgres://localhost/rebate` |
//! | `HOST` / `PORT` | `0.0.0.0` / `3000` |
//! | `ISSUER_URL` | `http://localhost:3000` |
//! | `OAUTH_SECRET` | required unless `OAUTH_SECRET_FILE` is set; base64, 32+ bytes |
//! | `OAUTH_SECRET_FILE` | path to a base64 keyfile |
//! | `CLEANUP_INTERVAL_SECS` | 3600; 0 disables the cleanup task |
//! | `DB_MAX_CONNECTIONS` / `DB_MIN_CONNECTIONS` | 20 / 1 |
//! | `DB_ACQUIRE_TIMEOUT_MS` | 5000 |
//! | `DB_STATEMENT_TIMEOUT_MS` | 30000; 0 leaves the server default |
//! | `DB_IDLE_IN_TRANSACTION_TIMEOUT_MS` | 10000; 0 leaves the server default |
//!
//! Rotating the OAuth secret invalidates every outstanding access token and
//! refresh token at once.

use std::path::Path;
use std::time::Duration;

use rebate_core::defaults::CLEANUP_INTERVAL_SECS;
use rebate_core::{Error, Result};
use rebate_crypto::AppSecret;
use rebate_db::PoolConfig;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/rebate";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_ISSUER_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Public base URL; also the `iss` claim.
    pub issuer_url: String,
    pub secret: AppSecret,
    pub cleanup_interval: Option<Duration>,
    pub pool: PoolConfig,
}

impl ServerConfig {
    /// Read from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret = match (lookup("OAUTH_SECRET"), lookup("OAUTH_SECRET_FILE")) {
            (Some(encoded), _) => AppSecret::from_base64(encoded.trim())
                .map_err(|e| Error::Config(format!("OAUTH_SECRET: {}", e)))?,
            (None, Some(path)) => AppSecret::load_keyfile(Path::new(&path))
                .map_err(|e| Error::Config(format!("OAUTH_SECRET_FILE {}: {}", path, e)))?,
            (None, None) => {
                return Err(Error::Config(
                    "OAUTH_SECRET or OAUTH_SECRET_FILE must be set".to_string(),
                ))
            }
        };

        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let cleanup_secs: u64 = parse_or(&lookup, "CLEANUP_INTERVAL_SECS", CLEANUP_INTERVAL_SECS)?;
        let pool = pool_config(&lookup)?;

        let issuer_url = lookup("ISSUER_URL")
            .unwrap_or_else(|| DEFAULT_ISSUER_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if issuer_url.is_empty() {
            return Err(Error::Config("ISSUER_URL must not be empty".to_string()));
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            issuer_url,
            secret,
            cleanup_interval: (cleanup_secs > 0).then(|| Duration::from_secs(cleanup_secs)),
            pool,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn pool_config(lookup: &impl Fn(&str) -> Option<String>) -> Result<PoolConfig> {
    let defaults = PoolConfig::default();
    let millis = |key: &str, default: Option<Duration>| -> Result<Option<Duration>> {
        let default_ms = default.map_or(0, |d| d.as_millis() as u64);
        let ms: u64 = parse_or(lookup, key, default_ms)?;
        Ok((ms > 0).then(|| Duration::from_millis(ms)))
    };

    let config = PoolConfig {
        max_connections: parse_or(lookup, "DB_MAX_CONNECTIONS", defaults.max_connections)?,
        min_connections: parse_or(lookup, "DB_MIN_CONNECTIONS", defaults.min_connections)?,
        acquire_timeout: millis("DB_ACQUIRE_TIMEOUT_MS", Some(defaults.acquire_timeout))?
            .unwrap_or(Duration::ZERO),
        statement_timeout: millis("DB_STATEMENT_TIMEOUT_MS", defaults.statement_timeout)?,
        idle_in_transaction_timeout: millis(
            "DB_IDLE_IN_TRANSACTION_TIMEOUT_MS",
            defaults.idle_in_transaction_timeout,
        )?,
    };
    config.validate()?;
    Ok(config)
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} is not valid: {:?}", key, raw))),
        None => Ok(default),
    }
}
