//! Service configuration loaded from environment variables.
//!
//! Loaded once at startup (after `dotenvy` has populated the environment) and
//! validated before the server binds.
//!
//! The database and Redis locations may be given either as full URLs
//! (`DATABASE_URL`, `REDIS_URL`) or as components:
//!
//! ```bash
//! export DB_HOST="localhost"
//! export DB_PORT="5432"
//! export DB_USER="postgres"
//! export DB_PASSWORD="password"
//! export DB_NAME="smartlink"
//!
//! export REDIS_HOST="localhost"
//! export REDIS_PORT="6379"
//! export REDIS_PASSWORD=""
//! export REDIS_DB="0"
//! ```
//!
//! ## Optional Variables
//!
//! - `LISTEN` - Bind address (default: `0.0.0.0:3000`)
//! - `PUBLIC_BASE_URL` - Base of generated short URLs, e.g. `https://sl.example`
//! - `RUST_LOG` / `LOG_FORMAT` - Log filter (`info`) and format (`text` | `json`)
//! - `IP_HASH_SECRET` - Key for visitor IP hashing (default: `TOKEN_SIGNING_SECRET`)
//! - `GEOIP_DB_PATH` - MaxMind `.mmdb` file; geo routing is disabled without it
//! - `LOOKUP_TIMEOUT_MS` - Link lookup deadline on the redirect path (default: 2000)
//! - `GUEST_LINK_TTL_HOURS` - Lifetime of unclaimed guest links (default: 24)
//! - `CLICK_QUEUE_CAPACITY` - Click event buffer size (default: 10000, min: 100)

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::application::services::{DEFAULT_GUEST_TTL_HOURS, DEFAULT_LOOKUP_TIMEOUT};

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub listen_addr: String,
    /// Scheme and host used to build `short_url` in API responses.
    /// Destinations pointing at this host are rejected.
    pub public_base_url: Option<String>,
    pub log_level: String,
    pub log_format: String,
    pub click_queue_capacity: usize,
    /// When true, the client IP is read from X-Forwarded-For / X-Real-IP.
    /// Enable only behind a trusted reverse proxy.
    pub behind_proxy: bool,
    /// Default TTL (seconds) for cached links in Redis.
    pub cache_ttl_seconds: u64,
    pub click_worker_concurrency: usize,
    /// HMAC secret used to hash API tokens before storage.
    pub token_signing_secret: String,
    /// HMAC secret used to hash visitor IPs in click events.
    pub ip_hash_secret: String,
    pub geoip_db_path: Option<String>,
    pub lookup_timeout_ms: u64,
    pub guest_link_ttl_hours: i64,

    // PgPool settings
    pub db_max_connections: u32,
    /// Seconds to wait for a pooled connection.
    pub db_connect_timeout: u64,
    pub db_idle_timeout: u64,
    pub db_max_lifetime: u64,
}

/// Reads `key` and parses it, falling back to `default` when absent or malformed.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Reads `key`, treating an empty value as absent.
fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the database location or `TOKEN_SIGNING_SECRET`
    /// is missing.
    pub fn from_env() -> Result<Self> {
        let database_url =
            Self::load_database_url().context("Failed to load database configuration")?;
        let redis_url = Self::load_redis_url();

        let token_signing_secret =
            env::var("TOKEN_SIGNING_SECRET").context("TOKEN_SIGNING_SECRET must be set")?;
        let ip_hash_secret =
            env_opt("IP_HASH_SECRET").unwrap_or_else(|| token_signing_secret.clone());

        let behind_proxy = env::var("BEHIND_PROXY")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Ok(Self {
            database_url,
            redis_url,
            listen_addr: env::var("LISTEN").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            public_base_url: env_opt("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            click_queue_capacity: env_or("CLICK_QUEUE_CAPACITY", 10_000),
            behind_proxy,
            cache_ttl_seconds: env_or("CACHE_TTL_SECONDS", 3600),
            click_worker_concurrency: env_or("CLICK_WORKER_CONCURRENCY", 4),
            token_signing_secret,
            ip_hash_secret,
            geoip_db_path: env_opt("GEOIP_DB_PATH"),
            lookup_timeout_ms: env_or(
                "LOOKUP_TIMEOUT_MS",
                DEFAULT_LOOKUP_TIMEOUT.as_millis() as u64,
            ),
            guest_link_ttl_hours: env_or("GUEST_LINK_TTL_HOURS", DEFAULT_GUEST_TTL_HOURS),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            db_connect_timeout: env_or("DB_CONNECT_TIMEOUT", 30),
            db_idle_timeout: env_or("DB_IDLE_TIMEOUT", 600),
            db_max_lifetime: env_or("DB_MAX_LIFETIME", 1800),
        })
    }

    /// `DATABASE_URL`, or a URL built from `DB_HOST`, `DB_PORT`, `DB_USER`,
    /// `DB_PASSWORD` and `DB_NAME`.
    fn load_database_url() -> Result<String> {
        if let Ok(url) = env::var("DATABASE_URL") {
            return Ok(url);
        }

        let host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
        let user =
            env::var("DB_USER").context("DB_USER must be set when DATABASE_URL is not provided")?;
        let password = env::var("DB_PASSWORD")
            .context("DB_PASSWORD must be set when DATABASE_URL is not provided")?;
        let name =
            env::var("DB_NAME").context("DB_NAME must be set when DATABASE_URL is not provided")?;

        Ok(format!("postgres://{user}:{password}@{host}:{port}/{name}"))
    }

    /// `REDIS_URL`, or a URL built from `REDIS_HOST` and friends.
    ///
    /// Returns `None` when Redis is not configured at all.
    fn load_redis_url() -> Option<String> {
        if let Ok(url) = env::var("REDIS_URL") {
            return Some(url);
        }

        let host = env::var("REDIS_HOST").ok()?;
        let port = env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());
        let db = env::var("REDIS_DB").unwrap_or_else(|_| "0".to_string());

        Some(match env_opt("REDIS_PASSWORD") {
            Some(pwd) => format!("redis://:{pwd}@{host}:{port}/{db}"),
            None => format!("redis://{host}:{port}/{db}"),
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(100..=1_000_000).contains(&self.click_queue_capacity) {
            anyhow::bail!(
                "CLICK_QUEUE_CAPACITY must be between 100 and 1000000, got {}",
                self.click_queue_capacity
            );
        }

        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            );
        }

        if !self.listen_addr.contains(':') {
            anyhow::bail!(
                "LISTEN must be in format 'host:port', got '{}'",
                self.listen_addr
            );
        }

        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            anyhow::bail!(
                "DATABASE_URL must start with 'postgres://' or 'postgresql://', got '{}'",
                mask_connection_string(&self.database_url)
            );
        }

        if let Some(ref redis_url) = self.redis_url
            && !redis_url.starts_with("redis://")
            && !redis_url.starts_with("rediss://")
        {
            anyhow::bail!(
                "REDIS_URL must start with 'redis://' or 'rediss://', got '{}'",
                mask_connection_string(redis_url)
            );
        }

        if let Some(ref base) = self.public_base_url {
            let parsed = url::Url::parse(base)
                .with_context(|| format!("PUBLIC_BASE_URL is not a valid URL: '{base}'"))?;
            if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
                anyhow::bail!("PUBLIC_BASE_URL must be an http(s) URL with a host, got '{base}'");
            }
        }

        if self.cache_ttl_seconds == 0 {
            anyhow::bail!("CACHE_TTL_SECONDS must be greater than 0");
        }

        if self.click_worker_concurrency == 0 || self.click_worker_concurrency > 256 {
            anyhow::bail!(
                "CLICK_WORKER_CONCURRENCY must be between 1 and 256, got {}",
                self.click_worker_concurrency
            );
        }

        if self.token_signing_secret.is_empty() {
            anyhow::bail!("TOKEN_SIGNING_SECRET must not be empty");
        }

        if self.lookup_timeout_ms == 0 {
            anyhow::bail!("LOOKUP_TIMEOUT_MS must be greater than 0");
        }

        if self.guest_link_ttl_hours <= 0 {
            anyhow::bail!(
                "GUEST_LINK_TTL_HOURS must be positive, got {}",
                self.guest_link_ttl_hours
            );
        }

        if self.db_max_connections == 0 {
            anyhow::bail!("DB_MAX_CONNECTIONS must be at least 1");
        }
        if self.db_connect_timeout == 0 {
            anyhow::bail!("DB_CONNECT_TIMEOUT must be greater than 0");
        }

        Ok(())
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.redis_url.is_some()
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn guest_link_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.guest_link_ttl_hours)
    }

    /// Host part of `PUBLIC_BASE_URL`, used to reject self-referencing links.
    pub fn public_host(&self) -> Option<String> {
        self.public_base_url
            .as_deref()
            .and_then(|base| url::Url::parse(base).ok())
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
    }

    /// Logs the configuration with credentials masked.
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Listen address: {}", self.listen_addr);
        tracing::info!("  Database: {}", mask_connection_string(&self.database_url));

        if let Some(ref redis_url) = self.redis_url {
            tracing::info!("  Redis: {} (enabled)", mask_connection_string(redis_url));
        } else {
            tracing::info!("  Redis: disabled");
        }

        tracing::info!(
            "  Public base URL: {}",
            self.public_base_url.as_deref().unwrap_or("(request host)")
        );
        tracing::info!(
            "  GeoIP database: {}",
            self.geoip_db_path.as_deref().unwrap_or("disabled")
        );
        tracing::info!("  Lookup timeout: {}ms", self.lookup_timeout_ms);
        tracing::info!("  Guest link TTL: {}h", self.guest_link_ttl_hours);
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
        tracing::info!("  Click queue capacity: {}", self.click_queue_capacity);
    }
}

/// Replaces the password in a connection URL with `***`.
fn mask_connection_string(url: &str) -> String {
    let Some(start) = url.find("://") else {
        return url.to_string();
    };
    let rest = &url[start + 3..];

    if let Some(at_pos) = rest.find('@') {
        let credentials = &rest[..at_pos];
        if let Some(colon_pos) = credentials.rfind(':') {
            let username = &credentials[..colon_pos];
            return format!("{}://{}:***{}", &url[..start], username, &rest[at_pos..]);
        }
    }

    url.to_string()
}

/// Loads and validates configuration from environment variables.
///
/// Expects the environment to be populated already (`dotenvy::dotenv()` in
/// `main.rs`).
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}
