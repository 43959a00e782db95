//! Cache service trait and error types.

use async_trait::async_trait;
use std::fmt;

use crate::domain::entities::Link;

/// Errors that can occur during cache operations.
#[derive(Debug)]
pub enum CacheError {
    ConnectionError(String),
    OperationError(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Cache connection error: {}", e),
            Self::OperationError(e) => write!(f, "Cache operation error: {}", e),
        }
    }
}

impl std::error::Error for CacheError {}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Read-through cache of link records keyed by short code.
///
/// Only links without a click cap are stored (see [`Link::is_cacheable`]):
/// every other field a redirect decision reads changes only through the API,
/// which invalidates the entry.
///
/// Implementations must be fail-open. A broken backend degrades to database
/// lookups, it never fails a redirect.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache with TTL support
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Returns the cached link for a short code.
    ///
    /// `Ok(None)` on miss, on error and on undecodable entries.
    async fn get_link(&self, code: &str) -> CacheResult<Option<Link>>;

    /// Stores a link with an optional TTL in seconds.
    ///
    /// Implementations ignore links that are not cacheable.
    async fn set_link(&self, link: &Link, ttl_seconds: Option<u64>) -> CacheResult<()>;

    /// Removes a cached link. Used when a link is updated, claimed or deleted.
    async fn invalidate(&self, code: &str) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;
}
