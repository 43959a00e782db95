//! Repository trait for short link data access.

use crate::domain::entities::{Link, LinkPatch, NewLink};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository interface for managing short links.
///
/// Soft-deleted links are invisible to every read method.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
///
/// # Examples
///
/// See integration tests: `tests/repository_link.rs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Creates a new short link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if an active link already uses the code.
    /// Returns [`AppError::Internal`] on database errors.
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError>;

    /// Finds an active link by its short code.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Link))` if found
    /// - `Ok(None)` if absent or soft-deleted
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] when the pool cannot serve the query.
    /// Returns [`AppError::Internal`] on other database errors.
    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError>;

    /// Atomically adds one to the click counter and stamps `last_clicked_at`.
    ///
    /// Returns `Ok(false)` if the link no longer exists.
    async fn increment_clicks(&self, link_id: i64, at: DateTime<Utc>) -> Result<bool, AppError>;

    /// Lists links, newest first.
    ///
    /// # Arguments
    ///
    /// - `page` - Page number (1-indexed)
    /// - `page_size` - Number of items per page
    /// - `owner_id` - Optional owner filter
    async fn list(
        &self,
        page: i64,
        page_size: i64,
        owner_id: Option<i64>,
    ) -> Result<Vec<Link>, AppError>;

    /// Counts active links, optionally filtered by owner.
    async fn count(&self, owner_id: Option<i64>) -> Result<i64, AppError>;

    /// Soft-deletes a link by setting `deleted_at = now()`.
    ///
    /// Returns `Ok(true)` if the link was found and deleted, `Ok(false)` if not found
    /// or already deleted.
    async fn soft_delete(&self, code: &str) -> Result<bool, AppError>;

    /// Partially updates a link.
    ///
    /// Only fields present in [`LinkPatch`] are modified.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no active link matches `code`.
    async fn update(&self, code: &str, patch: LinkPatch) -> Result<Link, AppError>;

    /// Transfers a live guest link to `owner_id`.
    ///
    /// Matches on the claim token hash, requires the link to still be a guest
    /// link with `expires_at > now`, and consumes the token. Returns `Ok(None)`
    /// when nothing matched.
    async fn claim(
        &self,
        claim_token_hash: &str,
        owner_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Link>, AppError>;

    /// Soft-deletes the guest link holding `code` if it expired before `now`.
    ///
    /// Frees the code for reuse. Returns whether a link was released.
    async fn release_expired_guest_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// Hard-deletes every guest link whose `expires_at` passed.
    ///
    /// Returns the number of removed links.
    async fn purge_expired_guests(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}
