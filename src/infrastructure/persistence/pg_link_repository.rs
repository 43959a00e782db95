//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use sqlx::types::Json;
use std::sync::Arc;

use crate::domain::entities::{
    AbTestConfig, GeoRedirects, Link, LinkPatch, NewLink, SmartRedirects,
};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

const LINK_COLUMNS: &str = "id, code, original_url, smart_redirects, geo_redirects, ab_test, \
     start_date, expiration_date, max_clicks, password_hash, clicks, last_clicked_at, \
     is_guest, claim_token_hash, expires_at, owner_id, created_at, updated_at, deleted_at";

/// Row shape of the `links` table. Routing rules live in JSONB columns.
#[derive(sqlx::FromRow)]
struct LinkRow {
    id: i64,
    code: String,
    original_url: String,
    smart_redirects: Option<Json<SmartRedirects>>,
    geo_redirects: Option<Json<GeoRedirects>>,
    ab_test: Option<Json<AbTestConfig>>,
    start_date: Option<DateTime<Utc>>,
    expiration_date: Option<DateTime<Utc>>,
    max_clicks: Option<i64>,
    password_hash: Option<String>,
    clicks: i64,
    last_clicked_at: Option<DateTime<Utc>>,
    is_guest: bool,
    claim_token_hash: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    owner_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<LinkRow> for Link {
    fn from(r: LinkRow) -> Self {
        Link {
            id: r.id,
            code: r.code,
            original_url: r.original_url,
            smart_redirects: r.smart_redirects.map(|j| j.0),
            geo_redirects: r.geo_redirects.map(|j| j.0),
            ab_test: r.ab_test.map(|j| j.0),
            start_date: r.start_date,
            expiration_date: r.expiration_date,
            max_clicks: r.max_clicks,
            password_hash: r.password_hash,
            clicks: r.clicks,
            last_clicked_at: r.last_clicked_at,
            is_guest: r.is_guest,
            claim_token_hash: r.claim_token_hash,
            expires_at: r.expires_at,
            owner_id: r.owner_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
            deleted_at: r.deleted_at,
        }
    }
}

/// PostgreSQL repository for link storage and retrieval.
///
/// Uses bound parameters throughout; the click counter is only ever changed
/// with a single `UPDATE ... SET clicks = clicks + 1`.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let sql = format!(
            r#"
            INSERT INTO links (
                code, original_url, smart_redirects, geo_redirects, ab_test,
                start_date, expiration_date, max_clicks, password_hash,
                is_guest, claim_token_hash, expires_at, owner_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {LINK_COLUMNS}
            "#
        );

        let row: LinkRow = sqlx::query_as(&sql)
            .bind(&new_link.code)
            .bind(&new_link.original_url)
            .bind(new_link.smart_redirects.map(Json))
            .bind(new_link.geo_redirects.map(Json))
            .bind(new_link.ab_test.map(Json))
            .bind(new_link.start_date)
            .bind(new_link.expiration_date)
            .bind(new_link.max_clicks)
            .bind(new_link.password_hash)
            .bind(new_link.is_guest)
            .bind(new_link.claim_token_hash)
            .bind(new_link.expires_at)
            .bind(new_link.owner_id)
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict { .. } => AppError::conflict(
                    "Short code already exists",
                    json!({ "code": new_link.code }),
                ),
                other => other,
            })?;

        Ok(row.into())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE code = $1 AND deleted_at IS NULL"
        );

        let row: Option<LinkRow> = sqlx::query_as(&sql)
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(Link::from))
    }

    async fn increment_clicks(&self, link_id: i64, at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE links
            SET clicks = clicks + 1,
                last_clicked_at = GREATEST(COALESCE(last_clicked_at, $2), $2)
            WHERE id = $1
            "#,
        )
        .bind(link_id)
        .bind(at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        page: i64,
        page_size: i64,
        owner_id: Option<i64>,
    ) -> Result<Vec<Link>, AppError> {
        let offset = (page.max(1) - 1) * page_size;

        let sql = format!(
            r#"
            SELECT {LINK_COLUMNS}
            FROM links
            WHERE deleted_at IS NULL
              AND ($1::bigint IS NULL OR owner_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        );

        let rows: Vec<LinkRow> = sqlx::query_as(&sql)
            .bind(owner_id)
            .bind(page_size)
            .bind(offset)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn count(&self, owner_id: Option<i64>) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM links
            WHERE deleted_at IS NULL
              AND ($1::bigint IS NULL OR owner_id = $1)
            "#,
        )
        .bind(owner_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn soft_delete(&self, code: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE links
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE code = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(code)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update(&self, code: &str, patch: LinkPatch) -> Result<Link, AppError> {
        let mut tx = self.pool.begin().await?;

        let select = format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE code = $1 AND deleted_at IS NULL FOR UPDATE"
        );
        let row: Option<LinkRow> = sqlx::query_as(&select)
            .bind(code)
            .fetch_optional(&mut *tx)
            .await?;

        let mut link: Link = row
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "code": code })))?
            .into();

        patch.apply_to(&mut link);

        let update = format!(
            r#"
            UPDATE links
            SET original_url = $2,
                smart_redirects = $3,
                geo_redirects = $4,
                ab_test = $5,
                start_date = $6,
                expiration_date = $7,
                max_clicks = $8,
                password_hash = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {LINK_COLUMNS}
            "#
        );
        let row: LinkRow = sqlx::query_as(&update)
            .bind(link.id)
            .bind(&link.original_url)
            .bind(link.smart_redirects.map(Json))
            .bind(link.geo_redirects.map(Json))
            .bind(link.ab_test.map(Json))
            .bind(link.start_date)
            .bind(link.expiration_date)
            .bind(link.max_clicks)
            .bind(link.password_hash)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    async fn claim(
        &self,
        claim_token_hash: &str,
        owner_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Link>, AppError> {
        let sql = format!(
            r#"
            UPDATE links
            SET owner_id = $2,
                is_guest = FALSE,
                expires_at = NULL,
                claim_token_hash = NULL,
                updated_at = NOW()
            WHERE claim_token_hash = $1
              AND is_guest
              AND expires_at > $3
              AND deleted_at IS NULL
            RETURNING {LINK_COLUMNS}
            "#
        );

        let row: Option<LinkRow> = sqlx::query_as(&sql)
            .bind(claim_token_hash)
            .bind(owner_id)
            .bind(now)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(Link::from))
    }

    async fn release_expired_guest_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE links
            SET deleted_at = $2, updated_at = $2
            WHERE code = $1
              AND deleted_at IS NULL
              AND is_guest
              AND expires_at <= $2
            "#,
        )
        .bind(code)
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired_guests(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM links WHERE is_guest AND expires_at <= $1")
            .bind(now)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected())
    }
}
