//! PostgreSQL implementation of stats repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Click, NewClick, UtmParams};
use crate::domain::repositories::{StatsFilter, StatsRepository};
use crate::error::AppError;

const CLICK_COLUMNS: &str = "id, link_id, clicked_at, referrer, device, os, browser, \
     country, country_code, city, utm_source, utm_medium, utm_campaign, utm_term, \
     utm_content, ip_hash, variant_id";

#[derive(sqlx::FromRow)]
struct ClickRow {
    id: i64,
    link_id: i64,
    clicked_at: DateTime<Utc>,
    referrer: Option<String>,
    device: String,
    os: Option<String>,
    browser: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
    city: Option<String>,
    utm_source: Option<String>,
    utm_medium: Option<String>,
    utm_campaign: Option<String>,
    utm_term: Option<String>,
    utm_content: Option<String>,
    ip_hash: Option<String>,
    variant_id: Option<String>,
}

impl From<ClickRow> for Click {
    fn from(r: ClickRow) -> Self {
        Click {
            id: r.id,
            link_id: r.link_id,
            clicked_at: r.clicked_at,
            referrer: r.referrer,
            device: r.device,
            os: r.os,
            browser: r.browser,
            country: r.country,
            country_code: r.country_code,
            city: r.city,
            utm: UtmParams {
                source: r.utm_source,
                medium: r.utm_medium,
                campaign: r.utm_campaign,
                term: r.utm_term,
                content: r.utm_content,
            },
            ip_hash: r.ip_hash,
            variant_id: r.variant_id,
        }
    }
}

/// PostgreSQL repository for click events.
pub struct PgStatsRepository {
    pool: Arc<PgPool>,
}

impl PgStatsRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsRepository for PgStatsRepository {
    async fn record_click(&self, new_click: NewClick) -> Result<Click, AppError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO link_clicks (
                link_id, clicked_at, referrer, device, os, browser,
                country, country_code, city,
                utm_source, utm_medium, utm_campaign, utm_term, utm_content,
                ip_hash, variant_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING id
            "#,
        )
        .bind(new_click.link_id)
        .bind(new_click.clicked_at)
        .bind(&new_click.referrer)
        .bind(&new_click.device)
        .bind(&new_click.os)
        .bind(&new_click.browser)
        .bind(&new_click.country)
        .bind(&new_click.country_code)
        .bind(&new_click.city)
        .bind(&new_click.utm.source)
        .bind(&new_click.utm.medium)
        .bind(&new_click.utm.campaign)
        .bind(&new_click.utm.term)
        .bind(&new_click.utm.content)
        .bind(&new_click.ip_hash)
        .bind(&new_click.variant_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(new_click.into_click(id))
    }

    async fn list_clicks(
        &self,
        link_id: i64,
        filter: StatsFilter,
    ) -> Result<Vec<Click>, AppError> {
        let sql = format!(
            r#"
            SELECT {CLICK_COLUMNS}
            FROM link_clicks
            WHERE link_id = $1
              AND ($2::timestamptz IS NULL OR clicked_at >= $2)
              AND ($3::timestamptz IS NULL OR clicked_at <= $3)
            ORDER BY clicked_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#
        );

        let rows: Vec<ClickRow> = sqlx::query_as(&sql)
            .bind(link_id)
            .bind(filter.from_date)
            .bind(filter.to_date)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().map(Click::from).collect())
    }

    async fn count_clicks(
        &self,
        link_id: i64,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM link_clicks
            WHERE link_id = $1
              AND ($2::timestamptz IS NULL OR clicked_at >= $2)
              AND ($3::timestamptz IS NULL OR clicked_at <= $3)
            "#,
        )
        .bind(link_id)
        .bind(from_date)
        .bind(to_date)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }
}
