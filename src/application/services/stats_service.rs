//! Click statistics and analytics service.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::domain::entities::{Click, Link};
use crate::domain::repositories::{LinkRepository, StatsFilter, StatsRepository};
use crate::error::AppError;
use crate::utils::destination::referrer_host;

/// Upper bound on click rows fetched for one breakdown.
pub const STATS_MAX_ROWS: i64 = 10_000;

const UNKNOWN: &str = "unknown";
const DIRECT: &str = "direct";

/// One bucket of a breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownEntry {
    pub value: String,
    pub count: u64,
}

/// Click counts grouped by visitor attribute, largest bucket first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Breakdowns {
    pub country: Vec<BreakdownEntry>,
    pub device: Vec<BreakdownEntry>,
    pub os: Vec<BreakdownEntry>,
    pub browser: Vec<BreakdownEntry>,
    pub referrer: Vec<BreakdownEntry>,
    pub variant: Vec<BreakdownEntry>,
    pub utm_source: Vec<BreakdownEntry>,
}

/// Analytics for one link over an optional date range.
#[derive(Debug, Clone)]
pub struct LinkStatsReport {
    pub link: Link,
    /// Stored counter, independent of the range.
    pub total_clicks: i64,
    pub clicks_in_range: i64,
    pub breakdowns: Breakdowns,
    /// `true` when the breakdowns cover only the newest [`STATS_MAX_ROWS`] rows.
    pub truncated: bool,
    pub recent: Vec<Click>,
}

/// Groups clicks by each tracked attribute in a single pass.
///
/// Missing values count as `"unknown"`, a missing referrer as `"direct"`.
/// Clicks that were not part of a split test are left out of `variant`.
pub fn aggregate(clicks: &[Click]) -> Breakdowns {
    let mut country: HashMap<String, u64> = HashMap::new();
    let mut device: HashMap<String, u64> = HashMap::new();
    let mut os: HashMap<String, u64> = HashMap::new();
    let mut browser: HashMap<String, u64> = HashMap::new();
    let mut referrer: HashMap<String, u64> = HashMap::new();
    let mut variant: HashMap<String, u64> = HashMap::new();
    let mut utm_source: HashMap<String, u64> = HashMap::new();

    fn bump(map: &mut HashMap<String, u64>, key: Option<&str>, fallback: &str) {
        *map.entry(key.unwrap_or(fallback).to_string()).or_default() += 1;
    }

    for click in clicks {
        bump(&mut country, click.country_code.as_deref(), UNKNOWN);
        bump(&mut device, Some(click.device.as_str()), UNKNOWN);
        bump(&mut os, click.os.as_deref(), UNKNOWN);
        bump(&mut browser, click.browser.as_deref(), UNKNOWN);
        bump(&mut utm_source, click.utm.source.as_deref(), UNKNOWN);

        let host = click.referrer.as_deref().and_then(referrer_host);
        bump(&mut referrer, host.as_deref(), DIRECT);

        if let Some(id) = click.variant_id.as_deref() {
            bump(&mut variant, Some(id), UNKNOWN);
        }
    }

    Breakdowns {
        country: ranked(country),
        device: ranked(device),
        os: ranked(os),
        browser: ranked(browser),
        referrer: ranked(referrer),
        variant: ranked(variant),
        utm_source: ranked(utm_source),
    }
}

fn ranked(counts: HashMap<String, u64>) -> Vec<BreakdownEntry> {
    let mut entries: Vec<BreakdownEntry> = counts
        .into_iter()
        .map(|(value, count)| BreakdownEntry { value, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    entries
}

/// Service for per-link analytics.
pub struct StatsService<S: StatsRepository, L: LinkRepository> {
    stats_repository: Arc<S>,
    link_repository: Arc<L>,
}

impl<S: StatsRepository, L: LinkRepository> StatsService<S, L> {
    pub fn new(stats_repository: Arc<S>, link_repository: Arc<L>) -> Self {
        Self {
            stats_repository,
            link_repository,
        }
    }

    /// Builds the analytics report of one link.
    ///
    /// `offset`/`limit` page the `recent` clicks; the breakdowns always cover
    /// the whole range (up to [`STATS_MAX_ROWS`]).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no active link matches the code.
    /// Returns [`AppError::Validation`] if `from` is after `to`.
    pub async fn link_stats(
        &self,
        code: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        offset: i64,
        limit: i64,
    ) -> Result<LinkStatsReport, AppError> {
        if let (Some(from), Some(to)) = (from, to)
            && from > to
        {
            return Err(AppError::bad_request(
                "'from' must not be after 'to'",
                json!({ "from": from, "to": to }),
            ));
        }

        let link = self
            .link_repository
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "code": code })))?;

        let clicks_in_range = self
            .stats_repository
            .count_clicks(link.id, from, to)
            .await?;

        let rows = self
            .stats_repository
            .list_clicks(
                link.id,
                StatsFilter::new(0, STATS_MAX_ROWS).with_date_range(from, to),
            )
            .await?;

        let recent = self
            .stats_repository
            .list_clicks(
                link.id,
                StatsFilter::new(offset, limit).with_date_range(from, to),
            )
            .await?;

        Ok(LinkStatsReport {
            total_clicks: link.clicks,
            clicks_in_range,
            breakdowns: aggregate(&rows),
            truncated: clicks_in_range > rows.len() as i64,
            recent,
            link,
        })
    }
}
