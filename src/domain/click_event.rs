//! Click event model for asynchronous click tracking.

use chrono::{DateTime, Utc};

use crate::domain::entities::{NewClick, UtmParams};
use crate::domain::visitor::VisitorProfile;

/// A redirect that should be recorded, as handed to the click worker.
///
/// Built by the resolver after the redirect decision and sent through a
/// bounded channel, so the HTTP response never waits on the database.
/// Carries only a hashed IP.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickEvent {
    pub link_id: i64,
    pub timestamp: DateTime<Utc>,
    pub referrer: Option<String>,
    pub device: String,
    pub os: Option<String>,
    pub browser: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub city: Option<String>,
    pub utm: UtmParams,
    pub ip_hash: Option<String>,
    pub variant_id: Option<String>,
}

impl ClickEvent {
    /// Assembles an event from the resolved visitor profile.
    ///
    /// An empty referrer is stored as `None`.
    pub fn new(
        link_id: i64,
        timestamp: DateTime<Utc>,
        referrer: &str,
        visitor: VisitorProfile,
        utm: UtmParams,
        ip_hash: Option<String>,
        variant_id: Option<String>,
    ) -> Self {
        let referrer = Some(referrer.trim())
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        Self {
            link_id,
            timestamp,
            referrer,
            device: visitor.device.device,
            os: visitor.device.os,
            browser: visitor.device.browser,
            country: visitor.geo.country,
            country_code: visitor.geo.country_code,
            city: visitor.geo.city,
            utm,
            ip_hash,
            variant_id,
        }
    }
}

impl From<ClickEvent> for NewClick {
    fn from(ev: ClickEvent) -> Self {
        NewClick {
            link_id: ev.link_id,
            clicked_at: ev.timestamp,
            referrer: ev.referrer,
            device: ev.device,
            os: ev.os,
            browser: ev.browser,
            country: ev.country,
            country_code: ev.country_code,
            city: ev.city,
            utm: ev.utm,
            ip_hash: ev.ip_hash,
            variant_id: ev.variant_id,
        }
    }
}
