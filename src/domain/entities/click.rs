//! Click entity representing a single recorded redirect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// UTM campaign parameters carried on the incoming short-link request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmParams {
    pub source: Option<String>,
    pub medium: Option<String>,
    pub campaign: Option<String>,
    pub term: Option<String>,
    pub content: Option<String>,
}

impl UtmParams {
    pub fn is_empty(&self) -> bool {
        self.source.is_none()
            && self.medium.is_none()
            && self.campaign.is_none()
            && self.term.is_none()
            && self.content.is_none()
    }
}

/// A click recorded when a short link redirected a visitor.
///
/// Visitor metadata is already parsed; the raw IP address is never stored,
/// only its keyed hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Click {
    pub id: i64,
    pub link_id: i64,
    pub clicked_at: DateTime<Utc>,
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

/// Input data for recording a new click.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClick {
    pub link_id: i64,
    pub clicked_at: DateTime<Utc>,
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

impl NewClick {
    /// Attaches the database-assigned id, producing the stored [`Click`].
    pub fn into_click(self, id: i64) -> Click {
        Click {
            id,
            link_id: self.link_id,
            clicked_at: self.clicked_at,
            referrer: self.referrer,
            device: self.device,
            os: self.os,
            browser: self.browser,
            country: self.country,
            country_code: self.country_code,
            city: self.city,
            utm: self.utm,
            ip_hash: self.ip_hash,
            variant_id: self.variant_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utm_is_empty() {
        assert!(UtmParams::default().is_empty());

        let utm = UtmParams {
            campaign: Some("launch".to_string()),
            ..Default::default()
        };
        assert!(!utm.is_empty());
    }

    #[test]
    fn test_new_click_into_click() {
        let now = Utc::now();
        let new_click = NewClick {
            link_id: 99,
            clicked_at: now,
            referrer: Some("https://instagram.com".to_string()),
            device: "smartphone".to_string(),
            os: Some("iPhone".to_string()),
            browser: Some("Safari".to_string()),
            country: Some("India".to_string()),
            country_code: Some("IN".to_string()),
            city: None,
            utm: UtmParams::default(),
            ip_hash: Some("ab".repeat(32)),
            variant_id: None,
        };

        let click = new_click.into_click(7);

        assert_eq!(click.id, 7);
        assert_eq!(click.link_id, 99);
        assert_eq!(click.clicked_at, now);
        assert_eq!(click.country_code.as_deref(), Some("IN"));
    }
}
