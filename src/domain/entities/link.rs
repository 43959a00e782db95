//! Link entity and its routing rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Platform class a visitor's user agent resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Desktop,
    Unknown,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Desktop => "desktop",
            Platform::Unknown => "unknown",
        }
    }
}

/// Per-platform destination overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartRedirects {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop: Option<String>,
}

impl SmartRedirects {
    /// Returns the override for `platform`, if one is configured.
    ///
    /// [`Platform::Unknown`] never matches.
    pub fn for_platform(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Ios => self.ios.as_deref(),
            Platform::Android => self.android.as_deref(),
            Platform::Desktop => self.desktop.as_deref(),
            Platform::Unknown => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ios.is_none() && self.android.is_none() && self.desktop.is_none()
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        [&self.ios, &self.android, &self.desktop]
            .into_iter()
            .filter_map(|u| u.as_deref())
    }
}

/// One weighted alternative destination of a split test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbVariant {
    pub id: String,
    pub url: String,
    /// Relative weight. Values `<= 0` never win unless every weight is `<= 0`.
    pub weight: i64,
}

/// Split-test configuration attached to a link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbTestConfig {
    pub enabled: bool,
    #[serde(default)]
    pub variants: Vec<AbVariant>,
}

impl AbTestConfig {
    /// Returns `true` when the test overrides every other routing rule.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.variants.is_empty()
    }
}

/// Country code (ISO 3166-1 alpha-2, upper case) to destination URL.
pub type GeoRedirects = BTreeMap<String, String>;

/// A short link with its routing rules, limits and guest metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: i64,
    pub code: String,
    pub original_url: String,
    pub smart_redirects: Option<SmartRedirects>,
    pub geo_redirects: Option<GeoRedirects>,
    pub ab_test: Option<AbTestConfig>,
    pub start_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub max_clicks: Option<i64>,
    /// Argon2id PHC string. The plaintext password is never stored.
    pub password_hash: Option<String>,
    pub clicks: i64,
    pub last_clicked_at: Option<DateTime<Utc>>,
    pub is_guest: bool,
    pub claim_token_hash: Option<String>,
    /// Guest-only expiry, independent of `expiration_date`.
    pub expires_at: Option<DateTime<Utc>>,
    pub owner_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Link {
    /// Creates a plain link pointing at `original_url` with no rules attached.
    pub fn new(id: i64, code: String, original_url: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            code,
            original_url,
            smart_redirects: None,
            geo_redirects: None,
            ab_test: None,
            start_date: None,
            expiration_date: None,
            max_clicks: None,
            password_hash: None,
            clicks: 0,
            last_clicked_at: None,
            is_guest: false,
            claim_token_hash: None,
            expires_at: None,
            owner_id: None,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Guest links stop resolving once their guest TTL elapses.
    pub fn is_guest_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_guest && self.expires_at.is_some_and(|at| now >= at)
    }

    /// Returns `true` when `now` falls outside `[start_date, expiration_date]`.
    pub fn is_outside_window(&self, now: DateTime<Utc>) -> bool {
        self.start_date.is_some_and(|start| now < start)
            || self.expiration_date.is_some_and(|end| now > end)
    }

    pub fn is_click_limit_reached(&self) -> bool {
        self.max_clicks.is_some_and(|max| self.clicks >= max)
    }

    pub fn is_password_protected(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Whether the full record may be served from cache.
    ///
    /// Capped links need the live counter on every lookup.
    pub fn is_cacheable(&self) -> bool {
        self.max_clicks.is_none()
    }
}

/// Input data for creating a new link.
#[derive(Debug, Clone, Default)]
pub struct NewLink {
    pub code: String,
    pub original_url: String,
    pub smart_redirects: Option<SmartRedirects>,
    pub geo_redirects: Option<GeoRedirects>,
    pub ab_test: Option<AbTestConfig>,
    pub start_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub max_clicks: Option<i64>,
    pub password_hash: Option<String>,
    pub is_guest: bool,
    pub claim_token_hash: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub owner_id: Option<i64>,
}

/// Partial update for an existing link.
///
/// `None` fields are left unchanged. For the double options, `Some(None)`
/// clears the stored value and `Some(Some(v))` replaces it.
#[derive(Debug, Clone, Default)]
pub struct LinkPatch {
    pub original_url: Option<String>,
    pub smart_redirects: Option<Option<SmartRedirects>>,
    pub geo_redirects: Option<Option<GeoRedirects>>,
    pub ab_test: Option<Option<AbTestConfig>>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub expiration_date: Option<Option<DateTime<Utc>>>,
    pub max_clicks: Option<Option<i64>>,
    pub password_hash: Option<Option<String>>,
}

impl LinkPatch {
    pub fn is_empty(&self) -> bool {
        self.original_url.is_none()
            && self.smart_redirects.is_none()
            && self.geo_redirects.is_none()
            && self.ab_test.is_none()
            && self.start_date.is_none()
            && self.expiration_date.is_none()
            && self.max_clicks.is_none()
            && self.password_hash.is_none()
    }

    /// Applies the patch to an in-memory copy of a link.
    pub fn apply_to(self, link: &mut Link) {
        if let Some(url) = self.original_url {
            link.original_url = url;
        }
        if let Some(v) = self.smart_redirects {
            link.smart_redirects = v;
        }
        if let Some(v) = self.geo_redirects {
            link.geo_redirects = v;
        }
        if let Some(v) = self.ab_test {
            link.ab_test = v;
        }
        if let Some(v) = self.start_date {
            link.start_date = v;
        }
        if let Some(v) = self.expiration_date {
            link.expiration_date = v;
        }
        if let Some(v) = self.max_clicks {
            link.max_clicks = v;
        }
        if let Some(v) = self.password_hash {
            link.password_hash = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn link() -> Link {
        Link::new(
            1,
            "abc123".to_string(),
            "https://example.com".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn test_link_creation() {
        let link = link();

        assert_eq!(link.code, "abc123");
        assert_eq!(link.clicks, 0);
        assert!(!link.is_deleted());
        assert!(!link.is_guest);
        assert!(link.is_cacheable());
    }

    #[test]
    fn test_guest_expiry_boundary() {
        let now = Utc::now();
        let mut link = link();
        link.is_guest = true;
        link.expires_at = Some(now);

        assert!(!link.is_guest_expired(now - Duration::milliseconds(1)));
        assert!(link.is_guest_expired(now));
        assert!(link.is_guest_expired(now + Duration::seconds(1)));
    }

    #[test]
    fn test_guest_expiry_ignored_for_owned_links() {
        let now = Utc::now();
        let mut link = link();
        link.expires_at = Some(now - Duration::hours(1));

        assert!(!link.is_guest_expired(now));
    }

    #[test]
    fn test_window_is_inclusive() {
        let now = Utc::now();
        let mut link = link();
        link.start_date = Some(now);
        link.expiration_date = Some(now);

        assert!(!link.is_outside_window(now));
        assert!(link.is_outside_window(now - Duration::milliseconds(1)));
        assert!(link.is_outside_window(now + Duration::milliseconds(1)));
    }

    #[test]
    fn test_click_limit() {
        let mut link = link();
        link.max_clicks = Some(2);
        link.clicks = 1;
        assert!(!link.is_click_limit_reached());

        link.clicks = 2;
        assert!(link.is_click_limit_reached());
        assert!(!link.is_cacheable());
    }

    #[test]
    fn test_smart_redirects_for_platform() {
        let smart = SmartRedirects {
            ios: Some("https://apps.apple.com/x".to_string()),
            android: None,
            desktop: Some("https://example.com/desktop".to_string()),
        };

        assert_eq!(
            smart.for_platform(Platform::Ios),
            Some("https://apps.apple.com/x")
        );
        assert_eq!(smart.for_platform(Platform::Android), None);
        assert_eq!(smart.for_platform(Platform::Unknown), None);
        assert_eq!(smart.urls().count(), 2);
    }

    #[test]
    fn test_ab_test_active_requires_variants() {
        let mut config = AbTestConfig {
            enabled: true,
            variants: vec![],
        };
        assert!(!config.is_active());

        config.variants.push(AbVariant {
            id: "a".to_string(),
            url: "https://a.example.com".to_string(),
            weight: 1,
        });
        assert!(config.is_active());

        config.enabled = false;
        assert!(!config.is_active());
    }

    #[test]
    fn test_patch_apply_clears_and_sets() {
        let mut link = link();
        link.max_clicks = Some(10);
        link.password_hash = Some("$argon2id$stub".to_string());

        let patch = LinkPatch {
            original_url: Some("https://new.example.com".to_string()),
            max_clicks: Some(None),
            password_hash: None,
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply_to(&mut link);

        assert_eq!(link.original_url, "https://new.example.com");
        assert_eq!(link.max_clicks, None);
        assert!(link.password_hash.is_some());
    }

    #[test]
    fn test_link_serde_roundtrip_keeps_rules() {
        let mut link = link();
        link.geo_redirects = Some(GeoRedirects::from([(
            "IN".to_string(),
            "https://in.example.com".to_string(),
        )]));

        let json = serde_json::to_string(&link).unwrap();
        let back: Link = serde_json::from_str(&json).unwrap();

        assert_eq!(back, link);
    }
}
