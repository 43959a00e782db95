//! Link creation, editing and guest claiming.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use crate::application::services::redirect_service::DEFAULT_LOOKUP_TIMEOUT;
use crate::domain::entities::{
    AbTestConfig, GeoRedirects, Link, LinkPatch, NewLink, SmartRedirects,
};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheService, NullCache};
use crate::utils::code_generator::{
    generate_claim_token, generate_code, hash_claim_token, validate_custom_code,
};
use crate::utils::destination::normalize_destination;
use crate::utils::password::{hash_password, password_update};

/// Default lifetime of a guest link.
pub const DEFAULT_GUEST_TTL_HOURS: i64 = 24;

/// Everything a caller may set when creating a link.
#[derive(Debug, Clone, Default)]
pub struct CreateLink {
    pub original_url: String,
    pub custom_code: Option<String>,
    pub smart_redirects: Option<SmartRedirects>,
    pub geo_redirects: Option<GeoRedirects>,
    pub ab_test: Option<AbTestConfig>,
    pub start_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub max_clicks: Option<i64>,
    pub password: Option<String>,
}

/// Partial update as received from the API.
///
/// Double options clear a field with `Some(None)`. `password: Some("")`
/// removes protection.
#[derive(Debug, Clone, Default)]
pub struct UpdateLink {
    pub original_url: Option<String>,
    pub smart_redirects: Option<Option<SmartRedirects>>,
    pub geo_redirects: Option<Option<GeoRedirects>>,
    pub ab_test: Option<Option<AbTestConfig>>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub expiration_date: Option<Option<DateTime<Utc>>>,
    pub max_clicks: Option<Option<i64>>,
    pub password: Option<String>,
}

/// A freshly created guest link and its one-time claim token.
///
/// The token is only available here; storage keeps its hash.
#[derive(Debug, Clone)]
pub struct GuestLink {
    pub link: Link,
    pub claim_token: String,
}

/// Service for managing short links.
///
/// Validates every destination, generates codes, hashes passwords and
/// keeps the redirect cache coherent with writes.
pub struct LinkService<L: LinkRepository> {
    link_repository: Arc<L>,
    cache: Arc<dyn CacheService>,
    public_host: Option<String>,
    guest_ttl: Duration,
    reinvalidate_after: std::time::Duration,
}

impl<L: LinkRepository> LinkService<L> {
    /// Creates a new link service without a cache.
    pub fn new(link_repository: Arc<L>) -> Self {
        Self {
            link_repository,
            cache: Arc::new(NullCache::new()),
            public_host: None,
            guest_ttl: Duration::hours(DEFAULT_GUEST_TTL_HOURS),
            reinvalidate_after: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheService>) -> Self {
        self.cache = cache;
        self
    }

    /// Host of the service's own public URL; destinations on it are refused.
    pub fn with_public_host(mut self, host: Option<String>) -> Self {
        self.public_host = host.map(|h| h.to_ascii_lowercase());
        self
    }

    pub fn with_guest_ttl(mut self, ttl: Duration) -> Self {
        self.guest_ttl = ttl;
        self
    }

    /// Delay before a changed code is evicted a second time. Must be at least
    /// the redirect lookup timeout, which bounds how late a cache fill from a
    /// read that predates the write can land.
    pub fn with_reinvalidate_after(mut self, delay: std::time::Duration) -> Self {
        self.reinvalidate_after = delay;
        self
    }

    /// Creates a link owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if any URL, code or rule is invalid.
    /// Returns [`AppError::Conflict`] if the custom code is taken.
    pub async fn create_link(
        &self,
        input: CreateLink,
        owner_id: Option<i64>,
    ) -> Result<Link, AppError> {
        let now = Utc::now();
        let mut new_link = self.validated_new_link(&input)?;
        new_link.owner_id = owner_id;

        new_link.password_hash = match input.password.as_deref() {
            None | Some("") => None,
            Some(pwd) => Some(hash_password(pwd).map_err(|e| {
                AppError::internal("Failed to hash password", json!({ "reason": e.to_string() }))
            })?),
        };

        new_link.code = match input.custom_code {
            Some(custom) => self.reserve_custom_code(custom, now).await?,
            None => self.generate_unique_code().await?,
        };

        let link = self.link_repository.create(new_link).await?;
        tracing::info!(link_id = link.id, code = %link.code, owner_id, "Link created");
        Ok(link)
    }

    /// Creates an anonymous link that expires after the guest TTL.
    ///
    /// Guest links cannot carry a password, a split test or a custom code.
    pub async fn create_guest_link(
        &self,
        input: CreateLink,
        now: DateTime<Utc>,
    ) -> Result<GuestLink, AppError> {
        let forbidden: Vec<&str> = [
            ("custom_code", input.custom_code.is_some()),
            ("password", input.password.is_some()),
            ("ab_test", input.ab_test.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, set)| set.then_some(field))
        .collect();

        if !forbidden.is_empty() {
            return Err(AppError::bad_request(
                "Guest links cannot use these options",
                json!({ "fields": forbidden }),
            ));
        }

        let mut new_link = self.validated_new_link(&input)?;
        let claim_token = generate_claim_token();

        new_link.code = self.generate_unique_code().await?;
        new_link.is_guest = true;
        new_link.expires_at = Some(now + self.guest_ttl);
        new_link.claim_token_hash = Some(hash_claim_token(&claim_token));

        let link = self.link_repository.create(new_link).await?;
        tracing::info!(link_id = link.id, code = %link.code, "Guest link created");

        Ok(GuestLink { link, claim_token })
    }

    /// Transfers a live guest link to `owner_id`, consuming the claim token.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for unknown, already used or expired tokens.
    pub async fn claim_link(
        &self,
        claim_token: &str,
        owner_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Link, AppError> {
        let token = claim_token.trim();
        if token.is_empty() {
            return Err(AppError::bad_request(
                "Claim token is required",
                json!({ "field": "claim_token" }),
            ));
        }

        let link = self
            .link_repository
            .claim(&hash_claim_token(token), owner_id, now)
            .await?
            .ok_or_else(|| {
                AppError::not_found(
                    "Claim token is invalid or expired",
                    json!({ "reason": "No live guest link matches this token" }),
                )
            })?;

        self.invalidate(&link.code).await;
        tracing::info!(link_id = link.id, owner_id, "Guest link claimed");
        Ok(link)
    }

    /// Retrieves an active link by its short code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no active link matches the code.
    pub async fn get_link(&self, code: &str) -> Result<Link, AppError> {
        self.link_repository
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "code": code })))
    }

    pub async fn list_links(
        &self,
        page: i64,
        page_size: i64,
        owner_id: Option<i64>,
    ) -> Result<Vec<Link>, AppError> {
        self.link_repository.list(page, page_size, owner_id).await
    }

    pub async fn count_links(&self, owner_id: Option<i64>) -> Result<i64, AppError> {
        self.link_repository.count(owner_id).await
    }

    /// Applies a partial update.
    ///
    /// The resulting link is validated as a whole, so a new `start_date`
    /// is checked against the stored `expiration_date`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no active link matches the code.
    /// Returns [`AppError::Validation`] if the update is empty or invalid.
    pub async fn update_link(&self, code: &str, update: UpdateLink) -> Result<Link, AppError> {
        let patch = self.validated_patch(update)?;
        if patch.is_empty() {
            return Err(AppError::bad_request(
                "No fields to update",
                json!({ "code": code }),
            ));
        }

        let mut preview = self.get_link(code).await?;
        patch.clone().apply_to(&mut preview);
        validate_window(preview.start_date, preview.expiration_date)?;

        let link = self.link_repository.update(code, patch).await?;
        self.invalidate(code).await;

        tracing::info!(link_id = link.id, code, "Link updated");
        Ok(link)
    }

    /// Soft-deletes a link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no active link matches the code.
    pub async fn delete_link(&self, code: &str) -> Result<(), AppError> {
        if !self.link_repository.soft_delete(code).await? {
            return Err(AppError::not_found(
                "Short link not found",
                json!({ "code": code }),
            ));
        }

        self.invalidate(code).await;
        tracing::info!(code, "Link deleted");
        Ok(())
    }

    /// Hard-deletes guest links whose TTL passed. Returns how many were removed.
    pub async fn purge_expired_guests(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        self.link_repository.purge_expired_guests(now).await
    }

    fn validated_new_link(&self, input: &CreateLink) -> Result<NewLink, AppError> {
        validate_window(input.start_date, input.expiration_date)?;
        validate_max_clicks(input.max_clicks)?;

        Ok(NewLink {
            original_url: self.destination("original_url", &input.original_url)?,
            smart_redirects: input
                .smart_redirects
                .clone()
                .map(|s| self.validated_smart(s))
                .transpose()?,
            geo_redirects: input
                .geo_redirects
                .clone()
                .map(|g| self.validated_geo(g))
                .transpose()?,
            ab_test: input
                .ab_test
                .clone()
                .map(|ab| self.validated_ab_test(ab))
                .transpose()?,
            start_date: input.start_date,
            expiration_date: input.expiration_date,
            max_clicks: input.max_clicks,
            ..Default::default()
        })
    }

    fn validated_patch(&self, update: UpdateLink) -> Result<LinkPatch, AppError> {
        if let Some(Some(max)) = update.max_clicks {
            validate_max_clicks(Some(max))?;
        }

        let password_hash = password_update(update.password.as_deref()).map_err(|e| {
            AppError::internal("Failed to hash password", json!({ "reason": e.to_string() }))
        })?;

        Ok(LinkPatch {
            original_url: update
                .original_url
                .map(|u| self.destination("original_url", &u))
                .transpose()?,
            smart_redirects: update
                .smart_redirects
                .map(|v| v.map(|s| self.validated_smart(s)).transpose())
                .transpose()?,
            geo_redirects: update
                .geo_redirects
                .map(|v| v.map(|g| self.validated_geo(g)).transpose())
                .transpose()?,
            ab_test: update
                .ab_test
                .map(|v| v.map(|ab| self.validated_ab_test(ab)).transpose())
                .transpose()?,
            start_date: update.start_date,
            expiration_date: update.expiration_date,
            max_clicks: update.max_clicks,
            password_hash,
        })
    }

    fn destination(&self, field: &str, url: &str) -> Result<String, AppError> {
        normalize_destination(url, self.public_host.as_deref()).map_err(|e| {
            AppError::bad_request(
                "Invalid destination URL",
                json!({ "field": field, "reason": e.to_string() }),
            )
        })
    }

    fn validated_smart(&self, smart: SmartRedirects) -> Result<SmartRedirects, AppError> {
        let check = |field: &str, url: Option<String>| {
            url.map(|u| self.destination(field, &u)).transpose()
        };

        Ok(SmartRedirects {
            ios: check("smart_redirects.ios", smart.ios)?,
            android: check("smart_redirects.android", smart.android)?,
            desktop: check("smart_redirects.desktop", smart.desktop)?,
        })
    }

    fn validated_geo(&self, geo: GeoRedirects) -> Result<GeoRedirects, AppError> {
        geo.into_iter()
            .map(|(country, url)| {
                if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
                    return Err(AppError::bad_request(
                        "Geo redirect keys must be two-letter country codes",
                        json!({ "field": "geo_redirects", "key": country }),
                    ));
                }
                let url = self.destination(&format!("geo_redirects.{country}"), &url)?;
                Ok((country.to_ascii_uppercase(), url))
            })
            .collect()
    }

    fn validated_ab_test(&self, ab: AbTestConfig) -> Result<AbTestConfig, AppError> {
        let mut seen = HashSet::new();
        let mut variants = Vec::with_capacity(ab.variants.len());

        for mut variant in ab.variants {
            variant.id = variant.id.trim().to_string();
            if variant.id.is_empty() {
                return Err(AppError::bad_request(
                    "Variant id must not be empty",
                    json!({ "field": "ab_test.variants" }),
                ));
            }
            if !seen.insert(variant.id.clone()) {
                return Err(AppError::bad_request(
                    "Variant ids must be unique",
                    json!({ "field": "ab_test.variants", "id": variant.id }),
                ));
            }
            if variant.weight < 0 {
                return Err(AppError::bad_request(
                    "Variant weight must not be negative",
                    json!({ "field": "ab_test.variants", "id": variant.id }),
                ));
            }
            variant.url = self.destination(&format!("ab_test.variants.{}", variant.id), &variant.url)?;
            variants.push(variant);
        }

        Ok(AbTestConfig {
            enabled: ab.enabled,
            variants,
        })
    }

    /// Validates a custom code and frees it if an expired guest link holds it.
    /// Evicts `code` now and again after `reinvalidate_after`, dropping any
    /// entry a concurrent redirect filled from the pre-write row.
    async fn invalidate(&self, code: &str) {
        let _ = self.cache.invalidate(code).await;

        if self.reinvalidate_after.is_zero() {
            return;
        }
        let cache = self.cache.clone();
        let code = code.to_string();
        let delay = self.reinvalidate_after;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = cache.invalidate(&code).await {
                tracing::warn!(code = %code, error = %e, "Delayed cache invalidation failed");
            }
        });
    }

    async fn reserve_custom_code(
        &self,
        custom: String,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        validate_custom_code(&custom)?;

        if self
            .link_repository
            .release_expired_guest_code(&custom, now)
            .await?
        {
            self.invalidate(&custom).await;
            tracing::info!(code = %custom, "Released code held by expired guest link");
        }

        if self.link_repository.find_by_code(&custom).await?.is_some() {
            return Err(AppError::conflict(
                "Custom code already exists",
                json!({ "code": custom }),
            ));
        }

        Ok(custom)
    }

    /// Generates a unique short code with collision retry.
    ///
    /// Attempts up to 10 times before failing.
    async fn generate_unique_code(&self) -> Result<String, AppError> {
        const MAX_ATTEMPTS: usize = 10;

        for _ in 0..MAX_ATTEMPTS {
            let code = generate_code();

            if self.link_repository.find_by_code(&code).await?.is_none() {
                return Ok(code);
            }
        }

        Err(AppError::internal(
            "Failed to generate unique code",
            json!({ "reason": "Too many collisions" }),
        ))
    }
}

fn validate_window(
    start_date: Option<DateTime<Utc>>,
    expiration_date: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    match (start_date, expiration_date) {
        (Some(start), Some(end)) if start >= end => Err(AppError::bad_request(
            "start_date must be before expiration_date",
            json!({ "start_date": start, "expiration_date": end }),
        )),
        _ => Ok(()),
    }
}

fn validate_max_clicks(max_clicks: Option<i64>) -> Result<(), AppError> {
    match max_clicks {
        Some(n) if n < 1 => Err(AppError::bad_request(
            "max_clicks must be at least 1",
            json!({ "max_clicks": n }),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::AbVariant;
    use crate::domain::repositories::MockLinkRepository;
    use crate::utils::password::verify_password;
    use std::collections::BTreeMap;

    fn create_test_link(id: i64, code: &str, url: &str) -> Link {
        Link::new(id, code.to_string(), url.to_string(), Utc::now())
    }

    fn stored(new_link: NewLink) -> Link {
        let mut link = create_test_link(10, &new_link.code, &new_link.original_url);
        link.smart_redirects = new_link.smart_redirects;
        link.geo_redirects = new_link.geo_redirects;
        link.ab_test = new_link.ab_test;
        link.max_clicks = new_link.max_clicks;
        link.password_hash = new_link.password_hash;
        link.is_guest = new_link.is_guest;
        link.claim_token_hash = new_link.claim_token_hash;
        link.expires_at = new_link.expires_at;
        link.owner_id = new_link.owner_id;
        link
    }

    fn input(url: &str) -> CreateLink {
        CreateLink {
            original_url: url.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_link_success() {
        let mut mock_link_repo = MockLinkRepository::new();

        mock_link_repo
            .expect_find_by_code()
            .times(1)
            .returning(|_| Ok(None));
        mock_link_repo
            .expect_create()
            .withf(|l| l.original_url == "https://example.com/" && l.owner_id == Some(3))
            .times(1)
            .returning(|l| Ok(stored(l)));

        let service = LinkService::new(Arc::new(mock_link_repo));

        let link = service
            .create_link(input("https://example.com"), Some(3))
            .await
            .unwrap();

        assert_eq!(link.original_url, "https://example.com/");
        assert_eq!(link.code.len(), 7);
    }

    #[tokio::test]
    async fn test_create_link_normalizes_rules() {
        let mut mock_link_repo = MockLinkRepository::new();

        mock_link_repo
            .expect_find_by_code()
            .returning(|_| Ok(None));
        mock_link_repo
            .expect_create()
            .withf(|l| {
                l.geo_redirects
                    .as_ref()
                    .is_some_and(|g| g.get("IN").map(String::as_str) == Some("https://in.a.com/"))
                    && l.smart_redirects.as_ref().and_then(|s| s.ios.as_deref())
                        == Some("https://apps.apple.com/x")
            })
            .times(1)
            .returning(|l| Ok(stored(l)));

        let service = LinkService::new(Arc::new(mock_link_repo));

        let mut req = input("https://a.com");
        req.geo_redirects = Some(BTreeMap::from([(
            "in".to_string(),
            "https://IN.a.com".to_string(),
        )]));
        req.smart_redirects = Some(SmartRedirects {
            ios: Some("https://apps.apple.com/x".into()),
            ..Default::default()
        });

        assert!(service.create_link(req, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_link_hashes_password() {
        let mut mock_link_repo = MockLinkRepository::new();

        mock_link_repo
            .expect_find_by_code()
            .returning(|_| Ok(None));
        mock_link_repo
            .expect_create()
            .times(1)
            .returning(|l| Ok(stored(l)));

        let service = LinkService::new(Arc::new(mock_link_repo));

        let mut req = input("https://example.com");
        req.password = Some("hunter2".into());
        let link = service.create_link(req, None).await.unwrap();

        let hash = link.password_hash.unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_create_link_invalid_url() {
        let mock_link_repo = MockLinkRepository::new();
        let service = LinkService::new(Arc::new(mock_link_repo));

        let result = service.create_link(input("javascript:alert(1)"), None).await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_create_link_rejects_self_reference() {
        let mock_link_repo = MockLinkRepository::new();
        let service = LinkService::new(Arc::new(mock_link_repo))
            .with_public_host(Some("sl.example.com".into()));

        let result = service
            .create_link(input("https://sl.example.com/r/abc"), None)
            .await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_create_link_rejects_bad_rules() {
        let service = LinkService::new(Arc::new(MockLinkRepository::new()));
        let now = Utc::now();

        let mut bad_geo = input("https://a.com");
        bad_geo.geo_redirects = Some(BTreeMap::from([(
            "IND".to_string(),
            "https://in.a.com".to_string(),
        )]));

        let mut bad_window = input("https://a.com");
        bad_window.start_date = Some(now);
        bad_window.expiration_date = Some(now - Duration::hours(1));

        let mut bad_cap = input("https://a.com");
        bad_cap.max_clicks = Some(0);

        let variant = |id: &str| AbVariant {
            id: id.to_string(),
            url: "https://v.a.com".to_string(),
            weight: 1,
        };
        let mut dup_variants = input("https://a.com");
        dup_variants.ab_test = Some(AbTestConfig {
            enabled: true,
            variants: vec![variant("a"), variant("a")],
        });

        for req in [bad_geo, bad_window, bad_cap, dup_variants] {
            let result = service.create_link(req, None).await;
            assert!(matches!(result, Err(AppError::Validation { .. })));
        }
    }

    #[tokio::test]
    async fn test_create_link_with_custom_code() {
        let mut mock_link_repo = MockLinkRepository::new();

        mock_link_repo
            .expect_release_expired_guest_code()
            .withf(|code, _| code == "promo")
            .times(1)
            .returning(|_, _| Ok(false));
        mock_link_repo
            .expect_find_by_code()
            .withf(|code| code == "promo")
            .times(1)
            .returning(|_| Ok(None));
        mock_link_repo
            .expect_create()
            .withf(|l| l.code == "promo")
            .times(1)
            .returning(|l| Ok(stored(l)));

        let service = LinkService::new(Arc::new(mock_link_repo));

        let mut req = input("https://example.com");
        req.custom_code = Some("promo".into());

        assert_eq!(service.create_link(req, None).await.unwrap().code, "promo");
    }

    #[tokio::test]
    async fn test_create_link_custom_code_conflict() {
        let mut mock_link_repo = MockLinkRepository::new();

        mock_link_repo
            .expect_release_expired_guest_code()
            .returning(|_, _| Ok(false));
        mock_link_repo
            .expect_find_by_code()
            .times(1)
            .returning(|code| Ok(Some(create_test_link(1, code, "https://x.com/"))));
        mock_link_repo.expect_create().times(0);

        let service = LinkService::new(Arc::new(mock_link_repo));

        let mut req = input("https://example.com");
        req.custom_code = Some("taken".into());
        let result = service.create_link(req, None).await;

        assert!(matches!(result, Err(AppError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_create_link_invalid_custom_code() {
        let service = LinkService::new(Arc::new(MockLinkRepository::new()));

        let mut req = input("https://example.com");
        req.custom_code = Some("a!".into());
        let result = service.create_link(req, None).await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_generate_code_gives_up_after_collisions() {
        let mut mock_link_repo = MockLinkRepository::new();

        mock_link_repo
            .expect_find_by_code()
            .times(10)
            .returning(|code| Ok(Some(create_test_link(1, code, "https://x.com/"))));

        let service = LinkService::new(Arc::new(mock_link_repo));

        let result = service.create_link(input("https://example.com"), None).await;

        assert!(matches!(result, Err(AppError::Internal { .. })));
    }

    #[tokio::test]
    async fn test_create_guest_link() {
        let mut mock_link_repo = MockLinkRepository::new();
        let now = Utc::now();

        mock_link_repo
            .expect_find_by_code()
            .returning(|_| Ok(None));
        mock_link_repo
            .expect_create()
            .withf(move |l| {
                l.is_guest && l.expires_at == Some(now + Duration::hours(2)) && l.owner_id.is_none()
            })
            .times(1)
            .returning(|l| Ok(stored(l)));

        let service =
            LinkService::new(Arc::new(mock_link_repo)).with_guest_ttl(Duration::hours(2));

        let guest = service
            .create_guest_link(input("https://example.com"), now)
            .await
            .unwrap();

        assert_eq!(guest.claim_token.len(), 43);
        assert_eq!(
            guest.link.claim_token_hash,
            Some(hash_claim_token(&guest.claim_token))
        );
    }

    #[tokio::test]
    async fn test_create_guest_link_rejects_owner_features() {
        let service = LinkService::new(Arc::new(MockLinkRepository::new()));

        let mut req = input("https://example.com");
        req.password = Some("x".into());
        req.custom_code = Some("mine".into());

        let result = service.create_guest_link(req, Utc::now()).await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_claim_link() {
        let mut mock_link_repo = MockLinkRepository::new();
        let token = "claim-token";
        let expected = hash_claim_token(token);

        mock_link_repo
            .expect_claim()
            .withf(move |hash, owner, _| hash == expected && *owner == 9)
            .times(1)
            .returning(|_, owner, _| {
                let mut link = create_test_link(5, "guest01", "https://example.com/");
                link.owner_id = Some(owner);
                Ok(Some(link))
            });

        let service = LinkService::new(Arc::new(mock_link_repo));

        let link = service.claim_link(token, 9, Utc::now()).await.unwrap();

        assert_eq!(link.owner_id, Some(9));
        assert!(!link.is_guest);
    }

    #[tokio::test]
    async fn test_claim_link_unknown_token() {
        let mut mock_link_repo = MockLinkRepository::new();
        mock_link_repo
            .expect_claim()
            .times(1)
            .returning(|_, _, _| Ok(None));

        let service = LinkService::new(Arc::new(mock_link_repo));

        let result = service.claim_link("nope", 1, Utc::now()).await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_link_clears_password_and_checks_window() {
        let mut mock_link_repo = MockLinkRepository::new();
        let now = Utc::now();

        let mut current = create_test_link(1, "abc123", "https://example.com/");
        current.expiration_date = Some(now + Duration::days(1));
        current.password_hash = Some("$argon2id$stub".into());
        mock_link_repo
            .expect_find_by_code()
            .returning(move |_| Ok(Some(current.clone())));
        mock_link_repo
            .expect_update()
            .withf(|code, patch| code == "abc123" && patch.password_hash == Some(None))
            .times(1)
            .returning(|code, _| Ok(create_test_link(1, code, "https://example.com/")));

        let service = LinkService::new(Arc::new(mock_link_repo));

        let cleared = service
            .update_link(
                "abc123",
                UpdateLink {
                    password: Some(String::new()),
                    ..Default::default()
                },
            )
            .await;
        assert!(cleared.is_ok());

        let bad_window = service
            .update_link(
                "abc123",
                UpdateLink {
                    start_date: Some(Some(now + Duration::days(2))),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(bad_window, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_update_link_empty_patch() {
        let service = LinkService::new(Arc::new(MockLinkRepository::new()));

        let result = service.update_link("abc123", UpdateLink::default()).await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[derive(Default)]
    struct MemoryCache {
        entries: std::sync::Mutex<std::collections::HashMap<String, Link>>,
    }

    #[async_trait::async_trait]
    impl CacheService for MemoryCache {
        async fn get_link(
            &self,
            code: &str,
        ) -> crate::infrastructure::cache::CacheResult<Option<Link>> {
            Ok(self.entries.lock().unwrap().get(code).cloned())
        }

        async fn set_link(
            &self,
            link: &Link,
            _ttl_seconds: Option<u64>,
        ) -> crate::infrastructure::cache::CacheResult<()> {
            self.entries
                .lock()
                .unwrap()
                .insert(link.code.clone(), link.clone());
            Ok(())
        }

        async fn invalidate(&self, code: &str) -> crate::infrastructure::cache::CacheResult<()> {
            self.entries.lock().unwrap().remove(code);
            Ok(())
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_delete_evicts_entry_filled_by_concurrent_redirect() {
        let mut mock_link_repo = MockLinkRepository::new();
        mock_link_repo
            .expect_soft_delete()
            .times(1)
            .returning(|_| Ok(true));

        let cache = Arc::new(MemoryCache::default());
        let service = LinkService::new(Arc::new(mock_link_repo))
            .with_cache(cache.clone())
            .with_reinvalidate_after(std::time::Duration::from_millis(20));

        let before_delete = create_test_link(1, "abc123", "https://example.com/");
        service.delete_link("abc123").await.unwrap();
        // A redirect that read the row before the delete fills the cache late.
        cache.set_link(&before_delete, None).await.unwrap();
        assert!(cache.get_link("abc123").await.unwrap().is_some());

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        assert!(cache.get_link("abc123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_link() {
        let mut mock_link_repo = MockLinkRepository::new();
        mock_link_repo
            .expect_soft_delete()
            .withf(|code| code == "abc123")
            .times(1)
            .returning(|_| Ok(true));
        mock_link_repo
            .expect_soft_delete()
            .withf(|code| code == "missing")
            .times(1)
            .returning(|_| Ok(false));

        let service = LinkService::new(Arc::new(mock_link_repo));

        assert!(service.delete_link("abc123").await.is_ok());
        assert!(matches!(
            service.delete_link("missing").await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_link_not_found() {
        let mut mock_link_repo = MockLinkRepository::new();
        mock_link_repo
            .expect_find_by_code()
            .times(1)
            .returning(|_| Ok(None));

        let service = LinkService::new(Arc::new(mock_link_repo));

        assert!(matches!(
            service.get_link("nope").await,
            Err(AppError::NotFound { .. })
        ));
    }
}
