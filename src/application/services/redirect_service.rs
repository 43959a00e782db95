//! Short-link resolution at redirect time.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};

use crate::domain::click_event::ClickEvent;
use crate::domain::click_recorder::ClickRecorder;
use crate::domain::entities::Link;
use crate::domain::redirect::{Outcome, RequestContext, check_access, select_destination};
use crate::domain::repositories::LinkRepository;
use crate::domain::visitor::{GeoLocator, UserAgentParser, VisitorProfile};
use crate::error::AppError;
use crate::infrastructure::cache::{CacheService, NullCache};
use crate::utils::ip_hash::IpHasher;

/// Default upper bound for the link lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(2000);

/// Resolves a short code and a visitor request into an [`Outcome`].
///
/// The lookup (cache, then store) is the only awaited step. Access checks and
/// destination selection are the pure rules in [`crate::domain::redirect`].
/// A successful redirect hands a [`ClickEvent`] to the recorder and does not
/// wait for it to be stored.
pub struct RedirectService<L: LinkRepository> {
    link_repository: Arc<L>,
    recorder: Arc<dyn ClickRecorder>,
    ua_parser: Arc<dyn UserAgentParser>,
    geo_locator: Arc<dyn GeoLocator>,
    ip_hasher: IpHasher,
    cache: Arc<dyn CacheService>,
    lookup_timeout: Duration,
}

impl<L: LinkRepository> RedirectService<L> {
    /// Creates a resolver without a cache and with [`DEFAULT_LOOKUP_TIMEOUT`].
    pub fn new(
        link_repository: Arc<L>,
        recorder: Arc<dyn ClickRecorder>,
        ua_parser: Arc<dyn UserAgentParser>,
        geo_locator: Arc<dyn GeoLocator>,
        ip_hasher: IpHasher,
    ) -> Self {
        Self {
            link_repository,
            recorder,
            ua_parser,
            geo_locator,
            ip_hasher,
            cache: Arc::new(NullCache::new()),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheService>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Resolves `code` for the request described by `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] if the lookup exceeds the configured
    /// timeout, and whatever the repository returns if the lookup fails.
    /// A missing link is `Ok(Outcome::NotFound)`, never an error.
    #[tracing::instrument(name = "resolve", skip(self, ctx), fields(outcome = tracing::field::Empty))]
    pub async fn resolve(&self, code: &str, ctx: RequestContext) -> Result<Outcome, AppError> {
        let outcome = match self.lookup_with_timeout(code).await? {
            None => Outcome::NotFound,
            Some(link) => self.decide(&link, ctx),
        };

        tracing::Span::current().record("outcome", outcome.label());
        metrics::counter!("smartlink_redirects_total", "outcome" => outcome.label()).increment(1);

        Ok(outcome)
    }

    fn decide(&self, link: &Link, ctx: RequestContext) -> Outcome {
        if let Some(outcome) = check_access(link, &ctx) {
            debug!(link_id = link.id, outcome = outcome.label(), "Redirect refused");
            return outcome;
        }

        let visitor = VisitorProfile::classify(
            &ctx.user_agent,
            &ctx.ip_address,
            self.ua_parser.as_ref(),
            self.geo_locator.as_ref(),
        );

        let destination = select_destination(link, &visitor, &mut rand::rng());
        debug!(
            link_id = link.id,
            rule = ?destination.rule,
            variant = destination.variant_id.as_deref(),
            platform = visitor.device.platform.as_str(),
            country = visitor.geo.country_code.as_deref(),
            "Destination selected"
        );

        let event = ClickEvent::new(
            link.id,
            ctx.now,
            &ctx.referrer,
            visitor,
            ctx.utm,
            self.ip_hasher.hash(&ctx.ip_address),
            destination.variant_id.clone(),
        );
        self.emit_click(event);

        destination.into()
    }

    fn emit_click(&self, event: ClickEvent) {
        let link_id = event.link_id;
        if let Err(e) = self.recorder.record(event) {
            warn!(link_id, error = %e, "Click dropped");
            metrics::counter!("smartlink_clicks_dropped_total").increment(1);
        }
    }

    async fn lookup_with_timeout(&self, code: &str) -> Result<Option<Link>, AppError> {
        match tokio::time::timeout(self.lookup_timeout, self.lookup(code)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    code,
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "Link lookup timed out"
                );
                metrics::counter!("smartlink_lookup_timeouts_total").increment(1);
                Err(AppError::unavailable(
                    "Link lookup timed out",
                    json!({ "timeout_ms": self.lookup_timeout.as_millis() as u64 }),
                ))
            }
        }
    }

    async fn lookup(&self, code: &str) -> Result<Option<Link>, AppError> {
        if let Ok(Some(link)) = self.cache.get_link(code).await {
            return Ok(Some(link));
        }

        let link = self.link_repository.find_by_code(code).await?;

        if let Some(link) = link.as_ref().filter(|l| l.is_cacheable()) {
            let _ = self.cache.set_link(link, None).await;
        }

        Ok(link)
    }
}
