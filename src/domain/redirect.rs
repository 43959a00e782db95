//! Redirect-time decision rules.
//!
//! Everything here is pure: the link is already loaded, the visitor already
//! classified. [`crate::application::services::RedirectService`] wraps these
//! rules with the store lookup and the click emission.
//!
//! # Precedence
//!
//! Terminal checks run in this order and the first hit wins:
//!
//! 1. guest TTL elapsed → [`Outcome::Expired`]
//! 2. outside `[start_date, expiration_date]` → [`Outcome::Expired`]
//! 3. `clicks >= max_clicks` → [`Outcome::LimitReached`]
//! 4. missing or wrong password → [`Outcome::PasswordRequired`]
//!
//! Destination selection then picks the first matching rule: active A/B test,
//! smart (platform) redirect, geo (country) redirect, original URL.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::domain::entities::{AbVariant, Link, UtmParams};
use crate::domain::visitor::VisitorProfile;
use crate::utils::password::verify_password;

/// Request data the resolver consumes.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_agent: String,
    pub ip_address: String,
    /// Empty when the request carried no `Referer`.
    pub referrer: String,
    pub supplied_password: Option<String>,
    pub utm: UtmParams,
    pub now: DateTime<Utc>,
}

impl RequestContext {
    /// Context with no visitor metadata, evaluated at `now`.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            user_agent: String::new(),
            ip_address: String::new(),
            referrer: String::new(),
            supplied_password: None,
            utm: UtmParams::default(),
            now,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = ip.into();
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = referrer.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.supplied_password = Some(password.into());
        self
    }

    pub fn with_utm(mut self, utm: UtmParams) -> Self {
        self.utm = utm;
        self
    }
}

/// Result of resolving a short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Send the visitor to `url`. `variant_id` is set when an A/B variant won.
    Redirect {
        url: String,
        variant_id: Option<String>,
    },
    NotFound,
    Expired,
    LimitReached,
    PasswordRequired,
}

impl Outcome {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Redirect { .. } => "redirect",
            Outcome::NotFound => "not_found",
            Outcome::Expired => "expired",
            Outcome::LimitReached => "limit_reached",
            Outcome::PasswordRequired => "password_required",
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Outcome::Redirect { .. })
    }
}

/// Which routing rule produced the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRule {
    AbTest,
    Smart,
    Geo,
    Original,
}

/// The chosen destination of a redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub url: String,
    pub variant_id: Option<String>,
    pub rule: RouteRule,
}

impl From<Destination> for Outcome {
    fn from(dest: Destination) -> Self {
        Outcome::Redirect {
            url: dest.url,
            variant_id: dest.variant_id,
        }
    }
}

/// Evaluates the terminal checks for a loaded link.
///
/// Returns `None` when the link may redirect.
pub fn check_access(link: &Link, ctx: &RequestContext) -> Option<Outcome> {
    if link.is_guest_expired(ctx.now) {
        return Some(Outcome::Expired);
    }

    if link.is_outside_window(ctx.now) {
        return Some(Outcome::Expired);
    }

    if link.is_click_limit_reached() {
        return Some(Outcome::LimitReached);
    }

    if let Some(hash) = link.password_hash.as_deref() {
        let granted = match ctx.supplied_password.as_deref() {
            Some(supplied) => verify_password(supplied, hash).unwrap_or_else(|e| {
                tracing::warn!(link_id = link.id, error = %e, "Stored password hash is unreadable");
                false
            }),
            None => false,
        };

        if !granted {
            return Some(Outcome::PasswordRequired);
        }
    }

    None
}

/// Picks the destination for a link that passed [`check_access`].
pub fn select_destination<R: Rng + ?Sized>(
    link: &Link,
    visitor: &VisitorProfile,
    rng: &mut R,
) -> Destination {
    if let Some(ab) = link.ab_test.as_ref().filter(|ab| ab.is_active())
        && let Some(variant) = select_variant(&ab.variants, rng)
    {
        return Destination {
            url: variant.url.clone(),
            variant_id: Some(variant.id.clone()),
            rule: RouteRule::AbTest,
        };
    }

    if let Some(url) = link
        .smart_redirects
        .as_ref()
        .and_then(|smart| smart.for_platform(visitor.device.platform))
    {
        return Destination {
            url: url.to_string(),
            variant_id: None,
            rule: RouteRule::Smart,
        };
    }

    if let Some(url) = visitor
        .geo
        .country_code
        .as_deref()
        .and_then(|cc| link.geo_redirects.as_ref()?.get(&cc.to_ascii_uppercase()))
    {
        return Destination {
            url: url.clone(),
            variant_id: None,
            rule: RouteRule::Geo,
        };
    }

    Destination {
        url: link.original_url.clone(),
        variant_id: None,
        rule: RouteRule::Original,
    }
}

/// Weighted random choice over `variants`.
///
/// Builds cumulative weights and takes the first bucket whose upper bound
/// exceeds a single uniform draw in `[0, total)`. Non-positive weights count
/// as zero; when every weight is zero the choice is uniform.
pub fn select_variant<'a, R: Rng + ?Sized>(
    variants: &'a [AbVariant],
    rng: &mut R,
) -> Option<&'a AbVariant> {
    if variants.is_empty() {
        return None;
    }

    let cumulative: Vec<u64> = variants
        .iter()
        .scan(0u64, |acc, v| {
            *acc = acc.saturating_add(v.weight.max(0) as u64);
            Some(*acc)
        })
        .collect();

    let total = cumulative.last().copied().unwrap_or(0);
    if total == 0 {
        return variants.get(rng.random_range(0..variants.len()));
    }

    let draw = rng.random_range(0..total);
    cumulative
        .iter()
        .position(|&upper| upper > draw)
        .and_then(|idx| variants.get(idx))
}
