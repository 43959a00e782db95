//! Shared application state injected into every handler.

use sqlx::PgPool;
use std::sync::Arc;

use crate::application::services::{AuthService, LinkService, RedirectService, StatsService};
use crate::domain::click_recorder::ChannelClickRecorder;
use crate::infrastructure::cache::CacheService;
use crate::infrastructure::persistence::{PgLinkRepository, PgStatsRepository, PgTokenRepository};

pub type AppRedirectService = RedirectService<PgLinkRepository>;
pub type AppLinkService = LinkService<PgLinkRepository>;
pub type AppStatsService = StatsService<PgStatsRepository, PgLinkRepository>;
pub type AppAuthService = AuthService<PgTokenRepository>;

/// Services and handles shared by all requests. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub redirect_service: Arc<AppRedirectService>,
    pub link_service: Arc<AppLinkService>,
    pub stats_service: Arc<AppStatsService>,
    pub auth_service: Arc<AppAuthService>,
    pub cache: Arc<dyn CacheService>,
    /// Kept for the health check; the redirect service holds its own handle.
    pub click_recorder: ChannelClickRecorder,
    pub db: Arc<PgPool>,
    /// Read the client IP from proxy headers instead of the peer address.
    pub behind_proxy: bool,
    /// Base of generated short URLs. Falls back to the request `Host`.
    pub public_base_url: Option<String>,
}

impl AppState {
    /// Absolute short URL for `code`.
    ///
    /// Uses `PUBLIC_BASE_URL` when configured, otherwise `https://{host}`.
    pub fn short_url(&self, host: Option<&str>, code: &str) -> String {
        match (&self.public_base_url, host) {
            (Some(base), _) => format!("{base}/r/{code}"),
            (None, Some(host)) => format!("https://{host}/r/{code}"),
            (None, None) => format!("/r/{code}"),
        }
    }
}
