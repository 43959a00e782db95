#![allow(dead_code)]

use axum::{
    Router,
    extract::ConnectInfo,
    middleware,
    routing::get,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::Layer;

use smartlink::api;
use smartlink::api::handlers::{health_handler, redirect_handler, redirect_with_password_handler};
use smartlink::api::middleware::auth;
use smartlink::application::services::{
    AuthService, LinkService, RedirectService, StatsService, hash_token,
};
use smartlink::domain::click_event::ClickEvent;
use smartlink::domain::click_recorder::ChannelClickRecorder;
use smartlink::domain::entities::{Link, NewLink};
use smartlink::domain::repositories::LinkRepository;
use smartlink::domain::visitor::{GeoInfo, GeoLocator};
use smartlink::infrastructure::cache::NullCache;
use smartlink::infrastructure::persistence::{
    PgLinkRepository, PgStatsRepository, PgTokenRepository,
};
use smartlink::infrastructure::visitor::WootheeParser;
use smartlink::state::AppState;
use smartlink::utils::ip_hash::IpHasher;

pub const SIGNING_SECRET: &str = "test-signing-secret";
pub const PUBLIC_BASE_URL: &str = "https://sl.example";

pub const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
pub const ANDROID_UA: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
pub const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Places every visitor in the same country.
pub struct FixedGeoLocator(pub &'static str);

impl GeoLocator for FixedGeoLocator {
    fn locate(&self, _ip: &str) -> GeoInfo {
        GeoInfo {
            country: None,
            country_code: Some(self.0.to_string()),
            city: None,
        }
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Injects a fixed peer address, standing in for `into_make_service_with_connect_info`.
#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "203.0.113.7:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}

pub fn create_test_state(pool: PgPool) -> (AppState, mpsc::Receiver<ClickEvent>) {
    create_test_state_with_geo(pool, Arc::new(FixedGeoLocator("US")))
}

pub fn create_test_state_with_geo(
    pool: PgPool,
    geo: Arc<dyn GeoLocator>,
) -> (AppState, mpsc::Receiver<ClickEvent>) {
    let pool = Arc::new(pool);
    let (tx, rx) = mpsc::channel(100);
    let click_recorder = ChannelClickRecorder::new(tx);

    let link_repo = Arc::new(PgLinkRepository::new(pool.clone()));
    let stats_repo = Arc::new(PgStatsRepository::new(pool.clone()));
    let token_repo = Arc::new(PgTokenRepository::new(pool.clone()));

    let redirect_service = RedirectService::new(
        link_repo.clone(),
        Arc::new(click_recorder.clone()),
        Arc::new(WootheeParser::new()),
        geo,
        IpHasher::new("test-ip-secret"),
    );

    let link_service =
        LinkService::new(link_repo.clone()).with_public_host(Some("sl.example".to_string()));

    let state = AppState {
        redirect_service: Arc::new(redirect_service),
        link_service: Arc::new(link_service),
        stats_service: Arc::new(StatsService::new(stats_repo, link_repo)),
        auth_service: Arc::new(AuthService::new(token_repo, SIGNING_SECRET.to_string())),
        cache: Arc::new(NullCache::new()),
        click_recorder,
        db: pool,
        behind_proxy: false,
        public_base_url: Some(PUBLIC_BASE_URL.to_string()),
    };

    (state, rx)
}

/// Every route of the service without rate limiting.
pub fn test_app(state: AppState) -> Router {
    let protected = api::routes::protected_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::layer));

    Router::new()
        .route(
            "/r/{code}",
            get(redirect_handler).post(redirect_with_password_handler),
        )
        .route("/health", get(health_handler))
        .nest("/api", protected.merge(api::routes::public_routes()))
        .layer(MockConnectInfoLayer)
        .with_state(state)
}

/// Inserts an active API token and returns `(id, raw token)`.
pub async fn create_test_token(pool: &PgPool, name: &str) -> (i64, String) {
    let raw = format!("raw-token-{name}");
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO api_tokens (name, token_hash) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(hash_token(SIGNING_SECRET, &raw))
    .fetch_one(pool)
    .await
    .unwrap();

    (id, raw)
}

pub async fn insert_link(pool: &PgPool, new_link: NewLink) -> Link {
    PgLinkRepository::new(Arc::new(pool.clone()))
        .create(new_link)
        .await
        .unwrap()
}

pub async fn create_test_link(pool: &PgPool, code: &str, url: &str) -> Link {
    insert_link(
        pool,
        NewLink {
            code: code.to_string(),
            original_url: url.to_string(),
            ..Default::default()
        },
    )
    .await
}

pub async fn create_deleted_link(pool: &PgPool, code: &str, url: &str) -> Link {
    let link = create_test_link(pool, code, url).await;
    sqlx::query("UPDATE links SET deleted_at = NOW() WHERE id = $1")
        .bind(link.id)
        .execute(pool)
        .await
        .unwrap();
    link
}

pub async fn set_clicks(pool: &PgPool, link_id: i64, clicks: i64) {
    sqlx::query("UPDATE links SET clicks = $2 WHERE id = $1")
        .bind(link_id)
        .bind(clicks)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn link_clicks(pool: &PgPool, link_id: i64) -> i64 {
    sqlx::query_scalar("SELECT clicks FROM links WHERE id = $1")
        .bind(link_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn create_test_click(pool: &PgPool, link_id: i64, at: DateTime<Utc>, country: &str) {
    sqlx::query(
        "INSERT INTO link_clicks (link_id, clicked_at, device, country_code) VALUES ($1, $2, 'pc', $3)",
    )
    .bind(link_id)
    .bind(at)
    .bind(country)
    .execute(pool)
    .await
    .unwrap();
}
