//! Runtime wiring: pools, cache, visitor backends, the click worker and the
//! HTTP server lifecycle.

use crate::application::services::{AuthService, LinkService, RedirectService, StatsService};
use crate::config::Config;
use crate::domain::click_recorder::ChannelClickRecorder;
use crate::domain::click_worker::run_click_worker;
use crate::domain::visitor::GeoLocator;
use crate::infrastructure::cache::{CacheService, NullCache, RedisCache};
use crate::infrastructure::persistence::{PgLinkRepository, PgStatsRepository, PgTokenRepository};
use crate::infrastructure::visitor::{MaxMindLocator, NullGeoLocator, WootheeParser};
use crate::routes::app_router;
use crate::state::AppState;
use crate::utils::ip_hash::IpHasher;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How long shutdown waits for queued clicks to be written.
const CLICK_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens the PostgreSQL pool with the configured limits.
pub async fn connect_pool(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

async fn build_cache(config: &Config) -> Arc<dyn CacheService> {
    let Some(redis_url) = &config.redis_url else {
        tracing::info!("Cache disabled (NullCache)");
        return Arc::new(NullCache::new());
    };

    match RedisCache::connect(redis_url, config.cache_ttl_seconds).await {
        Ok(redis) => {
            tracing::info!("Cache enabled (Redis)");
            Arc::new(redis)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to connect to Redis, using NullCache");
            Arc::new(NullCache::new())
        }
    }
}

fn build_geo_locator(config: &Config) -> Arc<dyn GeoLocator> {
    let Some(path) = &config.geoip_db_path else {
        tracing::info!("GeoIP disabled, geo redirects will not match");
        return Arc::new(NullGeoLocator);
    };

    match MaxMindLocator::open(path) {
        Ok(locator) => {
            tracing::info!(path = %path, "GeoIP database loaded");
            Arc::new(locator)
        }
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Failed to open GeoIP database, geo redirects disabled");
            Arc::new(NullGeoLocator)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Runs the service until a shutdown signal arrives.
///
/// Startup order: database pool, migrations, cache, visitor backends, click
/// worker, HTTP listener. On shutdown the listener stops accepting, in-flight
/// requests finish, then queued clicks are drained for up to ten seconds.
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_pool(&config).await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let cache = build_cache(&config).await;
    let geo_locator = build_geo_locator(&config);

    let pool = Arc::new(pool);
    let link_repository = Arc::new(PgLinkRepository::new(pool.clone()));
    let stats_repository = Arc::new(PgStatsRepository::new(pool.clone()));
    let token_repository = Arc::new(PgTokenRepository::new(pool.clone()));

    let (click_tx, click_rx) = mpsc::channel(config.click_queue_capacity);
    let click_recorder = ChannelClickRecorder::new(click_tx);

    let worker = tokio::spawn(run_click_worker(
        click_rx,
        stats_repository.clone(),
        link_repository.clone(),
        config.click_worker_concurrency,
    ));
    tracing::info!(
        concurrency = config.click_worker_concurrency,
        "Click worker started"
    );

    let redirect_service = RedirectService::new(
        link_repository.clone(),
        Arc::new(click_recorder.clone()),
        Arc::new(WootheeParser::new()),
        geo_locator,
        IpHasher::new(&config.ip_hash_secret),
    )
    .with_cache(cache.clone())
    .with_lookup_timeout(config.lookup_timeout());

    let link_service = LinkService::new(link_repository.clone())
        .with_cache(cache.clone())
        .with_public_host(config.public_host())
        .with_guest_ttl(config.guest_link_ttl())
        .with_reinvalidate_after(config.lookup_timeout());

    let state = AppState {
        redirect_service: Arc::new(redirect_service),
        link_service: Arc::new(link_service),
        stats_service: Arc::new(StatsService::new(stats_repository, link_repository)),
        auth_service: Arc::new(AuthService::new(
            token_repository,
            config.token_signing_secret.clone(),
        )),
        cache,
        click_recorder,
        db: pool,
        behind_proxy: config.behind_proxy,
        public_base_url: config.public_base_url.clone(),
    };

    let app = app_router(state);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid LISTEN address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // The router, and with it every click sender, is gone; the worker exits
    // once the queue is empty.
    match tokio::time::timeout(CLICK_DRAIN_TIMEOUT, worker).await {
        Ok(_) => tracing::info!("Click queue drained"),
        Err(_) => tracing::warn!("Timed out draining click queue, pending clicks dropped"),
    }

    Ok(())
}
