//! Per-client rate limiting using a token bucket.

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_governor::{
    GovernorError, GovernorLayer, governor::GovernorConfigBuilder, key_extractor::KeyExtractor,
};

use crate::utils::client_ip::client_ip;

pub type RateLimitLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Keys buckets by the same client IP the redirect path records.
///
/// Proxy headers are only trusted when `behind_proxy` is set; otherwise the
/// socket peer address is used.
#[derive(Debug, Clone, Copy)]
pub struct ClientIpKeyExtractor {
    behind_proxy: bool,
}

impl ClientIpKeyExtractor {
    pub fn new(behind_proxy: bool) -> Self {
        Self { behind_proxy }
    }
}

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr)
            .ok_or(GovernorError::UnableToExtractKey)?;

        Ok(client_ip(req.headers(), peer, self.behind_proxy))
    }
}

fn build(behind_proxy: bool, per_second: u64, burst: u32) -> RateLimitLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor::new(behind_proxy))
        .per_second(per_second)
        .burst_size(burst)
        .finish()
        .expect("rate limit quota must be non-zero");

    GovernorLayer::new(Arc::new(config))
}

/// Limiter for public endpoints (redirects, guest links, health).
///
/// 2 requests per second with a burst of 100. Excess requests get
/// `429 Too Many Requests`.
pub fn layer(behind_proxy: bool) -> RateLimitLayer {
    build(behind_proxy, 2, 100)
}

/// Stricter limiter for authenticated API endpoints.
///
/// 1 request per second with a burst of 10.
pub fn secure_layer(behind_proxy: bool) -> RateLimitLayer {
    build(behind_proxy, 1, 10)
}
