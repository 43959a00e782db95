//! Client IP extraction from HTTP request metadata.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Determines the visitor's IP address.
///
/// With `behind_proxy` the left-most valid `X-Forwarded-For` entry is used,
/// then `X-Real-IP`; the socket peer address is the fallback. Without it,
/// proxy headers are ignored because any client can forge them.
///
/// # Examples
///
/// ```ignore
/// let mut headers = HeaderMap::new();
/// headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
///
/// let ip = client_ip(&headers, "10.0.0.1:443".parse().unwrap(), true);
/// assert_eq!(ip.to_string(), "203.0.113.9");
/// ```
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr, behind_proxy: bool) -> IpAddr {
    if behind_proxy {
        if let Some(ip) = forwarded_for(headers) {
            return ip;
        }
        if let Some(ip) = header_ip(headers, X_REAL_IP) {
            return ip;
        }
    }

    peer.ip()
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .find_map(|part| part.trim().parse().ok())
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}
