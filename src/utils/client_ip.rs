//! Client address extraction from HTTP requests.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Determines the client IP for a request.
///
/// With `behind_proxy` unset the peer socket address is authoritative and
/// forwarding headers are ignored, since any client can forge them. Behind a
/// trusted proxy the first `X-Forwarded-For` entry wins, then `X-Real-IP`,
/// then the peer address.
///
/// Header values that do not parse as an IP address are skipped.
///
/// # Examples
///
/// ```ignore
/// let mut headers = HeaderMap::new();
/// headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
///
/// let peer: SocketAddr = "10.0.0.1:443".parse().unwrap();
/// assert_eq!(client_ip(&headers, peer, true), "203.0.113.7".parse::<IpAddr>().unwrap());
/// assert_eq!(client_ip(&headers, peer, false), peer.ip());
/// ```
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr, behind_proxy: bool) -> IpAddr {
    if !behind_proxy {
        return peer.ip();
    }

    forwarded_for(headers)
        .or_else(|| header_ip(headers, X_REAL_IP))
        .unwrap_or_else(|| peer.ip())
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .and_then(|first| first.trim().parse().ok())
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}
