//! Client address for upload audit logs
//!
//! `x-forwarded-for` is only as trustworthy as the proxies that appended to it, so the
//! client entry is picked by counting back over the known trusted proxies.

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

const UNKNOWN: &str = "unknown";

/// Best-effort client IP: `x-forwarded-for`, then `x-real-ip`, then the socket peer.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    let forwarded = header_str(headers, "x-forwarded-for")
        .and_then(|chain| from_forwarded_chain(chain, trusted_proxy_count));
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    if let Some(ip) = header_str(headers, "x-real-ip").and_then(parse_ip) {
        return ip.to_string();
    }

    socket_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn parse_ip(raw: &str) -> Option<IpAddr> {
    raw.trim().parse().ok()
}

/// Entry just before the trusted proxies at the end of `client, proxy1, proxy2, ...`.
///
/// With no trusted proxies, or a chain shorter than the trusted count, the last entry
/// (the peer closest to us) is used.
fn from_forwarded_chain(chain: &str, trusted_proxy_count: usize) -> Option<IpAddr> {
    let hops: Vec<&str> = chain
        .split(',')
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .collect();

    let index = if trusted_proxy_count == 0 || hops.len() <= trusted_proxy_count {
        hops.len().checked_sub(1)?
    } else {
        hops.len() - trusted_proxy_count - 1
    };

    hops.get(index).and_then(|hop| parse_ip(hop))
}
