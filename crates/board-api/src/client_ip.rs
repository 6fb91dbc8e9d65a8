//! Best-guess origin address for a request.
//!
//! Candidates are tried in order: `X-Forwarded-For` (first hop),
//! `X-Real-IP`, then the TCP peer. The RFC 7239 `Forwarded` header is not
//! consulted. The first candidate that isn't a loopback/unspecified
//! address wins. Private
//! ranges (10.*, 172.*, 192.168.*) count as real client addresses so LAN
//! visitors are reported as themselves.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};

pub const LOCAL_ACCESS: &str = "local access (localhost)";
pub const UNKNOWN: &str = "unknown";

const LOCAL_PREFIXES: &[&str] = &["127.0.0.1", "::1", "localhost", "0.0.0.0", "::", "fe80::"];

/// Extractor wrapping [`resolve`]. Never rejects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp(resolve(&parts.headers, peer)))
    }
}

pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded_for = header(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim);
    let real_ip = header(headers, "x-real-ip").map(str::trim);

    let candidate = [forwarded_for, real_ip]
        .into_iter()
        .flatten()
        .find(|ip| !ip.is_empty() && !is_local(ip));
    if let Some(ip) = candidate {
        return ip.to_string();
    }

    if let Some(addr) = peer {
        let ip = addr.ip().to_canonical().to_string();
        if !is_local(&ip) {
            return ip;
        }
        if ip == "127.0.0.1" || ip == "::1" {
            return LOCAL_ACCESS.to_string();
        }
    }

    UNKNOWN.to_string()
}

/// Loopback and unspecified addresses, matched by prefix.
pub fn is_local(ip: &str) -> bool {
    LOCAL_PREFIXES.iter().any(|prefix| ip.starts_with(prefix))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    fn peer(addr: &str) -> Option<SocketAddr> {
        Some(addr.parse().unwrap())
    }

    #[test]
    fn loopback_peer_without_headers_is_local_access() {
        assert_eq!(resolve(&HeaderMap::new(), peer("127.0.0.1:5000")), LOCAL_ACCESS);
        assert_eq!(resolve(&HeaderMap::new(), peer("[::1]:5000")), LOCAL_ACCESS);
    }

    #[test]
    fn mapped_loopback_peer_is_local_access() {
        assert_eq!(
            resolve(&HeaderMap::new(), peer("[::ffff:127.0.0.1]:5000")),
            LOCAL_ACCESS
        );
    }

    #[test]
    fn first_forwarded_for_entry_wins_even_when_private() {
        let h = headers(&[("x-forwarded-for", "10.0.0.5, 1.2.3.4")]);
        assert_eq!(resolve(&h, peer("127.0.0.1:80")), "10.0.0.5");
    }

    #[test]
    fn local_forwarded_for_falls_through_to_real_ip() {
        let h = headers(&[
            ("x-forwarded-for", "127.0.0.1, 8.8.8.8"),
            ("x-real-ip", "192.168.1.20"),
        ]);
        assert_eq!(resolve(&h, peer("127.0.0.1:80")), "192.168.1.20");
    }

    #[test]
    fn forwarded_header_is_ignored() {
        let h = headers(&[("forwarded", "for=5.6.7.8;proto=https")]);
        assert_eq!(resolve(&h, peer("203.0.113.9:443")), "203.0.113.9");
        assert_eq!(resolve(&h, peer("127.0.0.1:80")), LOCAL_ACCESS);
        assert_eq!(resolve(&h, None), UNKNOWN);
    }

    #[test]
    fn remote_peer_is_the_last_resort() {
        let h = headers(&[("x-real-ip", "localhost")]);
        assert_eq!(resolve(&h, peer("203.0.113.9:443")), "203.0.113.9");
    }

    #[test]
    fn unspecified_peer_is_unknown() {
        assert_eq!(resolve(&HeaderMap::new(), peer("0.0.0.0:80")), UNKNOWN);
        assert_eq!(resolve(&HeaderMap::new(), None), UNKNOWN);
    }

    #[test]
    fn private_ranges_are_not_local() {
        for ip in ["10.1.2.3", "172.20.0.1", "192.168.0.2"] {
            assert!(!is_local(ip), "{}", ip);
        }
        for ip in ["127.0.0.1", "::1", "localhost", "0.0.0.0", "::", "fe80::1"] {
            assert!(is_local(ip), "{}", ip);
        }
    }
}
