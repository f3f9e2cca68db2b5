//! Client key extraction.
//!
//! Rate limiting and request logging both key requests by the client IP as
//! reported by the reverse proxy in front of the service.
//!
//! # Header Priority
//!
//! 1. `X-Forwarded-For` (first address in the comma-separated list)
//! 2. `X-Real-IP`
//! 3. The [`UNKNOWN_CLIENT`] sentinel
//!
//! # Security Warning: IP Spoofing Risk
//!
//! These headers are client-controllable when the service is reachable
//! directly. Deploy behind a proxy that overwrites (not appends to)
//! `X-Forwarded-For`, otherwise a client can rotate spoofed addresses to
//! dodge the per-client limits.
//!
//! All requests without identifiable IPs share the sentinel key, so they are
//! rate-limited collectively.

use std::borrow::Cow;

use axum::http::Request;

/// Fallback key when no client IP can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Extract the client key used for rate limiting and logging.
///
/// Returns a borrowed sentinel when no header is present, so the common
/// fallback path does not allocate.
#[inline]
pub fn client_key<B>(req: &Request<B>) -> Cow<'static, str> {
    let headers = req.headers();

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    match forwarded.or_else(real_ip) {
        Some(ip) => Cow::Owned(ip.to_string()),
        None => Cow::Borrowed(UNKNOWN_CLIENT),
    }
}

/// The `User-Agent` header, or `-` when absent or not valid ASCII.
pub fn user_agent<B>(req: &Request<B>) -> &str {
    req.headers()
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/contact");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_first_forwarded_address_wins() {
        let req = request(&[("x-forwarded-for", "203.0.113.50, 70.41.3.18, 150.172.238.178")]);
        assert_eq!(client_key(&req), "203.0.113.50");
    }

    #[test]
    fn test_forwarded_takes_priority_over_real_ip() {
        let req = request(&[("x-forwarded-for", "10.0.0.1"), ("x-real-ip", "10.0.0.2")]);
        assert_eq!(client_key(&req), "10.0.0.1");
    }

    #[test]
    fn test_real_ip_fallback() {
        let req = request(&[("x-real-ip", " 192.168.1.7 ")]);
        assert_eq!(client_key(&req), "192.168.1.7");
    }

    #[test]
    fn test_empty_forwarded_falls_through() {
        let req = request(&[("x-forwarded-for", ""), ("x-real-ip", "192.168.1.7")]);
        assert_eq!(client_key(&req), "192.168.1.7");
    }

    #[test]
    fn test_unknown_sentinel_is_borrowed() {
        let req = request(&[]);
        let key = client_key(&req);

        assert_eq!(key, UNKNOWN_CLIENT);
        assert!(matches!(key, Cow::Borrowed(_)));
    }

    #[test]
    fn test_user_agent() {
        assert_eq!(user_agent(&request(&[("user-agent", "curl/8.5")])), "curl/8.5");
        assert_eq!(user_agent(&request(&[])), "-");
    }
}
