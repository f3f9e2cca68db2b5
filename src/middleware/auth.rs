//! Admin token authentication for back-office endpoints.
//!
//! # Usage
//!
//! Set `ADMIN_API_TOKEN` to protect the submission listings:
//!
//! ```bash
//! ADMIN_API_TOKEN=your-secret-token cargo run
//! curl -H "Authorization: Bearer your-secret-token" http://localhost:3000/api/contact
//! ```
//!
//! Without a configured token the listings stay open. The application logs a
//! warning at startup in that case, because submissions contain personal
//! data.
//!
//! # Security Features
//!
//! - **Constant-time comparison**: Prevents timing attacks on token validation
//! - **Header only**: tokens in query strings end up in access logs

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderValue, Request, header};
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tracing::warn;

use super::chain::Middleware;
use super::ip::client_key;
use crate::error::AppError;

/// Bearer-token check; a no-op when no token is configured.
#[derive(Debug, Clone)]
pub struct AdminToken {
    expected: Option<Arc<str>>,
}

impl AdminToken {
    pub fn new(token: Option<String>) -> Self {
        Self {
            expected: token.filter(|t| !t.is_empty()).map(Arc::from),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.expected.is_some()
    }
}

impl Middleware for AdminToken {
    fn name(&self) -> &'static str {
        "admin_token"
    }

    fn inspect(&self, req: &Request<Body>) -> Option<Response> {
        let expected = self.expected.as_deref()?;

        match bearer_token(req) {
            Some(provided) if constant_time_eq(provided, expected) => None,
            provided => {
                warn!(
                    client_key = %client_key(req),
                    path = %req.uri().path(),
                    token_present = provided.is_some(),
                    "Rejected admin request"
                );
                let mut response =
                    AppError::Unauthorized("A valid admin token is required".to_string())
                        .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                Some(response)
            }
        }
    }
}

fn bearer_token<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Perform constant-time comparison of two strings.
fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    fn request(authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/contact");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_disabled_allows_everything() {
        let auth = AdminToken::new(None);
        assert!(!auth.is_enabled());
        assert!(auth.inspect(&request(None)).is_none());

        assert!(!AdminToken::new(Some(String::new())).is_enabled());
    }

    #[test]
    fn test_valid_token_passes() {
        let auth = AdminToken::new(Some("s3cret".to_string()));
        assert!(auth.inspect(&request(Some("Bearer s3cret"))).is_none());
    }

    #[test]
    fn test_wrong_or_missing_token_rejected() {
        let auth = AdminToken::new(Some("s3cret".to_string()));

        for value in [None, Some("Bearer nope"), Some("Basic s3cret"), Some("s3cret")] {
            let response = auth.inspect(&request(value)).unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
        }
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
