//! Per-request access logging.

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use tracing::info;

use super::chain::Middleware;
use super::ip::{client_key, user_agent};

/// Logs method, path, client key and user-agent, then passes the request on.
///
/// Place it first in a chain so every request is recorded, including those
/// a later middleware rejects.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogger;

impl Middleware for RequestLogger {
    fn name(&self) -> &'static str {
        "request_logger"
    }

    fn inspect(&self, req: &Request<Body>) -> Option<Response> {
        info!(
            method = %req.method(),
            path = %req.uri().path(),
            client_key = %client_key(req),
            user_agent = %user_agent(req),
            "Incoming request"
        );
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_never_short_circuits() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/contact")
            .header("user-agent", "Mozilla/5.0")
            .body(Body::empty())
            .unwrap();

        assert!(RequestLogger.inspect(&req).is_none());
    }
}
