//! Content-type enforcement for JSON endpoints.

use axum::body::Body;
use axum::http::{Method, Request, header};
use axum::response::{IntoResponse, Response};

use super::chain::Middleware;
use crate::error::AppError;

/// Rejects `POST`, `PUT` and `PATCH` requests whose body is not declared as
/// JSON (`application/json` or any `+json` media type) with `415`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireJson;

impl Middleware for RequireJson {
    fn name(&self) -> &'static str {
        "require_json"
    }

    fn inspect(&self, req: &Request<Body>) -> Option<Response> {
        if !matches!(*req.method(), Method::POST | Method::PUT | Method::PATCH) {
            return None;
        }

        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if is_json(content_type) {
            None
        } else {
            Some(
                AppError::UnsupportedMediaType(
                    "Expected request with `Content-Type: application/json`".to_string(),
                )
                .into_response(),
            )
        }
    }
}

fn is_json(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}
