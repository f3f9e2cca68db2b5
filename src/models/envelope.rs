//! Uniform response envelope.
//!
//! Every route answers with the same JSON shape:
//!
//! ```json
//! { "success": true, "data": { ... }, "pagination": { ... } }
//! { "success": false, "error": { "message": "...", "code": "...", "details": ... } }
//! ```
//!
//! The constructors here are pure; turning an envelope into an HTTP response
//! is done by [`ApiResponse`], which pairs it with a status code.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::pagination::PaginationInfo;

/// The `{success, data | error}` wrapper around every API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Error payload of a failed envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable, client-safe message
    pub message: String,
    /// Stable machine-readable code (e.g. `VALIDATION_ERROR`)
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl<T> ApiEnvelope<T> {
    /// Successful envelope carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            pagination: None,
            error: None,
        }
    }

    /// Successful envelope carrying one page of results.
    pub fn ok_paginated(data: T, pagination: PaginationInfo) -> Self {
        Self {
            success: true,
            data: Some(data),
            pagination: Some(pagination),
            error: None,
        }
    }

    /// Failed envelope.
    pub fn err(message: impl Into<String>, code: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            success: false,
            data: None,
            pagination: None,
            error: Some(ErrorBody {
                message: message.into(),
                code: code.into(),
                details,
            }),
        }
    }
}

/// Shorthand for [`ApiEnvelope::ok`].
pub fn ok<T>(data: T) -> ApiEnvelope<T> {
    ApiEnvelope::ok(data)
}

/// Shorthand for [`ApiEnvelope::ok_paginated`].
pub fn ok_paginated<T>(data: T, pagination: PaginationInfo) -> ApiEnvelope<T> {
    ApiEnvelope::ok_paginated(data, pagination)
}

/// Shorthand for a failed envelope with no `data` type.
pub fn err(message: impl Into<String>, code: impl Into<String>, details: Option<Value>) -> ApiEnvelope<()> {
    ApiEnvelope::err(message, code, details)
}

/// An envelope paired with the HTTP status it is sent with.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub status: StatusCode,
    pub envelope: ApiEnvelope<T>,
}

impl<T> ApiResponse<T> {
    /// `200 OK` with `data`.
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: ApiEnvelope::ok(data),
        }
    }

    /// `201 Created` with `data`.
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            envelope: ApiEnvelope::ok(data),
        }
    }

    /// `200 OK` with one page of results.
    pub fn paginated(data: T, pagination: PaginationInfo) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: ApiEnvelope::ok_paginated(data, pagination),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_ok_envelope_omits_error_and_pagination() {
        let value = serde_json::to_value(ok(json!({"id": "contact_1"}))).unwrap();

        assert_eq!(value, json!({"success": true, "data": {"id": "contact_1"}}));
    }

    #[test]
    fn test_paginated_envelope_uses_camel_case() {
        let pagination = PaginationInfo::new(2, 1, 3);
        let value = serde_json::to_value(ok_paginated(vec![1], pagination)).unwrap();

        assert_eq!(value["pagination"]["totalPages"], 3);
        assert_eq!(value["pagination"]["hasNext"], true);
        assert_eq!(value["pagination"]["hasPrev"], true);
    }

    #[test]
    fn test_error_envelope_shape() {
        let value = serde_json::to_value(err("Too many requests", "RATE_LIMITED", None)).unwrap();

        assert_eq!(
            value,
            json!({
                "success": false,
                "error": {"message": "Too many requests", "code": "RATE_LIMITED"}
            })
        );
    }

    #[test]
    fn test_error_details_are_serialized_when_present() {
        let envelope = err("Validation failed", "VALIDATION_ERROR", Some(json!([{"path": "email"}])));
        let value = serde_json::to_value(envelope).unwrap();

        assert_eq!(value["error"]["details"][0]["path"], "email");
    }
}
