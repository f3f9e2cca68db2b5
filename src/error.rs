use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use thiserror::Error;

use crate::models::ApiEnvelope;
use crate::validation::{FieldError, ValidationError};

/// Application-wide error types with appropriate HTTP status codes.
///
/// # Propagation
///
/// Validation and conflict errors are raised locally by handlers and carry
/// client-safe messages. Everything else is treated as internal: the full
/// error is logged server-side and the client only sees a generic message.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Conflict ({code}): {message}")]
    Conflict { code: &'static str, message: String },

    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64, limit: u32 },

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Invalid request ({code}): {message}")]
    BadRequest { code: &'static str, message: String },

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Request timed out: {0}")]
    RequestTimeout(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::MalformedInput(_) | AppError::BadRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RequestTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            AppError::SerializationError(_) | AppError::Internal(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code placed in the envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::MalformedInput(_) => "MALFORMED_INPUT",
            AppError::Conflict { code, .. } | AppError::BadRequest { code, .. } => *code,
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::UnsupportedMediaType(_) => "UNSUPPORTED_MEDIA_TYPE",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::RequestTimeout(_) => "REQUEST_TIMEOUT",
            AppError::SerializationError(_) | AppError::Internal(_) | AppError::ConfigError(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// Whether this error hides an internal failure from the client.
    pub fn is_internal(&self) -> bool {
        self.status().is_server_error()
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(_) => "Validation failed".to_string(),
            AppError::MalformedInput(msg) => msg.clone(),
            AppError::Conflict { message, .. } | AppError::BadRequest { message, .. } => {
                message.clone()
            }
            AppError::RateLimited { .. } => "Too many requests. Please try again later.".to_string(),
            AppError::UnsupportedMediaType(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::RequestTimeout(msg) => msg.clone(),
            AppError::MethodNotAllowed => "Method not allowed".to_string(),
            // Never expose internal details to clients
            AppError::SerializationError(_) | AppError::Internal(_) | AppError::ConfigError(_) => {
                "An internal error occurred. Please try again later.".to_string()
            }
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::Validation(errors) => serde_json::to_value(errors).ok(),
            AppError::RateLimited {
                retry_after_secs, ..
            } => Some(serde_json::json!({ "retryAfter": retry_after_secs })),
            _ => None,
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Malformed(reason) => AppError::MalformedInput(reason),
            ValidationError::Invalid(errors) => AppError::Validation(errors),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full error server-side; clients only get the sanitized message
        if self.is_internal() {
            tracing::error!(error = %self, code = self.code(), "Request failed");
        } else {
            tracing::debug!(error = %self, code = self.code(), "Request rejected");
        }

        let status = self.status();
        let envelope: ApiEnvelope<()> =
            ApiEnvelope::err(self.client_message(), self.code(), self.details());
        let mut response = (status, Json(envelope)).into_response();

        if let AppError::RateLimited {
            retry_after_secs,
            limit,
        } = self
        {
            let headers = response.headers_mut();
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
            headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        }

        response
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
