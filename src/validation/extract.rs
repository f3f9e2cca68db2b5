//! Axum extractors that validate at the handler boundary.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRef, FromRequest, FromRequestParts, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use super::schema::Schema;
use super::{RawInput, validate};
use crate::config::Config;
use crate::error::AppError;

/// A request type with an associated schema.
pub trait Validate: DeserializeOwned {
    fn schema() -> &'static Schema;
}

/// JSON body validated against `T::schema()`.
///
/// The body is read under `Config::body_read_timeout`; the size limit comes
/// from the router's `DefaultBodyLimit`.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: Validate,
    S: Send + Sync,
    Arc<Config>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let config = Arc::<Config>::from_ref(state);

        let bytes = tokio::time::timeout(config.body_read_timeout, Bytes::from_request(req, state))
            .await
            .map_err(|_| {
                AppError::RequestTimeout("Request body was not received in time".to_string())
            })?
            .map_err(|rejection| match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => {
                    AppError::PayloadTooLarge("Request body is too large".to_string())
                }
                _ => AppError::MalformedInput(rejection.body_text()),
            })?;

        let value = validate(RawInput::Json(&bytes), T::schema())?;
        Ok(Self(value))
    }
}

/// Query string validated against `T::schema()`.
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or_default();
        let value = validate(RawInput::Query(query), T::schema())?;
        Ok(Self(value))
    }
}
