//! Newsletter endpoints.
//!
//! # Endpoints
//!
//! - `POST /api/newsletter/subscribe` - Create an unconfirmed subscription
//! - `GET /api/newsletter?token=...` - Confirm it from the emailed link
//!
//! # Confirmation Tokens
//!
//! Links carry a signed, expiring token (see [`crate::token`]) rather than
//! the bare email address, so a subscription can only be confirmed by
//! whoever received the email.

use axum::extract::State;
use chrono::Utc;
use tracing::{info, instrument};

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{
    ApiResponse, ConfirmQuery, ConfirmResponse, NewsletterSubscription, SubscribeRequest,
    SubscribeResponse,
};
use crate::state::AppState;
use crate::store::StoreError;
use crate::utils::generate_id;
use crate::validation::{ValidatedJson, ValidatedQuery};

/// Subscribe an email address to the newsletter.
///
/// # Request Body
///
/// ```json
/// { "email": "reader@example.com", "gdprConsent": true, "interests": ["engineering"] }
/// ```
///
/// # Errors
///
/// - `409 ALREADY_SUBSCRIBED` if the email (case-insensitive) is already subscribed
#[instrument(skip_all)]
pub async fn subscribe(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SubscribeRequest>,
) -> AppResult<ApiResponse<SubscribeResponse>> {
    let now = Utc::now();
    let subscription = NewsletterSubscription::new(generate_id("newsletter"), request, now);

    state
        .stores
        .subscriptions
        .insert(subscription.clone())
        .await
        .map_err(|e| match e {
            StoreError::DuplicateEmail(_) => AppError::Conflict {
                code: "ALREADY_SUBSCRIBED",
                message: "This email address is already subscribed".to_string(),
            },
        })?;
    metrics::record_submission("newsletter");
    info!(id = %subscription.id, "Newsletter subscription stored");

    let token = state.tokens.issue(&subscription.email, now);
    state.emails.dispatch(state.composer.newsletter_confirmation(
        &subscription.email,
        &token,
        state.tokens.ttl().num_hours(),
    ));

    Ok(ApiResponse::created(SubscribeResponse {
        id: subscription.id,
        email: subscription.email,
        message: "Please check your inbox to confirm your subscription.".to_string(),
    }))
}

/// Confirm a subscription from the emailed link.
///
/// Confirming twice is harmless and keeps the first confirmation time.
///
/// # Errors
///
/// - `400 INVALID_TOKEN` for a malformed, forged or expired token
/// - `404 NOT_FOUND` if no subscription exists for the token's email
#[instrument(skip_all)]
pub async fn confirm_subscription(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<ConfirmQuery>,
) -> AppResult<ApiResponse<ConfirmResponse>> {
    let now = Utc::now();
    let email = state.tokens.verify(&query.token, now)?;

    let subscription = state
        .stores
        .subscriptions
        .confirm(&email, now)
        .await?
        .ok_or_else(|| AppError::NotFound("No subscription found for this link".to_string()))?;

    info!(id = %subscription.id, "Newsletter subscription confirmed");

    Ok(ApiResponse::ok(ConfirmResponse {
        email: subscription.email,
        confirmed: subscription.confirmed,
        message: "Your subscription is confirmed.".to_string(),
    }))
}
