//! Contact form endpoints.
//!
//! # Endpoints
//!
//! - `POST /api/contact` - Store a contact form submission
//! - `GET /api/contact` - List submissions, newest first (admin)

use axum::extract::State;
use chrono::Utc;
use tracing::{info, instrument};

use crate::error::AppResult;
use crate::metrics;
use crate::models::{ApiResponse, ContactCreated, ContactForm, ContactListQuery, ContactSubmission};
use crate::state::AppState;
use crate::utils::generate_id;
use crate::validation::{ValidatedJson, ValidatedQuery};

/// Store a contact form submission.
///
/// The team notification and the acknowledgement to the submitter are sent
/// in the background; a failed email never fails the request.
///
/// # Request Body
///
/// ```json
/// {
///   "firstName": "Ada",
///   "lastName": "Lovelace",
///   "email": "ada@example.com",
///   "message": "We would like to talk about a data platform.",
///   "company": "Analytical Engines",
///   "budget": "25k-50k",
///   "timeline": "1-3-months"
/// }
/// ```
#[instrument(skip_all)]
pub async fn submit_contact(
    State(state): State<AppState>,
    ValidatedJson(form): ValidatedJson<ContactForm>,
) -> AppResult<ApiResponse<ContactCreated>> {
    let submission = ContactSubmission::new(generate_id("contact"), form, Utc::now());

    state.stores.contacts.append(submission.clone()).await?;
    metrics::record_submission("contact");
    info!(id = %submission.id, "Contact submission stored");

    state
        .emails
        .dispatch(state.composer.contact_notification(&submission));
    state
        .emails
        .dispatch(state.composer.contact_acknowledgement(&submission));

    Ok(ApiResponse::created(ContactCreated {
        id: submission.id,
        message: "Thank you for reaching out. We will get back to you shortly.".to_string(),
    }))
}

/// List contact submissions, newest first.
///
/// Query: `page` (default 1), `limit` (default 10, max 100), `status`.
#[instrument(skip(state))]
pub async fn list_contacts(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<ContactListQuery>,
) -> AppResult<ApiResponse<Vec<ContactSubmission>>> {
    let page = state
        .stores
        .contacts
        .list(query.status, query.page_request())
        .await?;

    Ok(ApiResponse::paginated(page.items, page.pagination))
}
