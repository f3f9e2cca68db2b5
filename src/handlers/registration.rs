use axum::extract::State;
use chrono::Utc;
use tracing::{info, instrument};

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{Account, AccountCreated, ApiResponse, RegistrationRequest};
use crate::password::hash_password;
use crate::state::AppState;
use crate::store::StoreError;
use crate::utils::generate_id;
use crate::validation::ValidatedJson;

/// `POST /api/register` - create an account.
///
/// The password is stored as an Argon2id hash; hashing runs on the blocking
/// pool. A welcome email is sent in the background.
///
/// # Errors
///
/// - `400 VALIDATION_ERROR` for short or mismatched passwords, or unaccepted terms
/// - `409 EMAIL_TAKEN` if an account exists for the email (case-insensitive)
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegistrationRequest>,
) -> AppResult<ApiResponse<AccountCreated>> {
    let email = request.email.to_lowercase();

    if state.stores.accounts.find_by_email(&email).await?.is_some() {
        return Err(email_taken());
    }

    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))??;

    let account = Account {
        id: generate_id("account"),
        name: request.name,
        email,
        company: request.company,
        password_hash,
        created_at: Utc::now(),
    };

    // The insert re-checks under the store lock, so a concurrent registration
    // for the same email still ends up as a conflict.
    state
        .stores
        .accounts
        .insert(account.clone())
        .await
        .map_err(|e| match e {
            StoreError::DuplicateEmail(_) => email_taken(),
        })?;
    metrics::record_submission("registration");
    info!(id = %account.id, "Account registered");

    state.emails.dispatch(state.composer.welcome(&account));

    Ok(ApiResponse::created(AccountCreated::from(&account)))
}

fn email_taken() -> AppError {
    AppError::Conflict {
        code: "EMAIL_TAKEN",
        message: "An account with this email already exists".to_string(),
    }
}
