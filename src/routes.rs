//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack
//!
//! Router-wide tower layers wrap every request; per-route middleware chains
//! run inside them, right before the handler:
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← Sets and echoes X-Request-Id
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response spans
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │      CORS        │ ← Cross-origin headers
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  Panic Catcher   │ ← 500 envelope instead of a dropped connection
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │ Middleware chain │ ← logger → rate limit → JSON / admin token
//! └────────┬─────────┘
//!          ▼
//!      Handler
//! ```
//!
//! # Route Groups
//!
//! - `/health` - logging only, never rate limited
//! - `POST /api/contact`, `/api/newsletter/subscribe`, `/api/register` -
//!   submission policy, JSON bodies only
//! - `GET /api/contact` - API policy plus the admin token
//! - `GET /api/newsletter`, `/api/content` - API policy
//! - 404 / 405 fallbacks - logging only

use std::any::Any;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::handler::Handler;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::AppError;
use crate::handlers;
use crate::middleware::{
    AdminToken, MiddlewareChain, MiddlewareLayer, RateLimit, RequestLogger, RequireJson,
};
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
///
/// # Middleware Configuration
///
/// - **Rate Limiting**: one policy for API reads, a stricter one for submissions;
///   a policy with a maximum of 0 is disabled
/// - **Admin Token**: guards `GET /api/contact` when `ADMIN_API_TOKEN` is set
/// - **CORS**: Configured from `cors_allowed_origins`
pub fn build_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let api_limit = config.api_rate_limit();
    let submit_limit = config.submit_rate_limit();
    info!(
        api_max = api_limit.max_requests,
        api_window_ms = api_limit.window.as_millis() as u64,
        submit_max = submit_limit.max_requests,
        submit_window_ms = submit_limit.window.as_millis() as u64,
        "Rate limiting configured"
    );

    // =========================================================================
    // Per-route middleware chains
    // =========================================================================
    let public = MiddlewareChain::new().with(RequestLogger);

    let api = public
        .clone()
        .with(RateLimit::new(Arc::clone(&state.api_limiter), api_limit));

    let submit = public
        .clone()
        .with(RateLimit::new(
            Arc::clone(&state.submit_limiter),
            submit_limit,
        ))
        .with(RequireJson);

    let admin_token = AdminToken::new(config.admin_api_token.clone());
    if admin_token.is_enabled() {
        info!("Admin token required for submission listings");
    }
    let admin = api.clone().with(admin_token);

    let public = MiddlewareLayer::new(public);
    let api = MiddlewareLayer::new(api);
    let submit = MiddlewareLayer::new(submit);
    let admin = MiddlewareLayer::new(admin);

    // =========================================================================
    // Build Router with Routes
    // =========================================================================
    let mut router = Router::new()
        .route("/health", get(handlers::health_check).layer(public.clone()))
        .route(
            "/api/contact",
            post(handlers::submit_contact)
                .layer(submit.clone())
                .merge(get(handlers::list_contacts).layer(admin)),
        )
        .route(
            "/api/newsletter/subscribe",
            post(handlers::subscribe).layer(submit.clone()),
        )
        .route(
            "/api/newsletter",
            get(handlers::confirm_subscription).layer(api.clone()),
        )
        .route("/api/content", get(handlers::list_content).layer(api))
        .route("/api/register", post(handlers::register).layer(submit))
        .fallback(handlers::not_found.layer(public.clone()))
        .method_not_allowed_fallback(handlers::method_not_allowed.layer(public));

    // =========================================================================
    // Apply Middleware Stack (order matters - applied bottom to top)
    // =========================================================================

    // 1. Request body size limit
    info!(
        max_size_kb = config.max_request_body_size / 1024,
        "Request body size limit configured"
    );
    router = router.layer(DefaultBodyLimit::max(config.max_request_body_size));

    // 2. Panics become the internal-error envelope
    router = router.layer(CatchPanicLayer::custom(handle_panic));

    // 3. CORS
    router = router.layer(build_cors_layer(&config.cors_allowed_origins));

    // 4. Echo the request id on the response
    router = router.layer(PropagateRequestIdLayer::x_request_id());

    // 5. Tracing
    router = router.layer(TraceLayer::new_for_http());

    // 6. Request ID, outermost so every span and log line carries it
    router = router.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    router.with_state(state)
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");

    AppError::Internal(format!("handler panicked: {detail}")).into_response()
}

/// Build CORS layer from configuration.
///
/// # Security Note
///
/// Using `*` (any origin) is convenient for development but should be
/// avoided in production. Specify explicit origins instead.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_any = allowed_origins.iter().any(|o| o == "*");

    let cors = if allow_any {
        CorsLayer::new().allow_origin(AnyOrigin)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins)
    };

    cors.allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin)
        .expose_headers(AnyOrigin)
}
