//! # Consult API
//!
//! JSON API behind a consultancy website, featuring:
//!
//! - **Forms**: contact inquiries, newsletter sign-up with emailed
//!   confirmation links, account registration
//! - **Content**: filtered, paginated listing of published articles
//! - **Protection**: per-client hard-window rate limiting, declarative input
//!   validation, JSON-only submissions, optional admin token
//! - **Observability**: request ids, structured logging, Prometheus metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Tower layers (Request ID → Trace → CORS → Panic catcher)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware chain (Logger → Rate Limit → JSON / Admin)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (contact, newsletter, content, register, health)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Stores (in-memory repositories)   │  Email dispatcher      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every response, success or failure, uses the same envelope:
//!
//! ```json
//! { "success": false, "error": { "code": "VALIDATION_ERROR", "message": "...", "details": [] } }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use consult_api::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let state = AppState::new(config)?;
//!     let app = build_router(state.clone());
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     state.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Security Configuration
//!
//! Protect the submission listing:
//! ```bash
//! ADMIN_API_TOKEN=your-secret-token cargo run
//! ```
//!
//! Tighten the form submission policy:
//! ```bash
//! SUBMIT_RATE_LIMIT_MAX_REQUESTS=3 SUBMIT_RATE_LIMIT_WINDOW_MS=3600000 cargo run
//! ```

pub mod config;
pub mod email;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod password;
pub mod routes;
pub mod state;
pub mod store;
pub mod token;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::build_router;
pub use state::AppState;
