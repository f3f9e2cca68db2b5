//! HTTP middleware for rate limiting, request inspection, and access control.
//!
//! Middlewares here implement [`Middleware`]: a synchronous inspection of the
//! request that either answers it or lets it through. Routes mount them as
//! an ordered [`MiddlewareChain`] through [`MiddlewareLayer`].
//!
//! - **Request Logger**: method, path, client key, user-agent for every request
//! - **Rate Limiting**: hard-window counters per client key
//! - **Require JSON**: `415` for non-JSON request bodies
//! - **Admin Token**: bearer token for back-office listings
//!
//! # Architecture
//!
//! ```text
//! Request → Logger → Rate Limit → Require JSON / Admin Token → Handler
//!                        ↓              ↓             ↓
//!                 429 Too Many   415 Unsupported  401 Unauth
//! ```

pub mod auth;
pub mod chain;
pub mod content_type;
pub mod ip;
pub mod logging;
pub mod rate_limit;

pub use auth::AdminToken;
pub use chain::{
    FnMiddleware, Middleware, MiddlewareChain, MiddlewareLayer, ResponseFuture, compose,
    error_boundary, from_fn, with_middleware,
};
pub use content_type::RequireJson;
pub use ip::{UNKNOWN_CLIENT, client_key};
pub use logging::RequestLogger;
pub use rate_limit::{
    Clock, ManualClock, RateLimit, RateLimitDecision, RateLimitEntry, RateLimitPolicy,
    RateLimiter, SystemClock,
};
