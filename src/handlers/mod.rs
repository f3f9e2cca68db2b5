//! Route handlers.
//!
//! Every handler answers with the [`ApiResponse`](crate::models::ApiResponse)
//! envelope and reports failures as [`AppError`](crate::error::AppError).
//! Input arrives through the validating extractors, so a handler body only
//! runs on well-formed input.

mod contact;
mod content;
mod fallback;
mod health;
mod newsletter;
mod registration;

pub use contact::{list_contacts, submit_contact};
pub use content::list_content;
pub use fallback::{method_not_allowed, not_found};
pub use health::health_check;
pub use newsletter::{confirm_subscription, subscribe};
pub use registration::register;
