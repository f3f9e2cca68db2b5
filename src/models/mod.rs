mod account;
mod contact;
mod content;
mod envelope;
mod health;
mod newsletter;
mod pagination;

pub use account::{Account, AccountCreated, MIN_PASSWORD_LENGTH, RegistrationRequest};
pub use contact::{
    BUDGET_RANGES, ContactCreated, ContactForm, ContactListQuery, ContactStatus,
    ContactSubmission, TIMELINES,
};
pub use content::{ContentItem, ContentQuery, ContentStatus, seed_content};
pub use envelope::{ApiEnvelope, ApiResponse, ErrorBody, err, ok, ok_paginated};
pub use health::HealthResponse;
pub use newsletter::{
    ConfirmQuery, ConfirmResponse, INTERESTS, NewsletterSubscription, SubscribeRequest,
    SubscribeResponse,
};
pub use pagination::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, Page, PageRequest, PaginationInfo, paginate};
