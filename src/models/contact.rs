use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pagination::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, PageRequest};
use crate::validation::{FieldSpec, Schema, Validate};

/// Accepted values for the optional `budget` field.
pub const BUDGET_RANGES: &[&str] = &[
    "under-10k",
    "10k-25k",
    "25k-50k",
    "50k-100k",
    "over-100k",
];

/// Accepted values for the optional `timeline` field.
pub const TIMELINES: &[&str] = &["asap", "1-3-months", "3-6-months", "6-plus-months", "flexible"];

/// Workflow state of a contact submission.
///
/// Submissions are created as `New`; the remaining states exist for
/// back-office triage and are not set by any endpoint yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    New,
    Reviewed,
    Responded,
    Closed,
}

impl ContactStatus {
    pub const ALL: &'static [&'static str] = &["new", "reviewed", "responded", "closed"];
}

/// Body of `POST /api/contact`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub message: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub budget: Option<String>,
    pub timeline: Option<String>,
}

static CONTACT_FORM_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new()
        .field(FieldSpec::string("firstName").required().min_length(2).max_length(50))
        .field(FieldSpec::string("lastName").required().min_length(2).max_length(50))
        .field(FieldSpec::string("email").required().email().max_length(254))
        .field(FieldSpec::string("company").max_length(100))
        .field(FieldSpec::string("phone").min_length(7).max_length(30))
        .field(FieldSpec::string("budget").one_of(BUDGET_RANGES))
        .field(FieldSpec::string("timeline").one_of(TIMELINES))
        .field(FieldSpec::string("message").required().min_length(10).max_length(5000))
});

impl Validate for ContactForm {
    fn schema() -> &'static Schema {
        &CONTACT_FORM_SCHEMA
    }
}

/// A stored contact form submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
    pub message: String,
    pub status: ContactStatus,
    pub submitted_at: DateTime<Utc>,
}

impl ContactSubmission {
    /// Build a new submission in the `New` state.
    pub fn new(id: String, form: ContactForm, submitted_at: DateTime<Utc>) -> Self {
        Self {
            id,
            first_name: form.first_name,
            last_name: form.last_name,
            email: form.email.to_lowercase(),
            company: form.company,
            phone: form.phone,
            budget: form.budget,
            timeline: form.timeline,
            message: form.message,
            status: ContactStatus::New,
            submitted_at,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Data returned after a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactCreated {
    pub id: String,
    pub message: String,
}

/// Query of `GET /api/contact`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactListQuery {
    pub page: u32,
    pub limit: u32,
    pub status: Option<ContactStatus>,
}

impl ContactListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

static CONTACT_LIST_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new()
        .field(FieldSpec::integer("page").default_value(1).min(1))
        .field(
            FieldSpec::integer("limit")
                .default_value(DEFAULT_PAGE_LIMIT)
                .min(1)
                .max(i64::from(MAX_PAGE_LIMIT)),
        )
        .field(FieldSpec::string("status").one_of(ContactStatus::ALL))
});

impl Validate for ContactListQuery {
    fn schema() -> &'static Schema {
        &CONTACT_LIST_SCHEMA
    }
}
