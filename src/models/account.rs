use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{FieldSpec, Relation, Schema, Validate};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Body of `POST /api/register`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub company: Option<String>,
    pub accept_terms: bool,
}

// Passwords stay out of logs and spans.
impl std::fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("company", &self.company)
            .field("accept_terms", &self.accept_terms)
            .finish_non_exhaustive()
    }
}

static REGISTRATION_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new()
        .field(FieldSpec::string("name").required().min_length(2).max_length(100))
        .field(FieldSpec::string("email").required().email().max_length(254))
        .field(
            FieldSpec::string("password")
                .required()
                .min_length(MIN_PASSWORD_LENGTH)
                .max_length(128),
        )
        .field(FieldSpec::string("confirmPassword").required())
        .field(FieldSpec::string("company").max_length(100))
        .field(
            FieldSpec::boolean("acceptTerms")
                .required()
                .must_be_true()
                .with_message("You must accept the terms of service"),
        )
        .relation(Relation::equals(
            "confirmPassword",
            "password",
            "Passwords do not match",
        ))
});

impl Validate for RegistrationRequest {
    fn schema() -> &'static Schema {
        &REGISTRATION_SCHEMA
    }
}

/// A registered account. The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCreated {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&Account> for AccountCreated {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
        }
    }
}
