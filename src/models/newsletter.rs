use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{FieldSpec, Schema, Validate};

/// Topics a subscriber can opt into.
pub const INTERESTS: &[&str] = &[
    "engineering",
    "strategy",
    "case-studies",
    "events",
    "company-news",
];

/// Body of `POST /api/newsletter/subscribe`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub email: String,
    pub gdpr_consent: bool,
    #[serde(default)]
    pub interests: Vec<String>,
}

static SUBSCRIBE_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new()
        .field(FieldSpec::string("email").required().email().max_length(254))
        .field(
            FieldSpec::boolean("gdprConsent")
                .required()
                .must_be_true()
                .with_message("Consent to data processing is required to subscribe"),
        )
        .field(
            FieldSpec::string_list("interests")
                .one_of(INTERESTS)
                .max_items(INTERESTS.len()),
        )
});

impl Validate for SubscribeRequest {
    fn schema() -> &'static Schema {
        &SUBSCRIBE_SCHEMA
    }
}

/// A stored newsletter subscription, keyed by lowercase email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSubscription {
    pub id: String,
    pub email: String,
    pub interests: Vec<String>,
    pub gdpr_consent: bool,
    pub confirmed: bool,
    pub subscribed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl NewsletterSubscription {
    pub fn new(id: String, request: SubscribeRequest, subscribed_at: DateTime<Utc>) -> Self {
        let mut interests = request.interests;
        interests.sort_unstable();
        interests.dedup();

        Self {
            id,
            email: request.email.to_lowercase(),
            interests,
            gdpr_consent: request.gdpr_consent,
            confirmed: false,
            subscribed_at,
            confirmed_at: None,
        }
    }

    /// Mark the subscription confirmed. A second call keeps the original
    /// confirmation time.
    pub fn confirm(&mut self, at: DateTime<Utc>) {
        if !self.confirmed {
            self.confirmed = true;
            self.confirmed_at = Some(at);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    pub id: String,
    pub email: String,
    pub message: String,
}

/// Query of `GET /api/newsletter`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmQuery {
    pub token: String,
}

static CONFIRM_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new().field(FieldSpec::string("token").required().max_length(1024))
});

impl Validate for ConfirmQuery {
    fn schema() -> &'static Schema {
        &CONFIRM_SCHEMA
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResponse {
    pub email: String,
    pub confirmed: bool,
    pub message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::validation::{RawInput, ValidationError, validate};

    fn parse(body: &str) -> Result<SubscribeRequest, ValidationError> {
        validate(RawInput::Json(body.as_bytes()), SubscribeRequest::schema())
    }

    #[test]
    fn test_subscribe_request_defaults_interests() {
        let request = parse(r#"{"email":"a@b.co","gdprConsent":true}"#).unwrap();
        assert!(request.interests.is_empty());
        assert!(request.gdpr_consent);
    }

    #[test]
    fn test_consent_must_be_given() {
        let err = parse(r#"{"email":"a@b.co","gdprConsent":false}"#).unwrap_err();

        let ValidationError::Invalid(errors) = err else {
            panic!("expected field errors");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "gdprConsent");
        assert_eq!(
            errors[0].message,
            "Consent to data processing is required to subscribe"
        );
    }

    #[test]
    fn test_unknown_interest_rejected() {
        assert!(parse(r#"{"email":"a@b.co","gdprConsent":true,"interests":["gossip"]}"#).is_err());
    }

    #[test]
    fn test_new_subscription_is_unconfirmed_and_normalized() {
        let request = parse(
            r#"{"email":"Reader@Example.COM","gdprConsent":true,"interests":["events","engineering","events"]}"#,
        )
        .unwrap();

        let sub = NewsletterSubscription::new("newsletter_1".into(), request, Utc::now());

        assert_eq!(sub.email, "reader@example.com");
        assert_eq!(sub.interests, vec!["engineering", "events"]);
        assert!(!sub.confirmed);
        assert!(sub.confirmed_at.is_none());
    }

    #[test]
    fn test_confirm_is_idempotent() {
        let request = parse(r#"{"email":"a@b.co","gdprConsent":true}"#).unwrap();
        let mut sub = NewsletterSubscription::new("newsletter_1".into(), request, Utc::now());

        let first = Utc::now();
        sub.confirm(first);
        sub.confirm(first + chrono::Duration::hours(1));

        assert!(sub.confirmed);
        assert_eq!(sub.confirmed_at, Some(first));
    }
}
