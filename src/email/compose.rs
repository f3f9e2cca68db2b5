use crate::models::{Account, ContactSubmission};

use super::EmailMessage;

/// Builds the plain-text notifications the API sends.
#[derive(Debug, Clone)]
pub struct EmailComposer {
    from: String,
    contact_notify: String,
    base_url: String,
}

impl EmailComposer {
    pub fn new(
        from: impl Into<String>,
        contact_notify: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            contact_notify: contact_notify.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Link the subscriber follows to confirm.
    pub fn confirmation_link(&self, token: &str) -> String {
        format!("{}/api/newsletter?token={token}", self.base_url)
    }

    /// Internal notice about a new contact submission.
    pub fn contact_notification(&self, submission: &ContactSubmission) -> EmailMessage {
        let mut body = format!(
            "New contact submission {}\n\nName: {}\nEmail: {}\n",
            submission.id,
            submission.full_name(),
            submission.email
        );
        for (label, value) in [
            ("Company", &submission.company),
            ("Phone", &submission.phone),
            ("Budget", &submission.budget),
            ("Timeline", &submission.timeline),
        ] {
            if let Some(value) = value {
                body.push_str(&format!("{label}: {value}\n"));
            }
        }
        body.push_str(&format!("\n{}\n", submission.message));

        self.message(
            "contact_notification",
            &self.contact_notify,
            format!("New inquiry from {}", submission.full_name()),
            body,
        )
    }

    /// Acknowledgement sent to whoever filled in the contact form.
    pub fn contact_acknowledgement(&self, submission: &ContactSubmission) -> EmailMessage {
        self.message(
            "contact_acknowledgement",
            &submission.email,
            "We received your message".to_string(),
            format!(
                "Hi {},\n\nThanks for getting in touch. We will reply within two business days.\n",
                submission.first_name
            ),
        )
    }

    pub fn newsletter_confirmation(&self, email: &str, token: &str, ttl_hours: i64) -> EmailMessage {
        self.message(
            "newsletter_confirmation",
            email,
            "Confirm your newsletter subscription".to_string(),
            format!(
                "Please confirm your subscription by opening this link:\n\n{}\n\n\
                 The link expires in {ttl_hours} hours. If you did not subscribe, ignore this email.\n",
                self.confirmation_link(token)
            ),
        )
    }

    pub fn welcome(&self, account: &Account) -> EmailMessage {
        self.message(
            "welcome",
            &account.email,
            "Welcome aboard".to_string(),
            format!(
                "Hi {},\n\nYour account has been created. You can now sign in with {}.\n",
                account.name, account.email
            ),
        )
    }

    fn message(&self, kind: &'static str, to: &str, subject: String, body: String) -> EmailMessage {
        EmailMessage {
            kind,
            from: self.from.clone(),
            to: to.to_string(),
            subject,
            body,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::ContactStatus;

    fn composer() -> EmailComposer {
        EmailComposer::new("hello@consult.example", "team@consult.example", "https://consult.example/")
    }

    fn submission() -> ContactSubmission {
        ContactSubmission {
            id: "contact_1_abc".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            company: Some("Analytical Engines".into()),
            phone: None,
            budget: Some("25k-50k".into()),
            timeline: None,
            message: "We need a new platform.".into(),
            status: ContactStatus::New,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn test_confirmation_link_trims_trailing_slash() {
        assert_eq!(
            composer().confirmation_link("abc.def"),
            "https://consult.example/api/newsletter?token=abc.def"
        );
    }

    #[test]
    fn test_contact_notification_goes_to_team() {
        let message = composer().contact_notification(&submission());

        assert_eq!(message.to, "team@consult.example");
        assert_eq!(message.from, "hello@consult.example");
        assert!(message.body.contains("Company: Analytical Engines"));
        assert!(message.body.contains("Budget: 25k-50k"));
        assert!(!message.body.contains("Phone:"));
    }

    #[test]
    fn test_acknowledgement_goes_to_submitter() {
        let message = composer().contact_acknowledgement(&submission());
        assert_eq!(message.to, "ada@example.com");
        assert_eq!(message.kind, "contact_acknowledgement");
    }

    #[test]
    fn test_newsletter_confirmation_carries_link() {
        let message = composer().newsletter_confirmation("reader@example.com", "tok.sig", 48);
        assert!(message.body.contains("?token=tok.sig"));
        assert!(message.body.contains("48 hours"));
    }
}
