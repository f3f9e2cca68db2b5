//! Outbound email.
//!
//! Handlers never wait on email. They build an [`EmailMessage`] with the
//! [`EmailComposer`] and hand it to the [`EmailDispatcher`], which sends it on
//! a tracked background task with a timeout. Failures are logged and counted,
//! never returned to the client.
//!
//! No real delivery backend is wired in: [`LogMailer`] logs each message and
//! keeps a copy in memory. A production backend only has to implement
//! [`Mailer`].

mod compose;
mod dispatch;

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

pub use compose::EmailComposer;
pub use dispatch::EmailDispatcher;

/// A plain-text email ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Label used in logs and metrics, e.g. `newsletter_confirmation`
    pub kind: &'static str,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Mailer that logs messages instead of delivering them.
#[derive(Debug, Default)]
pub struct LogMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
    delay: Option<Duration>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails with a transport error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Sleep for `delay` before each send.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Messages sent so far, oldest first.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(MailError::Transport("log mailer configured to fail".to_string()));
        }

        info!(
            kind = message.kind,
            to = %message.to,
            subject = %message.subject,
            "Email sent (log only)"
        );
        self.sent.lock().push(message.clone());
        Ok(())
    }
}
