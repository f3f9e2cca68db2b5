use std::sync::Arc;
use std::time::Duration;

use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use super::{EmailMessage, Mailer};
use crate::metrics;

/// Fire-and-forget email sending on tracked tasks.
///
/// Every dispatched message runs on the shared [`TaskTracker`], so graceful
/// shutdown can wait for in-flight sends.
#[derive(Clone)]
pub struct EmailDispatcher {
    mailer: Arc<dyn Mailer>,
    tracker: TaskTracker,
    timeout: Duration,
}

impl std::fmt::Debug for EmailDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailDispatcher")
            .field("timeout", &self.timeout)
            .field("in_flight", &self.tracker.len())
            .finish_non_exhaustive()
    }
}

impl EmailDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, tracker: TaskTracker, timeout: Duration) -> Self {
        Self {
            mailer,
            tracker,
            timeout,
        }
    }

    /// Send `message` in the background. Returns immediately.
    pub fn dispatch(&self, message: EmailMessage) {
        let mailer = Arc::clone(&self.mailer);
        let timeout = self.timeout;

        self.tracker.spawn(async move {
            let outcome = match tokio::time::timeout(timeout, mailer.send(&message)).await {
                Ok(Ok(())) => {
                    info!(kind = message.kind, to = %message.to, "Email dispatched");
                    "sent"
                }
                Ok(Err(e)) => {
                    warn!(kind = message.kind, to = %message.to, error = %e, "Email dispatch failed");
                    "failed"
                }
                Err(_) => {
                    warn!(
                        kind = message.kind,
                        to = %message.to,
                        timeout_ms = timeout.as_millis() as u64,
                        "Email dispatch timed out"
                    );
                    "timeout"
                }
            };
            metrics::record_email(message.kind, outcome);
        });
    }
}
