//! Shared application state for Axum handlers.
//!
//! This module provides thread-safe, clonable state that is shared across
//! all request handlers. It includes:
//!
//! - **Stores**: Repositories for submissions, subscriptions, content, accounts
//! - **Rate Limiters**: One hard-window limiter per policy
//! - **Email**: Composer and background dispatcher
//! - **Tokens**: Newsletter confirmation token signer
//! - **Configuration**: Runtime configuration access
//!
//! # Structured Concurrency
//!
//! Background tasks (limiter sweeps, email sends) are managed using
//! `tokio_util::task::TaskTracker` and `CancellationToken`. Call `shutdown()`
//! to stop the sweeps and wait for in-flight emails before exit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::FromRef;
use rand::distr::{Alphanumeric, SampleString};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::email::{EmailComposer, EmailDispatcher, LogMailer, Mailer};
use crate::error::AppResult;
use crate::metrics;
use crate::middleware::RateLimiter;
use crate::models::seed_content;
use crate::store::Stores;
use crate::token::ConfirmationTokens;

/// Shared application state for Axum handlers.
///
/// # Lifecycle
///
/// Background tasks are spawned when the state is created, so it must be
/// built inside a Tokio runtime. Call `shutdown()` before dropping:
///
/// ```rust,ignore
/// let state = AppState::new(config)?;
/// // ... serve ...
/// state.shutdown().await;
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    pub stores: Stores,
    /// Limiter for the general API policy
    pub api_limiter: Arc<RateLimiter>,
    /// Limiter for the form submission policy
    pub submit_limiter: Arc<RateLimiter>,
    pub composer: Arc<EmailComposer>,
    pub emails: EmailDispatcher,
    pub tokens: ConfirmationTokens,
    /// Timestamp when the application started
    pub started_at: Instant,
    /// Tracks spawned background tasks for graceful shutdown
    task_tracker: TaskTracker,
    /// Cancellation token for signaling background tasks to stop
    cancellation_token: CancellationToken,
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.config)
    }
}

impl AppState {
    /// State with in-memory stores seeded with demo content and a logging
    /// mailer.
    pub fn new(config: Config) -> AppResult<Self> {
        Self::with_parts(
            config,
            Stores::in_memory(seed_content()),
            Arc::new(LogMailer::new()),
        )
    }

    /// State with explicit stores and mailer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if the configuration fails
    /// [`Config::validate`] or the token secret is unusable.
    pub fn with_parts(config: Config, stores: Stores, mailer: Arc<dyn Mailer>) -> AppResult<Self> {
        config.validate()?;

        let tokens = ConfirmationTokens::new(
            &token_secret(&config),
            chrono::Duration::hours(i64::from(config.newsletter_token_ttl_hours)),
        )?;

        if !config.admin_auth_enabled() {
            warn!(
                "ADMIN_API_TOKEN is not set: submission listings are readable without authentication"
            );
        }

        let task_tracker = TaskTracker::new();
        let emails = EmailDispatcher::new(mailer, task_tracker.clone(), config.email_timeout);
        let composer = Arc::new(EmailComposer::new(
            config.sender_email.clone(),
            config.contact_notify_email.clone(),
            config.base_url.clone(),
        ));

        let state = Self {
            config: Arc::new(config),
            stores,
            api_limiter: Arc::new(RateLimiter::new()),
            submit_limiter: Arc::new(RateLimiter::new()),
            composer,
            emails,
            tokens,
            started_at: Instant::now(),
            task_tracker,
            cancellation_token: CancellationToken::new(),
        };

        state.spawn_sweep_task();

        Ok(state)
    }

    /// Spawn the background task evicting elapsed limiter entries.
    ///
    /// The task is tracked by `task_tracker` and respects `cancellation_token`
    /// for graceful shutdown.
    fn spawn_sweep_task(&self) {
        let limiters = [
            (Arc::clone(&self.api_limiter), self.config.rate_limit_window),
            (
                Arc::clone(&self.submit_limiter),
                self.config.submit_rate_limit_window,
            ),
        ];
        let every = self.config.rate_limit_sweep_interval;
        let cancel = self.cancellation_token.clone();

        self.task_tracker.spawn(async move {
            let mut ticker = interval(every);
            ticker.tick().await; // Skip first immediate tick

            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        debug!("Rate limit sweep task received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let (removed, remaining) = sweep_all(&limiters);
                        trace!(removed, remaining, "Rate limit sweep completed");
                        metrics::set_rate_limit_keys(remaining);
                    }
                }
            }

            debug!("Rate limit sweep task shutting down");
        });
    }

    /// Gracefully shutdown all background tasks.
    ///
    /// This method:
    /// 1. Signals the sweep task to stop via cancellation token
    /// 2. Closes the task tracker
    /// 3. Waits for the sweep and any in-flight email sends to complete
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown of background tasks");

        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        info!("All background tasks have completed");
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

/// Sweep each limiter with its own window; returns (removed, remaining).
fn sweep_all(limiters: &[(Arc<RateLimiter>, Duration)]) -> (usize, usize) {
    limiters
        .iter()
        .fold((0, 0), |(removed, remaining), (limiter, window)| {
            (removed + limiter.sweep(*window), remaining + limiter.len())
        })
}

const EPHEMERAL_SECRET_LEN: usize = 48;

fn token_secret(config: &Config) -> String {
    match &config.newsletter_token_secret {
        Some(secret) => secret.clone(),
        None => {
            warn!(
                "NEWSLETTER_TOKEN_SECRET is not set: using a random key, confirmation links will not survive a restart"
            );
            Alphanumeric.sample_string(&mut rand::rng(), EPHEMERAL_SECRET_LEN)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_state_seeds_content() {
        let state = AppState::new(Config::default()).unwrap();

        let page = state
            .stores
            .content
            .list(&crate::models::ContentQuery::default())
            .await
            .unwrap();
        assert_eq!(page.pagination.total as usize, seed_content().len());

        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_config_reachable_from_state() {
        let state = AppState::new(Config::default()).unwrap();

        let config = Arc::<Config>::from_ref(&state);
        assert!(Arc::ptr_eq(&config, &state.config));

        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_configured_secret_is_stable() {
        let config = Config {
            newsletter_token_secret: Some("fixed".to_string()),
            ..Config::default()
        };
        let a = AppState::new(config.clone()).unwrap();
        let b = AppState::new(config).unwrap();

        let now = chrono::Utc::now();
        let token = a.tokens.issue("reader@example.com", now);
        assert_eq!(b.tokens.verify(&token, now).unwrap(), "reader@example.com");

        a.shutdown().await;
        b.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = Config {
            newsletter_token_ttl_hours: u32::MAX,
            ..Config::default()
        };

        let err = AppState::new(config).unwrap_err();
        assert!(matches!(err, crate::error::AppError::ConfigError(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_task_evicts_entries() {
        let config = Config {
            rate_limit_window: Duration::from_secs(1),
            rate_limit_sweep_interval: Duration::from_secs(5),
            ..Config::default()
        };
        let state = AppState::new(config).unwrap();
        state.api_limiter.check("client", Duration::from_secs(1), 10);
        assert_eq!(state.api_limiter.len(), 1);

        tokio::time::sleep(Duration::from_secs(6)).await;

        assert!(state.api_limiter.is_empty());
        state.shutdown().await;
    }
}
