//! Hard-window rate limiting.
//!
//! # Algorithm
//!
//! Each client key owns a [`RateLimitEntry`] holding a request count and the
//! instant its window started:
//!
//! - first request from a key: entry created with `count = 1`
//! - window elapsed (`now - window_start >= window`): entry reset to
//!   `count = 1`, the count is never decremented
//! - otherwise the count is incremented, and the request is limited once the
//!   count exceeds `max_requests`
//!
//! This is a fixed window, not a leaky bucket: a client can send
//! `max_requests` at the very end of one window and again at the start of the
//! next.
//!
//! # Concurrency
//!
//! Entries live in a `DashMap`; each check holds the entry's shard lock for
//! the read-modify-write, so concurrent requests from one key are counted
//! exactly within this process. Counters are not shared across processes,
//! so a multi-instance deployment gets one budget per instance.
//!
//! # Eviction
//!
//! Entries are only reset lazily by the owning key. [`RateLimiter::sweep`]
//! drops entries whose window has elapsed; the application state runs it
//! periodically in the background.
//!
//! # Response Headers
//!
//! On rejection (429):
//! - `Retry-After`: Seconds until the window for this key resets
//! - `X-RateLimit-Limit`: Configured request ceiling
//! - `X-RateLimit-Remaining`: Always `0`

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tracing::warn;

use super::chain::Middleware;
use super::ip::client_key;
use crate::error::AppError;
use crate::metrics;

/// Source of the current instant, injectable for tests.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Wall clock, read through Tokio so a paused test runtime controls it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Per-key counter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Instant,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_limited(&self) -> bool {
        matches!(self, RateLimitDecision::Limited { .. })
    }
}

/// In-memory hard-window rate limiter keyed by client identifier.
pub struct RateLimiter<C: Clock = SystemClock> {
    entries: DashMap<String, RateLimitEntry>,
    clock: C,
}

impl RateLimiter<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for RateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Count a request from `key` and decide whether it is over the limit.
    pub fn check(&self, key: &str, window: Duration, max_requests: u32) -> RateLimitDecision {
        let now = self.clock.now();
        let fresh = RateLimitEntry {
            count: 1,
            window_start: now,
        };

        match self.entries.entry(key.to_owned()) {
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                RateLimitDecision::Allowed {
                    remaining: max_requests.saturating_sub(1),
                }
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                let elapsed = now.saturating_duration_since(entry.window_start);

                if elapsed >= window {
                    *entry = fresh;
                    return RateLimitDecision::Allowed {
                        remaining: max_requests.saturating_sub(1),
                    };
                }

                entry.count = entry.count.saturating_add(1);
                if entry.count > max_requests {
                    RateLimitDecision::Limited {
                        retry_after: window - elapsed,
                    }
                } else {
                    RateLimitDecision::Allowed {
                        remaining: max_requests - entry.count,
                    }
                }
            }
        }
    }

    /// `true` when this request from `key` exceeds `max_requests` within `window`.
    pub fn is_rate_limited(&self, key: &str, window: Duration, max_requests: u32) -> bool {
        self.check(key, window, max_requests).is_limited()
    }

    /// Current entry for `key`, if any.
    pub fn entry(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|e| *e)
    }

    /// Remove entries whose window has elapsed. Returns how many were removed.
    pub fn sweep(&self, window: Duration) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.window_start) < window);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A named request ceiling over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub name: &'static str,
    pub window: Duration,
    /// `0` disables the policy
    pub max_requests: u32,
}

impl RateLimitPolicy {
    pub fn new(name: &'static str, window: Duration, max_requests: u32) -> Self {
        Self {
            name,
            window,
            max_requests,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_requests > 0 && !self.window.is_zero()
    }
}

/// Middleware that rejects clients over their policy with `429`.
pub struct RateLimit<C: Clock = SystemClock> {
    limiter: Arc<RateLimiter<C>>,
    policy: RateLimitPolicy,
}

impl<C: Clock> RateLimit<C> {
    pub fn new(limiter: Arc<RateLimiter<C>>, policy: RateLimitPolicy) -> Self {
        Self { limiter, policy }
    }
}

impl<C: Clock> Middleware for RateLimit<C> {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn inspect(&self, req: &Request<Body>) -> Option<Response> {
        if !self.policy.is_enabled() {
            return None;
        }

        let key = client_key(req);
        match self
            .limiter
            .check(&key, self.policy.window, self.policy.max_requests)
        {
            RateLimitDecision::Allowed { .. } => None,
            RateLimitDecision::Limited { retry_after } => {
                let retry_after_secs = retry_after_secs(retry_after);

                warn!(
                    client_key = %key,
                    path = %req.uri().path(),
                    policy = self.policy.name,
                    retry_after_secs,
                    "Rate limit exceeded"
                );
                metrics::record_rate_limited(self.policy.name);

                Some(
                    AppError::RateLimited {
                        retry_after_secs,
                        limit: self.policy.max_requests,
                    }
                    .into_response(),
                )
            }
        }
    }
}

/// Whole seconds to advertise in `Retry-After`, rounded up, at least 1.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    let secs = if retry_after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    };
    secs.max(1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    fn limiter() -> (RateLimiter<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (RateLimiter::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_allows_up_to_max_requests() {
        let (limiter, _) = limiter();

        for _ in 0..5 {
            assert!(!limiter.is_rate_limited("1.2.3.4", WINDOW, 5));
        }
        assert!(limiter.is_rate_limited("1.2.3.4", WINDOW, 5));
    }

    #[test]
    fn test_keys_are_independent() {
        let (limiter, _) = limiter();

        assert!(!limiter.is_rate_limited("a", WINDOW, 1));
        assert!(limiter.is_rate_limited("a", WINDOW, 1));
        assert!(!limiter.is_rate_limited("b", WINDOW, 1));
    }

    #[test]
    fn test_window_elapse_resets_count_to_one() {
        let (limiter, clock) = limiter();

        for _ in 0..4 {
            limiter.check("client", WINDOW, 3);
        }
        assert_eq!(limiter.entry("client").unwrap().count, 4);

        clock.advance(WINDOW);

        assert!(!limiter.is_rate_limited("client", WINDOW, 3));
        assert_eq!(limiter.entry("client").unwrap().count, 1);
    }

    #[test]
    fn test_still_limited_just_before_window_ends() {
        let (limiter, clock) = limiter();

        limiter.check("client", WINDOW, 1);
        clock.advance(WINDOW - Duration::from_millis(1));

        assert!(limiter.is_rate_limited("client", WINDOW, 1));
    }

    #[test]
    fn test_retry_after_is_remaining_window() {
        let (limiter, clock) = limiter();

        limiter.check("client", WINDOW, 1);
        clock.advance(Duration::from_secs(45));

        assert_eq!(
            limiter.check("client", WINDOW, 1),
            RateLimitDecision::Limited {
                retry_after: Duration::from_secs(15)
            }
        );
    }

    #[test]
    fn test_remaining_counts_down() {
        let (limiter, _) = limiter();

        assert_eq!(
            limiter.check("client", WINDOW, 3),
            RateLimitDecision::Allowed { remaining: 2 }
        );
        assert_eq!(
            limiter.check("client", WINDOW, 3),
            RateLimitDecision::Allowed { remaining: 1 }
        );
    }

    #[test]
    fn test_sweep_removes_only_elapsed_entries() {
        let (limiter, clock) = limiter();

        limiter.check("old", WINDOW, 10);
        clock.advance(Duration::from_secs(30));
        limiter.check("new", WINDOW, 10);
        clock.advance(Duration::from_secs(30));

        assert_eq!(limiter.sweep(WINDOW), 1);
        assert!(limiter.entry("old").is_none());
        assert!(limiter.entry("new").is_some());
    }

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::from_millis(1500)), 2);
        assert_eq!(retry_after_secs(Duration::from_secs(3)), 3);
        assert_eq!(retry_after_secs(Duration::from_millis(10)), 1);
    }

    #[test]
    fn test_middleware_rejects_over_limit() {
        let (limiter, _) = limiter();
        let middleware = RateLimit::new(
            Arc::new(limiter),
            RateLimitPolicy::new("test", WINDOW, 1),
        );
        let req = || {
            Request::builder()
                .header("x-forwarded-for", "198.51.100.7")
                .body(Body::empty())
                .unwrap()
        };

        assert!(middleware.inspect(&req()).is_none());

        let response = middleware.inspect(&req()).unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
    }

    #[test]
    fn test_disabled_policy_never_limits() {
        let (limiter, _) = limiter();
        let limiter = Arc::new(limiter);
        let middleware = RateLimit::new(limiter.clone(), RateLimitPolicy::new("off", WINDOW, 0));

        for _ in 0..10 {
            let req = Request::builder().body(Body::empty()).unwrap();
            assert!(middleware.inspect(&req).is_none());
        }
        assert!(limiter.is_empty());
    }
}
