//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. In production, configure via environment variables or a `.env` file.
//!
//! # Security Configuration
//!
//! - `ADMIN_API_TOKEN`: When set, the submission listings require `Authorization: Bearer <token>`
//! - `NEWSLETTER_TOKEN_SECRET`: HMAC key for confirmation links. When unset a random
//!   key is generated at startup, so links do not survive a restart
//! - `CORS_ALLOWED_ORIGINS`: Comma-separated list of allowed origins (default: `*` for dev)
//!
//! # Rate Limiting
//!
//! Two hard-window policies, each disabled by setting its maximum to 0:
//!
//! - `RATE_LIMIT_WINDOW_MS` / `RATE_LIMIT_MAX_REQUESTS`: every API route (default: 100 per minute)
//! - `SUBMIT_RATE_LIMIT_WINDOW_MS` / `SUBMIT_RATE_LIMIT_MAX_REQUESTS`: form submissions
//!   (default: 5 per 15 minutes)

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::middleware::RateLimitPolicy;
use crate::validation::is_valid_email;

/// Longest accepted confirmation link lifetime (one year).
pub const MAX_NEWSLETTER_TOKEN_TTL_HOURS: u32 = 24 * 365;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `pretty` or `json`, got `{other}`")),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    /// Public base URL used to build links in outgoing emails
    pub base_url: String,

    // =========================================================================
    // Email Configuration
    // =========================================================================
    /// `From` address of outgoing email
    pub sender_email: String,

    /// Recipient of new contact submission notices
    pub contact_notify_email: String,

    /// Upper bound on a single email send (default: 10 seconds)
    pub email_timeout: Duration,

    // =========================================================================
    // Rate Limiting Configuration
    // =========================================================================
    pub rate_limit_window: Duration,

    /// Requests per window per client on API routes (0 = disabled)
    pub rate_limit_max_requests: u32,

    pub submit_rate_limit_window: Duration,

    /// Submissions per window per client on form routes (0 = disabled)
    pub submit_rate_limit_max_requests: u32,

    /// How often expired limiter entries are evicted (default: 60 seconds)
    pub rate_limit_sweep_interval: Duration,

    // =========================================================================
    // Request Limits Configuration
    // =========================================================================
    /// Maximum request body size in bytes (default: 64KB)
    pub max_request_body_size: usize,

    /// Time allowed to receive a full request body (default: 10 seconds)
    pub body_read_timeout: Duration,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// Bearer token guarding the submission listings
    pub admin_api_token: Option<String>,

    pub newsletter_token_secret: Option<String>,

    /// Lifetime of a newsletter confirmation link in hours (default: 48)
    pub newsletter_token_ttl_hours: u32,

    /// Comma-separated list of allowed CORS origins
    /// Use "*" to allow all origins (not recommended for production)
    pub cors_allowed_origins: Vec<String>,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    pub log_format: LogFormat,

    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any value cannot be parsed or the
    /// resulting configuration is inconsistent.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or(defaults.host),
            port: Self::parse_env("PORT", defaults.port)?,
            base_url: env::var("BASE_URL").unwrap_or(defaults.base_url),

            // Email
            sender_email: env::var("SENDER_EMAIL").unwrap_or(defaults.sender_email),
            contact_notify_email: env::var("CONTACT_NOTIFY_EMAIL")
                .unwrap_or(defaults.contact_notify_email),
            email_timeout: Duration::from_millis(Self::parse_env("EMAIL_TIMEOUT_MS", 10_000)?),

            // Rate limiting
            rate_limit_window: Duration::from_millis(Self::parse_env(
                "RATE_LIMIT_WINDOW_MS",
                60_000,
            )?),
            rate_limit_max_requests: Self::parse_env(
                "RATE_LIMIT_MAX_REQUESTS",
                defaults.rate_limit_max_requests,
            )?,
            submit_rate_limit_window: Duration::from_millis(Self::parse_env(
                "SUBMIT_RATE_LIMIT_WINDOW_MS",
                15 * 60_000,
            )?),
            submit_rate_limit_max_requests: Self::parse_env(
                "SUBMIT_RATE_LIMIT_MAX_REQUESTS",
                defaults.submit_rate_limit_max_requests,
            )?,
            rate_limit_sweep_interval: Duration::from_secs(Self::parse_env(
                "RATE_LIMIT_SWEEP_INTERVAL_SECS",
                60,
            )?),

            // Request limits
            max_request_body_size: Self::parse_env(
                "MAX_REQUEST_BODY_SIZE",
                defaults.max_request_body_size,
            )?,
            body_read_timeout: Duration::from_millis(Self::parse_env(
                "BODY_READ_TIMEOUT_MS",
                10_000,
            )?),

            // Security
            admin_api_token: env::var("ADMIN_API_TOKEN").ok().filter(|t| !t.is_empty()),
            newsletter_token_secret: env::var("NEWSLETTER_TOKEN_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            newsletter_token_ttl_hours: Self::parse_env(
                "NEWSLETTER_TOKEN_TTL_HOURS",
                defaults.newsletter_token_ttl_hours,
            )?,
            cors_allowed_origins: Self::parse_cors_origins(),

            // Observability
            log_level: env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: Self::parse_env("LOG_FORMAT", defaults.log_format)?,
            metrics_port: Self::parse_env("METRICS_PORT", defaults.metrics_port)?,
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    pub fn validate(&self) -> AppResult<()> {
        if self.max_request_body_size == 0 {
            return Err(AppError::ConfigError(
                "MAX_REQUEST_BODY_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.body_read_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "BODY_READ_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        if self.email_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "EMAIL_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_sweep_interval.is_zero() {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_SWEEP_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_max_requests > 0 && self.rate_limit_window.is_zero() {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_WINDOW_MS must be greater than 0 when rate limiting is enabled"
                    .to_string(),
            ));
        }

        if self.submit_rate_limit_max_requests > 0 && self.submit_rate_limit_window.is_zero() {
            return Err(AppError::ConfigError(
                "SUBMIT_RATE_LIMIT_WINDOW_MS must be greater than 0 when rate limiting is enabled"
                    .to_string(),
            ));
        }

        if self.newsletter_token_ttl_hours == 0
            || self.newsletter_token_ttl_hours > MAX_NEWSLETTER_TOKEN_TTL_HOURS
        {
            return Err(AppError::ConfigError(format!(
                "NEWSLETTER_TOKEN_TTL_HOURS must be between 1 and {MAX_NEWSLETTER_TOKEN_TTL_HOURS}"
            )));
        }

        url::Url::parse(&self.base_url)
            .map_err(|e| AppError::ConfigError(format!("Invalid BASE_URL: {e}")))?;

        for (name, value) in [
            ("SENDER_EMAIL", &self.sender_email),
            ("CONTACT_NOTIFY_EMAIL", &self.contact_notify_email),
        ] {
            if !is_valid_email(value) {
                return Err(AppError::ConfigError(format!(
                    "{name} must be a valid email address"
                )));
            }
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Policy applied to every API route.
    pub fn api_rate_limit(&self) -> RateLimitPolicy {
        RateLimitPolicy::new("api", self.rate_limit_window, self.rate_limit_max_requests)
    }

    /// Stricter policy applied to form submissions.
    pub fn submit_rate_limit(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(
            "submit",
            self.submit_rate_limit_window,
            self.submit_rate_limit_max_requests,
        )
    }

    /// Check if the admin token guards the submission listings.
    pub fn admin_auth_enabled(&self) -> bool {
        self.admin_api_token.is_some()
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        if self.metrics_enabled() {
            Some(SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
        } else {
            None
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse CORS allowed origins from environment variable.
    fn parse_cors_origins() -> Vec<String> {
        env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            // Email
            sender_email: "hello@consultancy.example".to_string(),
            contact_notify_email: "team@consultancy.example".to_string(),
            email_timeout: Duration::from_secs(10),
            // Rate limiting
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max_requests: 100,
            submit_rate_limit_window: Duration::from_secs(15 * 60),
            submit_rate_limit_max_requests: 5,
            rate_limit_sweep_interval: Duration::from_secs(60),
            // Request limits
            max_request_body_size: 64 * 1024, // 64KB
            body_read_timeout: Duration::from_secs(10),
            // Security
            admin_api_token: None,
            newsletter_token_secret: None,
            newsletter_token_ttl_hours: 48,
            cors_allowed_origins: vec!["*".to_string()],
            // Observability
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: 9090,
        }
    }
}
