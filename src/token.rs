//! Signed, expiring newsletter confirmation tokens.
//!
//! A token is `base64url(email "." expiry) "." base64url(HMAC-SHA256)`, where
//! `expiry` is a unix timestamp in seconds and the MAC covers the decoded
//! payload. Both halves use the URL-safe alphabet without padding, so the
//! token can be dropped into a query string as is.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature does not match")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token secret must not be empty")]
    EmptySecret,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::EmptySecret => AppError::ConfigError(err.to_string()),
            TokenError::Expired => AppError::BadRequest {
                code: "INVALID_TOKEN",
                message: "This confirmation link has expired".to_string(),
            },
            TokenError::Malformed | TokenError::BadSignature => AppError::BadRequest {
                code: "INVALID_TOKEN",
                message: "Invalid confirmation token".to_string(),
            },
        }
    }
}

/// Issues and verifies confirmation tokens with one secret.
#[derive(Clone)]
pub struct ConfirmationTokens {
    mac: HmacSha256,
    ttl: Duration,
}

impl std::fmt::Debug for ConfirmationTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationTokens")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ConfirmationTokens {
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        let mac =
            HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenError::EmptySecret)?;
        Ok(Self { mac, ttl })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `email`, valid until `now + ttl`.
    ///
    /// The expiry saturates at the latest representable instant.
    pub fn issue(&self, email: &str, now: DateTime<Utc>) -> String {
        let expires = now
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
            .timestamp();
        let payload = format!("{email}.{expires}");
        let signature = self.sign(payload.as_bytes());

        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    /// Verify `token` and return the email it was issued for.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let (payload_b64, signature_b64) = token.split_once('.').ok_or(TokenError::Malformed)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac.clone();
        mac.update(&payload);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let payload = String::from_utf8(payload).map_err(|_| TokenError::Malformed)?;
        let (email, expires) = payload.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let expires: i64 = expires.parse().map_err(|_| TokenError::Malformed)?;

        if email.is_empty() {
            return Err(TokenError::Malformed);
        }
        if now.timestamp() > expires {
            return Err(TokenError::Expired);
        }

        Ok(email.to_string())
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}
