//! Signed user tokens
//!
//! Identity is carried as `Authorization: Bearer <token>` where
//!
//! ```text
//! token = <user_id>.<expires_at_ms>.<sha256_hex(user_id "." expires_at_ms "." secret)>
//! ```
//!
//! Issuing tokens belongs to the account service; this crate only provides the
//! shared signing routine so both sides agree on the format.
//!
//! # Pure Functions
//!
//! No HTTP framework dependencies here; extractors live in the server crate.

use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Numeric user identifier carried in tokens
pub type UserId = i64;

/// Default token lifetime (24 hours)
pub const DEFAULT_TOKEN_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Token validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Token expired at {expires_at_ms} (now {now_ms})")]
    Expired { expires_at_ms: i64, now_ms: i64 },

    #[error("Invalid token signature")]
    InvalidSignature,
}

/// Signs and verifies user tokens with a shared secret
#[derive(Clone)]
pub struct TokenSigner {
    secret: String,
    ttl_ms: i64,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl_ms", &self.ttl_ms)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl_ms: DEFAULT_TOKEN_TTL_MS,
        }
    }

    pub fn with_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    /// Issue a token for `user_id` valid for the configured lifetime
    pub fn issue(&self, user_id: UserId, now_ms: i64) -> String {
        let expires_at_ms = now_ms + self.ttl_ms;
        let signature = self.sign(user_id, expires_at_ms);
        format!("{}.{}.{}", user_id, expires_at_ms, signature)
    }

    /// Verify a token and return the user it names
    pub fn verify(&self, token: &str, now_ms: i64) -> Result<UserId, TokenError> {
        let mut parts = token.trim().splitn(3, '.');
        let (Some(user_part), Some(expiry_part), Some(signature)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let user_id: UserId = user_part.parse().map_err(|_| TokenError::Malformed)?;
        let expires_at_ms: i64 = expiry_part.parse().map_err(|_| TokenError::Malformed)?;
        if user_id <= 0 {
            return Err(TokenError::Malformed);
        }

        let expected = self.sign(user_id, expires_at_ms);
        if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
            return Err(TokenError::InvalidSignature);
        }

        if expires_at_ms <= now_ms {
            return Err(TokenError::Expired {
                expires_at_ms,
                now_ms,
            });
        }

        Ok(user_id)
    }

    fn sign(&self, user_id: UserId, expires_at_ms: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}.{}.{}", user_id, expires_at_ms, self.secret).as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Current Unix time in milliseconds
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
