/// JWT Claims structure
///
/// The payload of an access token: subject, issuer and the two
/// timestamps (RFC 7519 numeric dates).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TokenError;

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub iss: String,
}

impl Claims {
    /// Create claims issued at `now` and expiring `ttl` later
    ///
    /// A zero or negative `ttl` yields claims that are already expired.
    pub fn new(user_id: Uuid, now: i64, ttl: chrono::Duration, issuer: &str) -> Self {
        Self {
            sub: user_id.to_string(),
            exp: now + ttl.num_seconds(),
            iat: now,
            iss: issuer.to_string(),
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// Returns `Malformed` if the subject is not a valid UUID
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Malformed)
    }

    /// A token is expired from the second its `exp` is reached
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}
