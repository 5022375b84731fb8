//! services/api/src/web/token.rs
//!
//! Signed, time-limited session tokens. A token carries only the user id and
//! the standard timestamps; everything else is resolved from the database on
//! each protected request.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Session lifetime (30 days).
pub const SESSION_TTL_DAYS: i64 = 30;

/// JWT claims for the session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies session tokens with a single HMAC secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs a 30-day session token for `user_id`.
    pub fn issue(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String, ApiError> {
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + Duration::days(SESSION_TTL_DAYS)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to sign session token: {e}")))
    }

    /// Verifies the signature and expiry; resolves to the owning user's id.
    pub fn verify(&self, token: &str) -> Result<Uuid, ApiError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims.sub)
            .map_err(|_| ApiError::Auth("Invalid or expired session token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify_to_the_same_user() {
        let tokens = TokenService::new("test-secret");
        let user_id = Uuid::new_v4();
        let token = tokens.issue(user_id, Utc::now()).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn garbage_and_foreign_signatures_are_rejected() {
        let tokens = TokenService::new("test-secret");
        assert!(tokens.verify("not-a-token").is_err());

        let other = TokenService::new("different-secret");
        let token = other.issue(Uuid::new_v4(), Utc::now()).unwrap();
        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let tokens = TokenService::new("test-secret");
        // Issued far enough in the past that the 30-day lifetime has lapsed.
        let issued_at = Utc::now() - Duration::days(SESSION_TTL_DAYS + 1);
        let token = tokens.issue(Uuid::new_v4(), issued_at).unwrap();
        assert!(tokens.verify(&token).is_err());
    }
}
