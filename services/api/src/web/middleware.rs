//! services/api/src/web/middleware.rs
//!
//! The access-control gate for protected routes and the fixed-window rate
//! limiter applied to the `/api` prefix.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ApiError;
use crate::web::state::AppState;
use storynest_core::domain::User;

/// The authenticated identity attached to the request by `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Extract Bearer token from Authorization header
fn extract_bearer_token(authorization: &str) -> Option<&str> {
    authorization
        .strip_prefix("Bearer ")
        .or_else(|| authorization.strip_prefix("bearer "))
}

/// Middleware that validates the session token and resolves the user.
///
/// If valid, inserts the `CurrentUser` into request extensions for handlers to
/// use. If missing, invalid, expired, or pointing at a deleted account,
/// returns 401 before the handler body runs.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Auth("Authentication required".to_string()))?;

    let token = extract_bearer_token(authorization)
        .ok_or_else(|| ApiError::Auth("Authentication required".to_string()))?;

    let user_id = state.tokens.verify(token)?;

    let user = state
        .db
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::Auth("Invalid or expired session token".to_string()))?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

//=========================================================================================
// Rate Limiting
//=========================================================================================

/// Fixed-window request counter, keyed per client.
///
/// A window starts at a key's first request and counts for `window`; when the
/// window lapses the counter resets. Exceeding `max` within a window rejects
/// with 429 regardless of authentication state.
pub struct RateLimiter {
    max: u32,
    window: Duration,
    hits: DashMap<String, (Instant, u32)>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            hits: DashMap::new(),
        }
    }

    pub fn check(&self, key: &str) -> Result<(), ApiError> {
        let now = Instant::now();
        let mut entry = self
            .hits
            .entry(key.to_string())
            .or_insert((now, 0));
        let (window_start, count) = *entry;

        if now.duration_since(window_start) >= self.window {
            *entry = (now, 1);
            return Ok(());
        }
        if count >= self.max {
            return Err(ApiError::RateLimited);
        }
        entry.1 = count + 1;
        Ok(())
    }
}

/// Middleware applying the shared `RateLimiter` to every `/api` request.
///
/// Clients are keyed by the first `x-forwarded-for` hop when present (the
/// expected deployment sits behind a proxy), falling back to a single shared
/// bucket.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "unkeyed".to_string());

    state.limiter.check(&key)?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("Basic abc123"), None);
        assert_eq!(extract_bearer_token("abc123"), None);
    }

    #[test]
    fn limiter_rejects_above_max_within_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(limiter.check("1.2.3.4").is_ok());
        }
        assert!(limiter.check("1.2.3.4").is_err());
        // A different client has its own window.
        assert!(limiter.check("5.6.7.8").is_ok());
    }

    #[test]
    fn limiter_resets_after_the_window_lapses() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));
        assert!(limiter.check("k").is_ok());
        assert!(limiter.check("k").is_err());
        std::thread::sleep(Duration::from_millis(15));
        assert!(limiter.check("k").is_ok());
    }
}
