//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: registration, login, and the password-reset flow.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{Duration, Utc};
use rand::RngCore;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::web::state::AppState;
use crate::web::views::{AuthView, Envelope, PublicUser};
use storynest_core::ports::NewUser;
use storynest_core::validate;

/// Reset tokens live for one hour.
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

//=========================================================================================
// Password Hashing
//=========================================================================================

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Random 32-byte hex token for the reset flow.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/users/register
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    validate::validate_username(&req.username)?;
    validate::validate_email(&req.email)?;
    validate::validate_password(&req.password)?;
    let email = validate::normalize_email(&req.email);

    if state.db.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Validation(
            "Email is already registered".to_string(),
        ));
    }
    if state
        .db
        .find_user_by_username(&req.username)
        .await?
        .is_some()
    {
        return Err(ApiError::Validation("Username is already taken".to_string()));
    }

    let hashed_password = hash_password(&req.password)?;
    let user = state
        .db
        .create_user(NewUser {
            username: req.username,
            email,
            hashed_password,
        })
        .await?;

    let token = state.tokens.issue(user.id, Utc::now())?;
    info!(username = %user.username, "new user registered");

    Ok((
        StatusCode::CREATED,
        Envelope::data(AuthView {
            token,
            user: PublicUser::from_domain(&user),
        }),
    ))
}

/// POST /api/users/login
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = validate::normalize_email(&req.email);

    // One undifferentiated message for unknown email and wrong password, so
    // the endpoint cannot be used to enumerate accounts.
    let invalid = || ApiError::Auth("Invalid email or password".to_string());

    let creds = state
        .db
        .credentials_by_email(&email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&req.password, &creds.hashed_password) {
        return Err(invalid());
    }

    let user = state
        .db
        .find_user_by_id(creds.id)
        .await?
        .ok_or_else(invalid)?;

    let token = state.tokens.issue(user.id, Utc::now())?;

    Ok(Envelope::data(AuthView {
        token,
        user: PublicUser::from_domain(&user),
    }))
}

/// POST /api/users/forgot-password
///
/// The reset token is never placed in the response; it goes to the
/// out-of-band delivery channel and the endpoint answers with a generic
/// acknowledgment.
pub async fn forgot_password_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = validate::normalize_email(&req.email);
    let user = state
        .db
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::NotFound("No account with that email".to_string()))?;

    let token = issue_reset_token(&state, user.id).await?;

    // Out-of-band delivery stub: a mailer would pick this up. The token is
    // intentionally absent from the HTTP response.
    info!(user_id = %user.id, reset_token = %token, "password reset token issued");

    Ok(Envelope::message(
        "A password reset link has been sent to your email",
    ))
}

/// Generates, stores, and returns a fresh reset token for in-process callers
/// (the delivery stub and tests).
pub async fn issue_reset_token(state: &AppState, user_id: uuid::Uuid) -> ApiResult<String> {
    let token = generate_reset_token();
    let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
    state.db.set_reset_token(user_id, &token, expires_at).await?;
    Ok(token)
}

/// POST /api/users/reset-password
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    validate::validate_password(&req.password)?;

    let hashed_password = hash_password(&req.password)?;
    let matched = state
        .db
        .reset_password_by_token(&req.token, &hashed_password, Utc::now())
        .await?;
    if !matched {
        return Err(ApiError::Validation(
            "Reset token is invalid or has expired".to_string(),
        ));
    }

    Ok(Envelope::message("Password has been reset"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hashing_round_trips() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same-input").unwrap();
        let b = hash_password("same-input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn reset_tokens_are_32_random_bytes_hex() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_reset_token());
    }
}
