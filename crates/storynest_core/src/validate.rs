//! crates/storynest_core/src/validate.rs
//!
//! Field format rules shared by the registration, password-reset, and story
//! handlers. Each rule returns a message suitable for the JSON failure
//! envelope verbatim.

use regex::Regex;
use std::sync::LazyLock;

/// A field failed its format rule. The message is user-facing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 20;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const TITLE_MAX_LEN: usize = 100;
pub const CONTENT_MIN_LEN: usize = 100;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,20}$").expect("valid username regex"));

// Pragmatic shape check, not full RFC 5322.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// 3-20 characters, alphanumeric plus underscore and hyphen.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "Username must be 3-20 characters and contain only letters, numbers, underscores, or hyphens",
        ))
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::new("Please provide a valid email address"))
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() >= PASSWORD_MIN_LEN {
        Ok(())
    } else {
        Err(ValidationError::new(
            "Password must be at least 8 characters long",
        ))
    }
}

/// Non-empty and at most 100 characters.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::new("Title is required"));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(ValidationError::new(
            "Title must be at most 100 characters",
        ));
    }
    Ok(())
}

/// At least 100 characters.
pub fn validate_content(content: &str) -> Result<(), ValidationError> {
    if content.chars().count() < CONTENT_MIN_LEN {
        return Err(ValidationError::new(
            "Story content must be at least 100 characters",
        ));
    }
    Ok(())
}

/// Email addresses are compared and stored lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(validate_username("reader_1").is_ok());
        assert!(validate_username("a-b-c").is_ok());
        assert!(validate_username("ab").is_err()); // too short
        assert!(validate_username(&"x".repeat(21)).is_err()); // too long
        assert!(validate_username("has space").is_err());
        assert!(validate_username("semi;colon").is_err());
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("spaces in@mail.com").is_err());
        assert!(validate_email("missing@tld").is_err());
    }

    #[test]
    fn password_minimum_length() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn content_boundary_is_exactly_100() {
        assert!(validate_content(&"x".repeat(99)).is_err());
        assert!(validate_content(&"x".repeat(100)).is_ok());
    }

    #[test]
    fn title_boundary_is_exactly_100() {
        assert!(validate_title(&"t".repeat(100)).is_ok());
        assert!(validate_title(&"t".repeat(101)).is_err());
        assert!(validate_title("   ").is_err());
    }

    #[test]
    fn emails_normalize_to_lowercase() {
        assert_eq!(normalize_email("  Reader@Example.COM "), "reader@example.com");
    }
}
