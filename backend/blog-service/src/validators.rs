use crate::error::{AppError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

/// Input validation helpers shared by request types

static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_-]{3,32}$").expect("hardcoded username regex is invalid - fix source code")
});

/// Path segments under `/users/` that cannot be claimed as usernames
const RESERVED_USERNAMES: &[&str] = &["me", "admin", "api", "settings"];

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;

/// Normalize an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate username format (3-32 characters, alphanumeric with - and _)
pub fn validate_username(username: &str) -> bool {
    USERNAME_REGEX.is_match(username)
        && !RESERVED_USERNAMES
            .iter()
            .any(|r| r.eq_ignore_ascii_case(username))
}

/// validator crate compatible custom validator for username shape
pub fn validate_username_shape(username: &str) -> std::result::Result<(), ValidationError> {
    if validate_username(username) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username"))
    }
}

/// Password policy: 8-128 characters with at least one letter and one digit
pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_LEN
        )));
    }
    if len > PASSWORD_MAX_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at most {} characters",
            PASSWORD_MAX_LEN
        )));
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        return Err(AppError::Validation(
            "Password must contain at least one letter and one digit".to_string(),
        ));
    }

    Ok(())
}

/// Six ASCII digits
pub fn validate_otp_code(code: &str) -> std::result::Result<(), ValidationError> {
    if code.len() == 6 && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_code"))
    }
}

/// Absolute http(s) URL, used for avatar and cover image links
pub fn validate_http_url(value: &str) -> std::result::Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(()),
        _ => Err(ValidationError::new("invalid_url")),
    }
}
