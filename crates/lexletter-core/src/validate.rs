// Input validators.
//
// Pure functions with no locale or time dependence: the same input always
// produces the same verdict.

use std::sync::LazyLock;

use regex::Regex;
use subtle::ConstantTimeEq;

use crate::error::{Error, ErrorCode, Result};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Check for a conventional `local@domain.tld` shape.
pub fn validate_email(email: &str) -> Result<()> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(Error::validation(ErrorCode::InvalidEmail, "email"))
    }
}

/// Length bounds plus a basic strength rule: at least one lowercase letter,
/// one uppercase letter, and one digit.
pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(Error::validation(ErrorCode::PasswordTooShort, "password"));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(Error::validation(ErrorCode::PasswordTooLong, "password"));
    }
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if has_lower && has_upper && has_digit {
        Ok(())
    } else {
        Err(Error::validation(ErrorCode::WeakPassword, "password"))
    }
}

/// Names are at least two characters of letters and spaces.
pub fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    let valid = trimmed.len() >= 2
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c.is_ascii_whitespace());
    if valid {
        Ok(())
    } else {
        Err(Error::validation(ErrorCode::InvalidName, "fullName"))
    }
}

/// Constant-time comparison against the configured shared secret.
pub fn validate_admin_secret(provided: &str, expected: &str) -> Result<()> {
    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(Error::Authorization(ErrorCode::InvalidAdminSecret))
    }
}
