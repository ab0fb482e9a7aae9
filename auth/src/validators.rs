//! Form field validators. Each returns the message to show, or `None`.

use std::sync::LazyLock;

use regex::Regex;

pub const MIN_PASSWORD_LEN: usize = 8;

pub const MSG_EMAIL_REQUIRED: &str = "Email is required";
pub const MSG_EMAIL_INVALID: &str = "Please enter a valid email address";
pub const MSG_PASSWORD_REQUIRED: &str = "Password is required";
pub const MSG_PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters";
pub const MSG_CONFIRM_REQUIRED: &str = "Please confirm your password";
pub const MSG_PASSWORD_MISMATCH: &str = "Passwords do not match";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[must_use]
pub fn validate_email(email: &str) -> Option<&'static str> {
    if email.trim().is_empty() {
        return Some(MSG_EMAIL_REQUIRED);
    }
    if !is_valid_email(email) {
        return Some(MSG_EMAIL_INVALID);
    }
    None
}

/// Length is counted in characters, not bytes.
#[must_use]
pub fn validate_password_strength(password: &str) -> Option<&'static str> {
    if password.trim().is_empty() {
        return Some(MSG_PASSWORD_REQUIRED);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Some(MSG_PASSWORD_TOO_SHORT);
    }
    None
}

#[must_use]
pub fn validate_password_match(password: &str, confirmation: &str) -> Option<&'static str> {
    if confirmation.trim().is_empty() {
        return Some(MSG_CONFIRM_REQUIRED);
    }
    if password != confirmation {
        return Some(MSG_PASSWORD_MISMATCH);
    }
    None
}

#[cfg(test)]
#[path = "validators_test.rs"]
mod tests;
