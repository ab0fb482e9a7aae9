//! Form rules for each profile section.
//!
//! Each validator returns every failed rule, in field order. An empty list
//! means the section can be submitted. Lengths count characters.

use auth::validators::is_valid_email;
use time::Date;

use super::avatars::find_avatar;
use super::types::{AddressInfo, BasicInfo, EmailChange, FieldError, PasswordChange};

pub const NICKNAME_MAX: usize = 20;
pub const BIO_MAX: usize = 200;
pub const ADDRESS_MIN: usize = 5;
pub const ADDRESS_MAX: usize = 100;
pub const NEW_PASSWORD_MIN: usize = 8;

fn fail(errors: &mut Vec<FieldError>, field: &'static str, message: &'static str) {
    errors.push(FieldError { field, message });
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

#[must_use]
pub fn validate_basic(info: &BasicInfo, today: Date) -> Vec<FieldError> {
    let mut errors = Vec::new();
    match char_len(&info.nickname) {
        0 => fail(&mut errors, "nickname", "Nickname is required"),
        n if n > NICKNAME_MAX => fail(&mut errors, "nickname", "Nickname must be at most 20 characters"),
        _ => {}
    }
    if find_avatar(&info.avatar).is_none() {
        fail(&mut errors, "avatar", "Please choose an avatar");
    }
    match info.birthday {
        None => fail(&mut errors, "birthday", "Please choose a birthday"),
        Some(birthday) if birthday >= today => fail(&mut errors, "birthday", "Birthday must be before today"),
        Some(_) => {}
    }
    if char_len(&info.bio) > BIO_MAX {
        fail(&mut errors, "bio", "Bio must be at most 200 characters");
    }
    errors
}

#[must_use]
pub fn validate_address(info: &AddressInfo) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if info.province.is_empty() {
        fail(&mut errors, "province", "Please choose a province");
    }
    if info.city.is_empty() {
        fail(&mut errors, "city", "Please choose a city");
    }
    if info.district.is_empty() {
        fail(&mut errors, "district", "Please choose a district");
    }
    let len = char_len(&info.detailed_address);
    if len < ADDRESS_MIN {
        fail(&mut errors, "detailed_address", "Detailed address must be at least 5 characters");
    } else if len > ADDRESS_MAX {
        fail(&mut errors, "detailed_address", "Detailed address must be at most 100 characters");
    }
    errors
}

#[must_use]
pub fn validate_password_change(change: &PasswordChange) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if change.old_password.is_empty() {
        fail(&mut errors, "old_password", "Please enter your current password");
    }
    let new = &change.new_password;
    if char_len(new) < NEW_PASSWORD_MIN {
        fail(&mut errors, "new_password", "New password must be at least 8 characters");
    }
    if !new.chars().any(|c| c.is_ascii_uppercase()) {
        fail(&mut errors, "new_password", "New password must contain an uppercase letter");
    }
    if !new.chars().any(|c| c.is_ascii_lowercase()) {
        fail(&mut errors, "new_password", "New password must contain a lowercase letter");
    }
    if !new.chars().any(|c| c.is_ascii_digit()) {
        fail(&mut errors, "new_password", "New password must contain a digit");
    }
    if change.confirm_password != *new {
        fail(&mut errors, "confirm_password", "Passwords do not match");
    }
    errors
}

#[must_use]
pub fn validate_email_change(change: &EmailChange) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if change.password.is_empty() {
        fail(&mut errors, "password", "Please enter your password to verify your identity");
    }
    if !is_valid_email(&change.new_email) {
        fail(&mut errors, "new_email", "Please enter a valid email address");
    }
    errors
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;
