//! Profile record and the per-section edit payloads.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use super::avatars::DEFAULT_AVATAR;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

pub const DEFAULT_NICKNAME: &str = "User";
pub const DEFAULT_BIRTHDAY: Date = time::macros::date!(2000 - 01 - 01);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Secret,
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "secret" => Ok(Self::Secret),
            other => Err(format!("unknown gender '{other}' (expected male, female or secret)")),
        }
    }
}

/// Row of the `profiles` table. `id` is the auth user id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub nickname: String,
    pub avatar: String,
    pub gender: Gender,
    #[serde(with = "iso_date")]
    pub birthday: Date,
    #[serde(default)]
    pub bio: String,
    pub email: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub detailed_address: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Insert payload for a user signing in for the first time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewProfile {
    pub id: String,
    pub email: String,
    pub nickname: String,
    pub avatar: String,
    pub gender: Gender,
    #[serde(with = "iso_date")]
    pub birthday: Date,
    pub bio: String,
    pub province: String,
    pub city: String,
    pub district: String,
    pub detailed_address: String,
}

impl NewProfile {
    #[must_use]
    pub fn with_defaults(id: &str, email: &str) -> Self {
        Self {
            id: id.to_owned(),
            email: email.to_owned(),
            nickname: DEFAULT_NICKNAME.to_owned(),
            avatar: DEFAULT_AVATAR.to_owned(),
            gender: Gender::Secret,
            birthday: DEFAULT_BIRTHDAY,
            bio: String::new(),
            province: String::new(),
            city: String::new(),
            district: String::new(),
            detailed_address: String::new(),
        }
    }
}

// =============================================================================
// EDIT SECTIONS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BasicInfo {
    pub nickname: String,
    pub avatar: String,
    pub gender: Gender,
    #[serde(with = "iso_date::option")]
    pub birthday: Option<Date>,
    pub bio: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AddressInfo {
    pub province: String,
    pub city: String,
    pub district: String,
    pub detailed_address: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailChange {
    pub password: String,
    pub new_email: String,
}

/// One section of the profile page's edit form.
#[derive(Clone, Debug, PartialEq)]
pub enum ProfileUpdate {
    Basic(BasicInfo),
    Address(AddressInfo),
    Password(PasswordChange),
    Email(EmailChange),
}

/// A single failed form rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ProfileError {
    #[error("Not signed in")]
    NotSignedIn,
    #[error("{}", .0.first().map_or("Invalid input", |e| e.message))]
    Invalid(Vec<FieldError>),
    #[error("Current password is incorrect")]
    WrongPassword,
    #[error("Failed to create profile")]
    EmptyInsert,
    /// The cache was cleared while the load was in flight.
    #[error("Profile load was interrupted, please retry")]
    Superseded,
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("Network or system error: {0}")]
    Transport(String),
    #[error("unexpected profile response: {0}")]
    Decode(String),
    #[error(transparent)]
    Auth(#[from] auth::AuthError),
}
