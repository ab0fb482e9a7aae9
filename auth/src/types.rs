//! Domain types shared by every layer of the auth subsystem.
//!
//! DESIGN
//! ======
//! These are the application-facing shapes. Provider wire shapes live in
//! `provider` and are translated by `normalize`; nothing above the facade
//! ever sees a snake_case provider payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

// =============================================================================
// ERROR
// =============================================================================

/// Normalized failure of an auth operation.
///
/// `is_system_error` separates infrastructure failures (network, provider
/// outage, unexpected exception) from user-correctable rejections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{message} ({code})")]
pub struct AuthError {
    pub code: String,
    pub message: String,
    pub is_system_error: bool,
}

impl AuthError {
    /// Build a system error (surfaced globally as a notification).
    #[must_use]
    pub fn system(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into(), is_system_error: true }
    }

    /// Build a business error (rendered inline by the caller).
    #[must_use]
    pub fn business(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into(), is_system_error: false }
    }
}

/// Outcome of every facade operation: exactly one of data or error.
pub type AuthResult<T> = Result<T, AuthError>;

// =============================================================================
// USER / SESSION
// =============================================================================

/// Snapshot of the authenticated identity. Replaced wholesale on refresh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub email_confirmed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user_metadata: Map<String, Value>,
}

/// A provider-issued proof of authentication.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
    pub user: AuthUser,
}

/// Result of a successful sign-up.
#[derive(Clone, Debug, PartialEq)]
pub enum SignUpOutcome {
    /// The provider returned the new user record.
    Registered(AuthUser),
    /// The account exists but no user record is available until the
    /// confirmation email is acted upon.
    PendingConfirmation,
}

impl SignUpOutcome {
    #[must_use]
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Self::Registered(user) => Some(user),
            Self::PendingConfirmation => None,
        }
    }
}

// =============================================================================
// SESSION EVENTS
// =============================================================================

/// Why the provider's current session changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionChangeKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// Push notification emitted when the provider's session slot changes.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionChanged {
    pub kind: SessionChangeKind,
    pub session: Option<AuthSession>,
}
