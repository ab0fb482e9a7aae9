//! Boundary to the hosted auth provider.
//!
//! SYSTEM CONTEXT
//! ==============
//! The provider is an opaque remote procedure surface. Every call resolves in
//! one of three ways, modelled as nested results:
//! - `Err(ProviderException)`: the call itself failed (transport, decode).
//! - `Ok(Err(ProviderError))`: the provider answered with an error object.
//! - `Ok(Ok(payload))`: the provider answered with a (possibly absent) payload.
//!
//! Payloads keep the provider's snake_case wire shape; `normalize` owns the
//! translation into domain types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tokio::sync::broadcast;

use crate::types::SessionChangeKind;

// =============================================================================
// OUTCOMES
// =============================================================================

/// A provider call that did not produce an answer at all.
#[derive(Debug, thiserror::Error)]
pub enum ProviderException {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("response decode failed: {0}")]
    Decode(String),
    #[error("session storage failed: {0}")]
    Storage(String),
}

/// Error object returned by the provider. Every field is optional on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderError {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ProviderError {
    #[must_use]
    pub fn new(status: Option<u16>, code: &str, message: &str) -> Self {
        Self { status, code: Some(code.to_owned()), message: Some(message.to_owned()) }
    }
}

pub type ProviderReply<T> = Result<T, ProviderError>;
pub type ProviderCall<T> = Result<ProviderReply<T>, ProviderException>;

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub user_metadata: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    /// Unix seconds. Filled in on receipt when the provider omits it.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub token_type: String,
    pub user: RawUser,
}

/// Attributes accepted by the provider's user update endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Raw session-change notification pushed by the provider client.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderEvent {
    pub kind: SessionChangeKind,
    pub session: Option<RawSession>,
}

// =============================================================================
// PROVIDER TRAIT
// =============================================================================

/// Operations the auth subsystem consumes from the hosted provider.
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    /// Register an account. `None` means no user record is available yet.
    async fn sign_up(&self, email: &str, password: &str) -> ProviderCall<Option<RawUser>>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> ProviderCall<Option<RawSession>>;

    async fn sign_out(&self) -> ProviderCall<()>;

    async fn reset_password_for_email(&self, email: &str) -> ProviderCall<()>;

    /// Update attributes of the user that owns the current session.
    async fn update_user(&self, update: &UserUpdate) -> ProviderCall<Option<RawUser>>;

    /// Current session, refreshed first if it has expired.
    async fn get_session(&self) -> ProviderCall<Option<RawSession>>;

    /// Subscribe to session-change notifications.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}
