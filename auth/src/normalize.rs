//! Result normalizer: provider outcomes into `AuthResult`.
//!
//! ERROR HANDLING
//! ==============
//! Exceptions are always system errors. Provider error objects are system
//! errors when they carry no status, a 5xx status, or network-failure markers;
//! everything else is a business error the caller renders inline.

use tracing::warn;

use crate::provider::{ProviderCall, ProviderError, ProviderException, RawSession, RawUser};
use crate::types::{AuthError, AuthResult, AuthSession, AuthUser};

pub const EXCEPTION_CODE: &str = "EXCEPTION";
pub const EXCEPTION_MESSAGE: &str = "Network or system error";
pub const NETWORK_FAILURE_CODE: &str = "NETWORK_FAILURE";
pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN_ERROR";
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Collapse a provider call into exactly one of data or error.
///
/// # Errors
///
/// Returns the classified [`AuthError`] when the call raised an exception or
/// the provider answered with an error object.
pub fn normalize<T>(call: ProviderCall<T>) -> AuthResult<T> {
    match call {
        Err(exception) => Err(from_exception(&exception)),
        Ok(Err(error)) => Err(classify(&error)),
        Ok(Ok(data)) => Ok(data),
    }
}

#[must_use]
pub fn from_exception(exception: &ProviderException) -> AuthError {
    warn!(error = %exception, "auth provider call raised");
    AuthError::system(EXCEPTION_MESSAGE, EXCEPTION_CODE)
}

#[must_use]
pub fn classify(error: &ProviderError) -> AuthError {
    let message = error.message.as_deref().unwrap_or(UNKNOWN_ERROR_MESSAGE);
    let code = error.code.as_deref().unwrap_or(UNKNOWN_ERROR_CODE);
    AuthError {
        code: code.to_owned(),
        message: message.to_owned(),
        is_system_error: is_system_failure(error),
    }
}

fn is_system_failure(error: &ProviderError) -> bool {
    let status_says_system = error.status.is_none_or(|status| status >= 500);
    let code_says_network = error.code.as_deref() == Some(NETWORK_FAILURE_CODE);
    let message_says_network = error.message.as_deref().is_some_and(|message| {
        let lower = message.to_ascii_lowercase();
        lower.contains("fetch") || lower.contains("network")
    });
    status_says_system || code_says_network || message_says_network
}

// =============================================================================
// PAYLOAD MAPPING
// =============================================================================

#[must_use]
pub fn map_user(raw: RawUser) -> AuthUser {
    AuthUser {
        id: raw.id,
        email: raw.email.unwrap_or_default(),
        email_confirmed: raw.email_confirmed_at.is_some(),
        created_at: raw.created_at,
        user_metadata: raw.user_metadata.unwrap_or_default(),
    }
}

#[must_use]
pub fn map_session(raw: RawSession) -> AuthSession {
    AuthSession {
        access_token: raw.access_token,
        refresh_token: raw.refresh_token,
        expires_in: raw.expires_in,
        token_type: raw.token_type,
        user: map_user(raw.user),
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
