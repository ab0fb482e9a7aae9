//! Auth service facade over the hosted provider.
//!
//! ARCHITECTURE
//! ============
//! Every operation delegates to an [`AuthProvider`] and passes the outcome
//! through `normalize`, so callers only ever see [`AuthResult`]. Nothing is
//! retried here; a failure surfaces on the first attempt.
//!
//! Session-change notifications are exposed two ways: [`AuthService::subscribe`]
//! hands out the raw event stream (the session cache is its consumer), and
//! [`AuthService::on_auth_state_change`] adapts it to a callback.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::normalize::{map_session, map_user, normalize};
use crate::provider::{AuthProvider, ProviderEvent, UserUpdate};
use crate::types::{AuthError, AuthResult, AuthSession, SessionChanged, SignUpOutcome};

pub const EMPTY_SESSION_CODE: &str = "EMPTY_SESSION";

#[derive(Clone)]
pub struct AuthService {
    provider: Arc<dyn AuthProvider>,
}

impl AuthService {
    #[must_use]
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self { provider }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns the normalized provider failure.
    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        let user = normalize(self.provider.sign_up(email, password).await)?;
        let outcome = match user {
            Some(raw) => SignUpOutcome::Registered(map_user(raw)),
            None => SignUpOutcome::PendingConfirmation,
        };
        info!(pending = outcome.user().is_none(), "sign-up accepted");
        Ok(outcome)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the normalized provider failure, or a system error when the
    /// provider reports success without issuing a session.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let session = normalize(self.provider.sign_in_with_password(email, password).await)?
            .map(map_session)
            .ok_or_else(|| AuthError::system("Sign-in returned no session", EMPTY_SESSION_CODE))?;
        info!(user_id = %session.user.id, "signed in");
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns the normalized provider failure.
    pub async fn sign_out(&self) -> AuthResult<()> {
        normalize(self.provider.sign_out().await)?;
        info!("signed out");
        Ok(())
    }

    /// Ask the provider to email a password-reset link.
    ///
    /// # Errors
    ///
    /// Returns the normalized provider failure.
    pub async fn reset_password(&self, email: &str) -> AuthResult<()> {
        normalize(self.provider.reset_password_for_email(email).await)?;
        info!("password reset requested");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the normalized provider failure.
    pub async fn update_password(&self, new_password: &str) -> AuthResult<()> {
        let update = UserUpdate { password: Some(new_password.to_owned()), ..UserUpdate::default() };
        normalize(self.provider.update_user(&update).await)?;
        info!("password updated");
        Ok(())
    }

    /// Change the account email; the provider sends a verification message.
    ///
    /// # Errors
    ///
    /// Returns the normalized provider failure.
    pub async fn update_email(&self, new_email: &str) -> AuthResult<()> {
        let update = UserUpdate { email: Some(new_email.to_owned()), ..UserUpdate::default() };
        normalize(self.provider.update_user(&update).await)?;
        info!("email change requested");
        Ok(())
    }

    /// Current session, `None` when nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns the normalized provider failure.
    pub async fn get_session(&self) -> AuthResult<Option<AuthSession>> {
        let session = normalize(self.provider.get_session().await)?.map(map_session);
        debug!(present = session.is_some(), "session fetched");
        Ok(session)
    }

    /// Navigation-guard predicate. A failed check counts as signed out.
    pub async fn is_authenticated(&self) -> bool {
        match self.get_session().await {
            Ok(session) => session.is_some(),
            Err(err) => {
                warn!(error = %err, "session check failed; treating as signed out");
                false
            }
        }
    }

    /// Raw session-change stream.
    #[must_use]
    pub fn subscribe(&self) -> SessionEvents {
        SessionEvents { rx: self.provider.subscribe() }
    }

    /// Invoke `callback` with the new session on every provider change.
    ///
    /// Must be called inside a tokio runtime. Dropping or unsubscribing the
    /// returned handle stops delivery.
    pub fn on_auth_state_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<AuthSession>) + Send + 'static,
    {
        let mut events = self.subscribe();
        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                callback(event.session);
            }
        });
        Subscription { handle }
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// Receiver of normalized [`SessionChanged`] events.
pub struct SessionEvents {
    rx: broadcast::Receiver<ProviderEvent>,
}

impl SessionEvents {
    /// Next event, or `None` once the provider is gone. Lagged events are
    /// skipped; the next delivered event carries the current session anyway.
    pub async fn recv(&mut self) -> Option<SessionChanged> {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    return Some(SessionChanged { kind: event.kind, session: event.session.map(map_session) });
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "session events lagged"),
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Handle returned by [`AuthService::on_auth_state_change`].
#[must_use = "dropping the subscription stops delivery"]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Stop delivering events to the callback.
    pub fn unsubscribe(self) {
        self.handle.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
#[path = "service_test.rs"]
mod tests;
