//! Auth actions: the mutation layer views call.
//!
//! Each action runs the facade operation, keeps the shared loading/error
//! state current, writes results through to the session cache, and raises
//! notifications. System errors raise a global error notification; business
//! errors are only returned, for the form to render inline.
//!
//! Everything held here is an owned handle, so a completion that lands after
//! the initiating view is gone touches nothing that view owned.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cache::SessionCache;
use crate::notify::Notifier;
use crate::service::AuthService;
use crate::types::{AuthError, AuthResult, AuthSession, SignUpOutcome};

pub const MSG_REGISTERED: &str = "Registration successful, please sign in";
pub const MSG_CONFIRM_EMAIL: &str = "Registration successful, check your inbox to confirm your email";
pub const MSG_SIGNED_IN: &str = "Signed in";
pub const MSG_SIGNED_OUT: &str = "Signed out";
pub const MSG_RESET_SENT: &str = "Password reset email sent, check your inbox";
pub const MSG_PASSWORD_UPDATED: &str = "Password updated";
pub const MSG_EMAIL_UPDATED: &str = "Email updated, check your inbox to verify";

/// Shared progress of the most recent action.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionState {
    pub loading: bool,
    pub error: Option<AuthError>,
}

#[derive(Clone)]
pub struct AuthActions {
    service: AuthService,
    cache: SessionCache,
    notifier: Notifier,
    state: Arc<watch::Sender<ActionState>>,
}

impl AuthActions {
    #[must_use]
    pub fn new(service: AuthService, cache: SessionCache, notifier: Notifier) -> Self {
        let (state, _) = watch::channel(ActionState::default());
        Self { service, cache, notifier, state: Arc::new(state) }
    }

    #[must_use]
    pub fn state(&self) -> ActionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ActionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    // =========================================================================
    // RESULT-RETURNING ACTIONS
    // =========================================================================

    /// # Errors
    ///
    /// Returns the facade's [`AuthError`].
    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        let outcome = self.track(self.service.sign_up(email, password)).await?;
        match outcome {
            SignUpOutcome::Registered(_) => self.notifier.success(MSG_REGISTERED),
            SignUpOutcome::PendingConfirmation => self.notifier.info(MSG_CONFIRM_EMAIL),
        }
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns the facade's [`AuthError`].
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let session = self.track(self.service.sign_in(email, password)).await?;
        self.cache.set_session(session.clone());
        self.notifier.success(MSG_SIGNED_IN);
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns the facade's [`AuthError`].
    pub async fn sign_out(&self) -> AuthResult<()> {
        self.track(self.service.sign_out()).await?;
        self.cache.clear_on_sign_out();
        self.notifier.success(MSG_SIGNED_OUT);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the facade's [`AuthError`].
    pub async fn reset_password(&self, email: &str) -> AuthResult<()> {
        self.track(self.service.reset_password(email)).await?;
        self.notifier.success(MSG_RESET_SENT);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the facade's [`AuthError`].
    pub async fn update_password(&self, new_password: &str) -> AuthResult<()> {
        self.track(self.service.update_password(new_password)).await?;
        self.notifier.success(MSG_PASSWORD_UPDATED);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the facade's [`AuthError`].
    pub async fn update_email(&self, new_email: &str) -> AuthResult<()> {
        self.track(self.service.update_email(new_email)).await?;
        self.notifier.success(MSG_EMAIL_UPDATED);
        Ok(())
    }

    /// Populate the session cache on application start.
    pub async fn initialize_session(&self) -> Option<AuthSession> {
        let snap = self.cache.initialize().await;
        if let Some(err) = snap.error() {
            warn!(error = %err, "initial session fetch failed");
        }
        snap.data().cloned()
    }

    // =========================================================================
    // BOOLEAN ADAPTERS
    // =========================================================================

    pub async fn sign_out_ok(&self) -> bool {
        succeeded(self.sign_out()).await
    }

    pub async fn reset_password_ok(&self, email: &str) -> bool {
        succeeded(self.reset_password(email)).await
    }

    pub async fn update_password_ok(&self, new_password: &str) -> bool {
        succeeded(self.update_password(new_password)).await
    }

    pub async fn update_email_ok(&self, new_email: &str) -> bool {
        succeeded(self.update_email(new_email)).await
    }

    // =========================================================================
    // STATE TRACKING
    // =========================================================================

    async fn track<T, F>(&self, operation: F) -> AuthResult<T>
    where
        F: Future<Output = AuthResult<T>>,
    {
        self.state.send_modify(|state| state.loading = true);
        let result = operation.await;
        match &result {
            Ok(_) => {
                self.state.send_replace(ActionState::default());
            }
            Err(err) => {
                if err.is_system_error {
                    self.notifier.error(err.message.clone());
                } else {
                    debug!(code = %err.code, "business error returned to caller");
                }
                self.state.send_replace(ActionState { loading: false, error: Some(err.clone()) });
            }
        }
        result
    }
}

/// Collapse an action to success or failure. The error itself stays in the
/// shared [`ActionState`].
async fn succeeded<T>(action: impl Future<Output = AuthResult<T>>) -> bool {
    action.await.is_ok()
}

#[cfg(test)]
#[path = "actions_test.rs"]
mod tests;
