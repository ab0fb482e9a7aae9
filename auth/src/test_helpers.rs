//! Fixtures and a scripted provider for tests.
//!
//! Compiled for this crate's unit tests and, behind the `test-util` feature,
//! for downstream crates that drive the facade against a fake provider.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::broadcast;

use crate::provider::{
    AuthProvider, ProviderCall, ProviderError, ProviderEvent, ProviderException, RawSession, RawUser, UserUpdate,
};

#[must_use]
pub fn raw_user(id: &str, email: &str) -> RawUser {
    let mut metadata = serde_json::Map::new();
    metadata.insert("plan".into(), serde_json::json!("free"));
    RawUser {
        id: id.to_owned(),
        email: Some(email.to_owned()),
        email_confirmed_at: Some("2024-05-01T10:00:00Z".to_owned()),
        created_at: time::macros::datetime!(2024-05-01 09:00 UTC),
        user_metadata: Some(metadata),
    }
}

#[must_use]
pub fn raw_session(user_id: &str, access_token: &str) -> RawSession {
    RawSession {
        access_token: access_token.to_owned(),
        refresh_token: format!("refresh-{access_token}"),
        expires_in: 3600,
        expires_at: None,
        token_type: "bearer".to_owned(),
        user: raw_user(user_id, &format!("{user_id}@example.com")),
    }
}

#[must_use]
pub fn invalid_credentials() -> ProviderError {
    ProviderError::new(Some(400), "invalid_credentials", "Invalid login credentials")
}

#[must_use]
pub fn unreachable() -> ProviderException {
    ProviderException::Transport("error sending request: connection refused".into())
}

// =============================================================================
// MockProvider
// =============================================================================

type Script<T> = Mutex<VecDeque<ProviderCall<T>>>;

/// Provider that replays queued outcomes and counts calls.
///
/// An operation with an empty queue answers with a 500 provider error so an
/// unexpected call shows up as a system error in assertions.
pub struct MockProvider {
    sign_up: Script<Option<RawUser>>,
    sign_in: Script<Option<RawSession>>,
    sign_out: Script<()>,
    reset: Script<()>,
    update: Script<Option<RawUser>>,
    session: Script<Option<RawSession>>,
    session_calls: AtomicUsize,
    updates: Mutex<Vec<UserUpdate>>,
    events: broadcast::Sender<ProviderEvent>,
}

impl MockProvider {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            sign_up: Mutex::default(),
            sign_in: Mutex::default(),
            sign_out: Mutex::default(),
            reset: Mutex::default(),
            update: Mutex::default(),
            session: Mutex::default(),
            session_calls: AtomicUsize::new(0),
            updates: Mutex::default(),
            events,
        }
    }

    pub fn push_sign_up(&self, call: ProviderCall<Option<RawUser>>) {
        self.sign_up.lock().unwrap_or_else(PoisonError::into_inner).push_back(call);
    }

    pub fn push_sign_in(&self, call: ProviderCall<Option<RawSession>>) {
        self.sign_in.lock().unwrap_or_else(PoisonError::into_inner).push_back(call);
    }

    pub fn push_sign_out(&self, call: ProviderCall<()>) {
        self.sign_out.lock().unwrap_or_else(PoisonError::into_inner).push_back(call);
    }

    pub fn push_reset(&self, call: ProviderCall<()>) {
        self.reset.lock().unwrap_or_else(PoisonError::into_inner).push_back(call);
    }

    pub fn push_update(&self, call: ProviderCall<Option<RawUser>>) {
        self.update.lock().unwrap_or_else(PoisonError::into_inner).push_back(call);
    }

    pub fn push_session(&self, call: ProviderCall<Option<RawSession>>) {
        self.session.lock().unwrap_or_else(PoisonError::into_inner).push_back(call);
    }

    pub fn session_calls(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }

    pub fn recorded_updates(&self) -> Vec<UserUpdate> {
        self.updates.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn next<T>(script: &Script<T>) -> ProviderCall<T> {
    script
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
        .unwrap_or_else(|| Ok(Err(ProviderError::new(Some(500), "unscripted", "unscripted provider call"))))
}

#[async_trait::async_trait]
impl AuthProvider for MockProvider {
    async fn sign_up(&self, _email: &str, _password: &str) -> ProviderCall<Option<RawUser>> {
        next(&self.sign_up)
    }

    async fn sign_in_with_password(&self, _email: &str, _password: &str) -> ProviderCall<Option<RawSession>> {
        next(&self.sign_in)
    }

    async fn sign_out(&self) -> ProviderCall<()> {
        next(&self.sign_out)
    }

    async fn reset_password_for_email(&self, _email: &str) -> ProviderCall<()> {
        next(&self.reset)
    }

    async fn update_user(&self, update: &UserUpdate) -> ProviderCall<Option<RawUser>> {
        self.updates.lock().unwrap_or_else(PoisonError::into_inner).push(update.clone());
        next(&self.update)
    }

    async fn get_session(&self) -> ProviderCall<Option<RawSession>> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.session)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
