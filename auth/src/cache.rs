//! Session cache: the application's single copy of the current session.
//!
//! DESIGN
//! ======
//! Backed by a [`Query`] registered with the shared [`QueryClient`]. The cache
//! is the only writer. It refetches through the facade on explicit triggers,
//! writes through after sign-in and sign-out, and applies provider
//! `SessionChanged` events from one listener task.
//!
//! Window focus never refetches; reconnect always does; mount refetches only
//! when the data is stale.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::query::{Query, QueryClient, QueryStatus, Snapshot};
use crate::service::AuthService;
use crate::types::{AuthError, AuthSession, SessionChangeKind, SessionChanged};

pub type SessionSnapshot = Snapshot<AuthSession, AuthError>;

#[derive(Clone)]
pub struct SessionCache {
    service: AuthService,
    queries: QueryClient,
    query: Arc<Query<AuthSession, AuthError>>,
}

impl SessionCache {
    #[must_use]
    pub fn new(service: AuthService, queries: QueryClient) -> Self {
        let query = Arc::new(Query::new("auth.session"));
        queries.register(query.clone());
        Self { service, queries, query }
    }

    /// Apply provider session changes until the provider goes away.
    pub fn spawn_listener(&self) -> JoinHandle<()> {
        let cache = self.clone();
        let mut events = self.service.subscribe();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                cache.apply(event);
            }
            debug!("session event stream closed");
        })
    }

    // -------------------------------------------------------------------------
    // triggers
    // -------------------------------------------------------------------------

    /// Application start.
    pub async fn initialize(&self) -> SessionSnapshot {
        self.refetch().await
    }

    pub async fn on_reconnect(&self) -> SessionSnapshot {
        self.refetch().await
    }

    /// A view that reads the session appeared. Fresh data is served as is.
    pub async fn on_mount(&self) -> SessionSnapshot {
        self.on_mount_at(Instant::now()).await
    }

    pub async fn on_mount_at(&self, now: Instant) -> SessionSnapshot {
        if self.query.is_stale_at(now) {
            self.refetch().await
        } else {
            debug!("session fresh; skipping refetch");
            self.query.snapshot_at(now)
        }
    }

    /// Focus changes do not trigger a refetch.
    pub fn on_window_focus(&self) {}

    pub async fn refetch(&self) -> SessionSnapshot {
        let service = self.service.clone();
        let snap = self.query.run(|| async move { service.get_session().await }).await;
        debug!(present = snap.data().is_some(), "session refetched");
        snap
    }

    // -------------------------------------------------------------------------
    // reads
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.query.snapshot()
    }

    #[must_use]
    pub fn current(&self) -> Option<AuthSession> {
        self.snapshot().data().cloned()
    }

    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        SessionHandle { rx: self.query.watch(), cache: self.clone() }
    }

    #[must_use]
    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    // -------------------------------------------------------------------------
    // writes
    // -------------------------------------------------------------------------

    /// Write-through after a successful sign-in.
    pub fn set_session(&self, session: AuthSession) {
        info!(user_id = %session.user.id, "session cached");
        self.query.set_at(Some(session), Instant::now());
    }

    /// Write-through after sign-out: drop every cached query, then record that
    /// nobody is signed in.
    pub fn clear_on_sign_out(&self) {
        self.queries.clear();
        self.query.set_at(None, Instant::now());
        info!("session cleared");
    }

    fn apply(&self, event: SessionChanged) {
        debug!(kind = ?event.kind, "applying session change");
        match (event.kind, event.session) {
            (SessionChangeKind::SignedOut, _) => self.clear_on_sign_out(),
            (_, Some(session)) => self.query.set_at(Some(session), Instant::now()),
            (_, None) => self.query.set_at(None, Instant::now()),
        }
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Reactive read handle for views.
pub struct SessionHandle {
    rx: watch::Receiver<SessionSnapshot>,
    cache: SessionCache,
}

impl SessionHandle {
    #[must_use]
    pub fn session(&self) -> Option<AuthSession> {
        self.rx.borrow().data().cloned()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.rx.borrow().is_loading()
    }

    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.rx.borrow().is_fetching
    }

    #[must_use]
    pub fn error(&self) -> Option<AuthError> {
        self.rx.borrow().error().cloned()
    }

    #[must_use]
    pub fn is_signed_out(&self) -> bool {
        matches!(self.rx.borrow().status, QueryStatus::Absent)
    }

    pub async fn refetch(&self) -> SessionSnapshot {
        self.cache.refetch().await
    }

    /// Wait for the next change. Returns `false` once the cache is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
