//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is the single owner of the auth stack and the profile feature.
//! Every field is a cheap clonable handle, so views and commands take what
//! they need without borrowing from one another. The session cache is the
//! only writer of session state; everything else reads through it or asks
//! the facade directly.
//!
//! Background work (provider event listener, cache GC, token auto-refresh)
//! is started explicitly and owned by [`BackgroundTasks`], which aborts the
//! tasks when dropped.

use std::sync::Arc;
use std::time::Duration;

use auth::gotrue::GoTrueClient;
use auth::provider::{AuthProvider, ProviderException};
use auth::query::GC_SWEEP_INTERVAL;
use auth::store::FileSessionStore;
use auth::{AuthActions, AuthService, Notifier, QueryClient, RouteGuard, SessionCache};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::profile::{PostgrestProfiles, ProfileError, ProfileService, ProfileStore};

/// How often the auto-refresh task checks the session's expiry.
pub const AUTO_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("auth client setup failed: {0}")]
    Auth(#[from] ProviderException),
    #[error("profile client setup failed: {0}")]
    Profile(#[from] ProfileError),
}

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub service: AuthService,
    pub cache: SessionCache,
    pub actions: AuthActions,
    pub guard: RouteGuard,
    pub notifier: Notifier,
    pub queries: QueryClient,
    pub profiles: ProfileService,
    gotrue: Option<Arc<GoTrueClient>>,
}

impl AppState {
    /// Wire the GoTrue and PostgREST clients from config.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when an HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, StateError> {
        let store = Arc::new(FileSessionStore::new(&config.session_file));
        let gotrue = Arc::new(GoTrueClient::new(&config.gotrue(), store)?);
        let profiles = PostgrestProfiles::new(
            &config.supabase_url,
            &config.supabase_key,
            Duration::from_secs(config.timeouts.request_secs),
            Duration::from_secs(config.timeouts.connect_secs),
        )?;
        info!(url = %config.supabase_url, session_file = %config.session_file.display(), "app state ready");

        let mut state = Self::from_parts(gotrue.clone(), Arc::new(profiles), &config.app_name);
        state.gotrue = Some(gotrue);
        Ok(state)
    }

    /// Assemble the state around any provider and profile store.
    #[must_use]
    pub fn from_parts(provider: Arc<dyn AuthProvider>, profile_store: Arc<dyn ProfileStore>, app_name: &str) -> Self {
        let notifier = Notifier::new();
        let queries = QueryClient::new();
        let service = AuthService::new(provider);
        let cache = SessionCache::new(service.clone(), queries.clone());
        let actions = AuthActions::new(service.clone(), cache.clone(), notifier.clone());
        let guard = RouteGuard::new(service.clone(), notifier.clone());
        let profiles = ProfileService::new(profile_store, service.clone(), notifier.clone(), &queries);
        Self {
            app_name: app_name.to_owned(),
            service,
            cache,
            actions,
            guard,
            notifier,
            queries,
            profiles,
            gotrue: None,
        }
    }

    /// Start the event listener, the cache GC sweep and, when enabled and the
    /// provider supports it, token auto-refresh.
    #[must_use]
    pub fn spawn_background(&self, auto_refresh: bool) -> BackgroundTasks {
        let mut handles = vec![self.cache.spawn_listener(), self.queries.spawn_gc(GC_SWEEP_INTERVAL)];
        if auto_refresh {
            if let Some(gotrue) = &self.gotrue {
                handles.push(gotrue.spawn_auto_refresh(AUTO_REFRESH_INTERVAL));
            }
        }
        BackgroundTasks { handles }
    }
}

// =============================================================================
// BACKGROUND TASKS
// =============================================================================

/// Owned background tasks. Dropping this aborts them.
#[must_use]
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
