//! Profile service: load-or-create and per-section updates.
//!
//! DESIGN
//! ======
//! The profile is cached in a [`Query`] registered with the shared
//! [`QueryClient`], so signing out clears it with the session. A successful
//! update invalidates the cache; the next load fetches the fresh row.
//!
//! ERROR HANDLING
//! ==============
//! Validation failures are returned for the form to show inline. Anything
//! that fails after submission (wrong current password, provider or network
//! failure) also raises an error notification.

use std::sync::Arc;
use std::time::Instant;

use auth::{AuthService, AuthSession, Notifier, Query, QueryClient};
use time::{Date, OffsetDateTime};
use tracing::{debug, info, warn};

use super::store::ProfileStore;
use super::types::{EmailChange, FieldError, NewProfile, PasswordChange, ProfileError, ProfileUpdate, UserProfile};
use super::validation::{validate_address, validate_basic, validate_email_change, validate_password_change};

pub const MSG_PROFILE_SAVED: &str = "Profile updated";

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
    auth: AuthService,
    notifier: Notifier,
    query: Arc<Query<UserProfile, ProfileError>>,
}

impl ProfileService {
    #[must_use]
    pub fn new(store: Arc<dyn ProfileStore>, auth: AuthService, notifier: Notifier, queries: &QueryClient) -> Self {
        let query = Arc::new(Query::new("profile"));
        queries.register(query.clone());
        Self { store, auth, notifier, query }
    }

    /// The signed-in user's profile, created with defaults on first access.
    /// Served from cache while fresh.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotSignedIn`] without a session, or the store
    /// failure.
    pub async fn load(&self) -> Result<UserProfile, ProfileError> {
        self.load_at(Instant::now()).await
    }

    /// # Errors
    ///
    /// See [`ProfileService::load`].
    pub async fn load_at(&self, now: Instant) -> Result<UserProfile, ProfileError> {
        if !self.query.is_stale_at(now) {
            if let Some(profile) = self.query.snapshot_at(now).data() {
                debug!("profile served from cache");
                return Ok(profile.clone());
            }
        }
        let ticket = self.query.begin();
        let result = self.fetch_or_create().await.map(Some);
        if !self.query.resolve_at(ticket, result, now) {
            info!("profile load superseded by a sign-out or update");
            return Err(ProfileError::Superseded);
        }
        // A reset may still land between resolving and reading.
        let snap = self.query.snapshot();
        match (snap.data(), snap.error()) {
            (Some(profile), _) => Ok(profile.clone()),
            (None, Some(err)) => Err(err.clone()),
            (None, None) => Err(ProfileError::Superseded),
        }
    }

    async fn fetch_or_create(&self) -> Result<UserProfile, ProfileError> {
        let session = self.session().await?;
        let user = &session.user;
        if let Some(profile) = self.store.fetch(&session.access_token, &user.id).await? {
            return Ok(profile);
        }
        info!(user_id = %user.id, "creating default profile");
        self.store.insert(&session.access_token, &NewProfile::with_defaults(&user.id, &user.email)).await
    }

    /// Validate and apply one section of the edit form.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Invalid`] when the form fails validation, or
    /// the failure of the remote update.
    pub async fn update(&self, update: ProfileUpdate) -> Result<(), ProfileError> {
        self.update_on(update, OffsetDateTime::now_utc().date()).await
    }

    /// # Errors
    ///
    /// See [`ProfileService::update`].
    pub async fn update_on(&self, update: ProfileUpdate, today: Date) -> Result<(), ProfileError> {
        let invalid = match &update {
            ProfileUpdate::Basic(info) => validate_basic(info, today),
            ProfileUpdate::Address(info) => validate_address(info),
            ProfileUpdate::Password(change) => validate_password_change(change),
            ProfileUpdate::Email(change) => validate_email_change(change),
        };
        if !invalid.is_empty() {
            debug!(fields = ?invalid.iter().map(|e: &FieldError| e.field).collect::<Vec<_>>(), "profile form invalid");
            return Err(ProfileError::Invalid(invalid));
        }

        match self.apply(update).await {
            Ok(()) => {
                self.query.reset();
                self.notifier.success(MSG_PROFILE_SAVED);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "profile update failed");
                self.notifier.error(err.to_string());
                Err(err)
            }
        }
    }

    async fn apply(&self, update: ProfileUpdate) -> Result<(), ProfileError> {
        match update {
            ProfileUpdate::Basic(info) => self.patch(&info).await,
            ProfileUpdate::Address(info) => self.patch(&info).await,
            ProfileUpdate::Password(change) => self.change_password(&change).await,
            ProfileUpdate::Email(change) => self.change_email(&change).await,
        }
    }

    async fn patch<T: serde::Serialize>(&self, changes: &T) -> Result<(), ProfileError> {
        let session = self.session().await?;
        let changes = serde_json::to_value(changes).map_err(|e| ProfileError::Decode(e.to_string()))?;
        self.store.patch(&session.access_token, &session.user.id, &changes).await
    }

    async fn change_password(&self, change: &PasswordChange) -> Result<(), ProfileError> {
        self.verify_password(&change.old_password).await?;
        self.auth.update_password(&change.new_password).await?;
        Ok(())
    }

    async fn change_email(&self, change: &EmailChange) -> Result<(), ProfileError> {
        self.verify_password(&change.password).await?;
        self.auth.update_email(&change.new_email).await?;
        Ok(())
    }

    /// Re-authenticate with the current password before a security change.
    async fn verify_password(&self, password: &str) -> Result<(), ProfileError> {
        let session = self.session().await?;
        match self.auth.sign_in(&session.user.email, password).await {
            Ok(_) => Ok(()),
            Err(err) if !err.is_system_error => Err(ProfileError::WrongPassword),
            Err(err) => Err(err.into()),
        }
    }

    async fn session(&self) -> Result<AuthSession, ProfileError> {
        self.auth.get_session().await?.ok_or(ProfileError::NotSignedIn)
    }
}

#[cfg(test)]
#[path = "service_test.rs"]
mod tests;
