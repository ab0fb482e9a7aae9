use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use auth::notify::{Level, Notification, drain};
use auth::query::STALE_AFTER;
use auth::test_helpers::{MockProvider, invalid_credentials, raw_session, raw_user, unreachable};
use serde_json::Value;
use time::macros::{date, datetime};

use super::*;
use crate::profile::types::{AddressInfo, BasicInfo, Gender};

const TODAY: Date = date!(2026 - 10 - 18);

// =============================================================================
// MOCK STORE
// =============================================================================

#[derive(Default)]
struct MockStore {
    row: Mutex<Option<UserProfile>>,
    fetches: AtomicUsize,
    inserts: Mutex<Vec<NewProfile>>,
    patches: Mutex<Vec<Value>>,
    fail_patch: Mutex<Option<ProfileError>>,
}

impl MockStore {
    fn with_row(profile: UserProfile) -> Self {
        Self { row: Mutex::new(Some(profile)), ..Self::default() }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn inserts(&self) -> Vec<NewProfile> {
        self.inserts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn patches(&self) -> Vec<Value> {
        self.patches.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait::async_trait]
impl ProfileStore for MockStore {
    async fn fetch(&self, _access_token: &str, user_id: &str) -> Result<Option<UserProfile>, ProfileError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let row = self.row.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(row.clone().filter(|p| p.id == user_id))
    }

    async fn insert(&self, _access_token: &str, profile: &NewProfile) -> Result<UserProfile, ProfileError> {
        self.inserts.lock().unwrap_or_else(PoisonError::into_inner).push(profile.clone());
        let stored = stored_profile(&profile.id, &profile.email, &profile.nickname);
        *self.row.lock().unwrap_or_else(PoisonError::into_inner) = Some(stored.clone());
        Ok(stored)
    }

    async fn patch(&self, _access_token: &str, _user_id: &str, changes: &Value) -> Result<(), ProfileError> {
        if let Some(err) = self.fail_patch.lock().unwrap_or_else(PoisonError::into_inner).take() {
            return Err(err);
        }
        self.patches.lock().unwrap_or_else(PoisonError::into_inner).push(changes.clone());
        Ok(())
    }
}

fn stored_profile(id: &str, email: &str, nickname: &str) -> UserProfile {
    UserProfile {
        id: id.to_owned(),
        nickname: nickname.to_owned(),
        avatar: "avatar-1".into(),
        gender: Gender::Secret,
        birthday: date!(2000 - 01 - 01),
        bio: String::new(),
        email: email.to_owned(),
        province: String::new(),
        city: String::new(),
        district: String::new(),
        detailed_address: String::new(),
        created_at: datetime!(2024-05-01 09:00 UTC),
        updated_at: datetime!(2024-05-01 09:00 UTC),
    }
}

// =============================================================================
// HARNESS
// =============================================================================

struct Harness {
    provider: Arc<MockProvider>,
    store: Arc<MockStore>,
    queries: QueryClient,
    profiles: ProfileService,
    toasts: tokio::sync::broadcast::Receiver<Notification>,
}

fn harness(store: MockStore) -> Harness {
    let provider = Arc::new(MockProvider::new());
    let store = Arc::new(store);
    let queries = QueryClient::new();
    let notifier = Notifier::new();
    let toasts = notifier.subscribe();
    let profiles = ProfileService::new(store.clone(), AuthService::new(provider.clone()), notifier, &queries);
    Harness { provider, store, queries, profiles, toasts }
}

fn signed_in(provider: &MockProvider) {
    provider.push_session(Ok(Ok(Some(raw_session("u-1", "tok")))));
}

fn address() -> AddressInfo {
    AddressInfo {
        province: "110000".into(),
        city: "110100".into(),
        district: "110105".into(),
        detailed_address: "8 Garden Road".into(),
    }
}

// =============================================================================
// LOAD
// =============================================================================

#[tokio::test]
async fn load_without_session_is_not_signed_in() {
    let h = harness(MockStore::default());
    h.provider.push_session(Ok(Ok(None)));

    assert_eq!(h.profiles.load().await, Err(ProfileError::NotSignedIn));
    assert_eq!(h.store.fetches(), 0);
}

#[tokio::test]
async fn first_load_creates_default_profile() {
    let h = harness(MockStore::default());
    signed_in(&h.provider);

    let profile = h.profiles.load().await.unwrap();
    assert_eq!(profile.nickname, "User");
    assert_eq!(profile.email, "u-1@example.com");

    let inserts = h.store.inserts();
    assert_eq!(inserts, vec![NewProfile::with_defaults("u-1", "u-1@example.com")]);
}

#[tokio::test]
async fn existing_profile_is_cached_while_fresh() {
    let h = harness(MockStore::with_row(stored_profile("u-1", "u-1@example.com", "Mochi")));
    signed_in(&h.provider);
    let start = Instant::now();

    assert_eq!(h.profiles.load_at(start).await.unwrap().nickname, "Mochi");
    assert_eq!(h.profiles.load_at(start).await.unwrap().nickname, "Mochi");
    assert_eq!(h.store.fetches(), 1);
    assert!(h.store.inserts().is_empty());

    signed_in(&h.provider);
    h.profiles.load_at(Instant::now() + STALE_AFTER).await.unwrap();
    assert_eq!(h.store.fetches(), 2);
}

#[tokio::test]
async fn clearing_queries_drops_cached_profile() {
    let h = harness(MockStore::with_row(stored_profile("u-1", "u-1@example.com", "Mochi")));
    signed_in(&h.provider);
    h.profiles.load().await.unwrap();

    h.queries.clear();
    h.provider.push_session(Ok(Ok(None)));
    assert_eq!(h.profiles.load().await, Err(ProfileError::NotSignedIn));
}

// =============================================================================
// UPDATE
// =============================================================================

#[tokio::test]
async fn invalid_section_is_returned_without_remote_call() {
    let mut h = harness(MockStore::default());
    let info = BasicInfo {
        nickname: String::new(),
        avatar: "avatar-2".into(),
        gender: Gender::Male,
        birthday: Some(date!(1990 - 01 - 01)),
        bio: String::new(),
    };

    let err = h.profiles.update_on(ProfileUpdate::Basic(info), TODAY).await.unwrap_err();
    assert!(matches!(err, ProfileError::Invalid(ref fields) if fields[0].field == "nickname"));
    assert!(h.store.patches().is_empty());
    assert!(drain(&mut h.toasts).is_empty());
    assert_eq!(h.provider.session_calls(), 0);
}

#[tokio::test]
async fn address_update_patches_and_invalidates() {
    let mut h = harness(MockStore::with_row(stored_profile("u-1", "u-1@example.com", "Mochi")));
    signed_in(&h.provider);
    h.profiles.load().await.unwrap();

    signed_in(&h.provider);
    h.profiles.update_on(ProfileUpdate::Address(address()), TODAY).await.unwrap();

    let patches = h.store.patches();
    assert_eq!(patches[0]["detailed_address"], "8 Garden Road");
    assert_eq!(drain(&mut h.toasts), vec![Notification { level: Level::Success, message: MSG_PROFILE_SAVED.into() }]);

    signed_in(&h.provider);
    h.profiles.load().await.unwrap();
    assert_eq!(h.store.fetches(), 2);
}

#[tokio::test]
async fn basic_update_serializes_birthday_as_date() {
    let h = harness(MockStore::default());
    signed_in(&h.provider);
    let info = BasicInfo {
        nickname: "Mochi".into(),
        avatar: "avatar-2".into(),
        gender: Gender::Female,
        birthday: Some(date!(1995 - 04 - 12)),
        bio: "Cat person".into(),
    };

    h.profiles.update_on(ProfileUpdate::Basic(info), TODAY).await.unwrap();
    let patch = &h.store.patches()[0];
    assert_eq!(patch["birthday"], "1995-04-12");
    assert_eq!(patch["gender"], "female");
}

#[tokio::test]
async fn failed_patch_notifies() {
    let store = MockStore::default();
    *store.fail_patch.lock().unwrap() = Some(ProfileError::Api { status: 403, message: "permission denied".into() });
    let mut h = harness(store);
    signed_in(&h.provider);

    let err = h.profiles.update_on(ProfileUpdate::Address(address()), TODAY).await.unwrap_err();
    assert_eq!(err, ProfileError::Api { status: 403, message: "permission denied".into() });
    assert_eq!(drain(&mut h.toasts), vec![Notification { level: Level::Error, message: "permission denied".into() }]);
}

fn password_change() -> PasswordChange {
    PasswordChange {
        old_password: "old-secret".into(),
        new_password: "Str0ngPass".into(),
        confirm_password: "Str0ngPass".into(),
    }
}

#[tokio::test]
async fn wrong_current_password_blocks_change() {
    let mut h = harness(MockStore::default());
    signed_in(&h.provider);
    h.provider.push_sign_in(Ok(Err(invalid_credentials())));

    let err = h.profiles.update_on(ProfileUpdate::Password(password_change()), TODAY).await.unwrap_err();
    assert_eq!(err, ProfileError::WrongPassword);
    assert!(h.provider.recorded_updates().is_empty());
    assert_eq!(
        drain(&mut h.toasts),
        vec![Notification { level: Level::Error, message: "Current password is incorrect".into() }]
    );
}

#[tokio::test]
async fn password_change_reauthenticates_then_updates() {
    let h = harness(MockStore::default());
    signed_in(&h.provider);
    h.provider.push_sign_in(Ok(Ok(Some(raw_session("u-1", "tok-2")))));
    h.provider.push_update(Ok(Ok(Some(raw_user("u-1", "u-1@example.com")))));

    h.profiles.update_on(ProfileUpdate::Password(password_change()), TODAY).await.unwrap();
    let updates = h.provider.recorded_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].password.as_deref(), Some("Str0ngPass"));
}

#[tokio::test]
async fn email_change_surfaces_system_errors() {
    let h = harness(MockStore::default());
    signed_in(&h.provider);
    h.provider.push_sign_in(Err(unreachable()));

    let change = EmailChange { password: "pw".into(), new_email: "new@example.com".into() };
    let err = h.profiles.update_on(ProfileUpdate::Email(change), TODAY).await.unwrap_err();
    assert!(matches!(err, ProfileError::Auth(ref e) if e.is_system_error));
}

// =============================================================================
// SUPERSEDED LOADS
// =============================================================================

/// Store whose fetch parks until released, so the cache can change meanwhile.
struct GatedStore {
    inner: MockStore,
    entered: Arc<tokio::sync::Notify>,
    release: Arc<tokio::sync::Notify>,
}

#[async_trait::async_trait]
impl ProfileStore for GatedStore {
    async fn fetch(&self, access_token: &str, user_id: &str) -> Result<Option<UserProfile>, ProfileError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.fetch(access_token, user_id).await
    }

    async fn insert(&self, access_token: &str, profile: &NewProfile) -> Result<UserProfile, ProfileError> {
        self.inner.insert(access_token, profile).await
    }

    async fn patch(&self, access_token: &str, user_id: &str, changes: &Value) -> Result<(), ProfileError> {
        self.inner.patch(access_token, user_id, changes).await
    }
}

#[tokio::test]
async fn load_overtaken_by_sign_out_is_superseded() {
    let provider = Arc::new(MockProvider::new());
    let entered = Arc::new(tokio::sync::Notify::new());
    let release = Arc::new(tokio::sync::Notify::new());
    let store = GatedStore {
        inner: MockStore::with_row(stored_profile("u-1", "u-1@example.com", "Mochi")),
        entered: entered.clone(),
        release: release.clone(),
    };
    let queries = QueryClient::new();
    let profiles =
        ProfileService::new(Arc::new(store), AuthService::new(provider.clone()), Notifier::new(), &queries);
    signed_in(&provider);

    let loader = profiles.clone();
    let load = tokio::spawn(async move { loader.load().await });
    entered.notified().await;
    queries.clear();
    release.notify_one();

    assert_eq!(load.await.unwrap(), Err(ProfileError::Superseded));
    assert!(profiles.query.snapshot().data().is_none());
}
