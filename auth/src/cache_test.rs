use std::time::Duration;

use super::*;
use crate::normalize::{EXCEPTION_CODE, map_session};
use crate::provider::ProviderEvent;
use crate::query::STALE_AFTER;
use crate::test_helpers::{MockProvider, raw_session, unreachable};

fn cache() -> (Arc<MockProvider>, SessionCache) {
    let provider = Arc::new(MockProvider::new());
    let cache = SessionCache::new(AuthService::new(provider.clone()), QueryClient::new());
    (provider, cache)
}

#[tokio::test]
async fn initialize_fetches_present_session() {
    let (provider, cache) = cache();
    provider.push_session(Ok(Ok(Some(raw_session("u-1", "tok")))));

    let snap = cache.initialize().await;
    assert_eq!(snap.data().map(|s| s.user.id.as_str()), Some("u-1"));
    assert_eq!(provider.session_calls(), 1);
}

#[tokio::test]
async fn initialize_without_session_is_absent() {
    let (provider, cache) = cache();
    provider.push_session(Ok(Ok(None)));

    let snap = cache.initialize().await;
    assert_eq!(snap.status, QueryStatus::Absent);
    assert!(cache.current().is_none());
}

#[tokio::test]
async fn failed_first_fetch_is_errored_and_not_retried() {
    let (provider, cache) = cache();
    provider.push_session(Err(unreachable()));

    let snap = cache.initialize().await;
    assert_eq!(snap.error().map(|e| e.code.as_str()), Some(EXCEPTION_CODE));
    assert_eq!(provider.session_calls(), 1);
}

#[tokio::test]
async fn signed_in_session_is_served_without_remote_fetch() {
    let (provider, cache) = cache();
    let session = map_session(raw_session("u-1", "tok"));

    cache.set_session(session.clone());
    let now = Instant::now();
    let snap = cache.on_mount_at(now + Duration::from_secs(60)).await;

    assert_eq!(snap.data(), Some(&session));
    assert_eq!(cache.current(), Some(session));
    assert_eq!(provider.session_calls(), 0);
}

#[tokio::test]
async fn stale_session_is_refetched_on_mount() {
    let (provider, cache) = cache();
    cache.set_session(map_session(raw_session("u-1", "old")));
    provider.push_session(Ok(Ok(Some(raw_session("u-1", "new")))));

    let snap = cache.on_mount_at(Instant::now() + STALE_AFTER).await;
    assert_eq!(snap.data().map(|s| s.access_token.as_str()), Some("new"));
    assert_eq!(provider.session_calls(), 1);
}

#[tokio::test]
async fn window_focus_and_reconnect() {
    let (provider, cache) = cache();
    cache.on_window_focus();
    assert_eq!(provider.session_calls(), 0);

    provider.push_session(Ok(Ok(None)));
    cache.on_reconnect().await;
    assert_eq!(provider.session_calls(), 1);
}

#[tokio::test]
async fn sign_out_clears_session_and_other_queries() {
    let (_provider, cache) = cache();
    let profile = Arc::new(Query::<String, String>::new("profile"));
    cache.queries().register(profile.clone());

    cache.set_session(map_session(raw_session("u-1", "tok")));
    profile.set_at(Some("nickname".into()), Instant::now());

    cache.clear_on_sign_out();
    assert!(cache.current().is_none());
    assert_eq!(cache.snapshot().status, QueryStatus::Absent);
    assert_eq!(profile.snapshot().status, QueryStatus::Empty);
}

#[tokio::test]
async fn listener_applies_provider_events() {
    let (provider, cache) = cache();
    let mut handle = cache.handle();
    let listener = cache.spawn_listener();
    tokio::task::yield_now().await;

    provider.emit(ProviderEvent { kind: SessionChangeKind::TokenRefreshed, session: Some(raw_session("u-1", "t2")) });
    assert!(handle.changed().await);
    assert_eq!(handle.session().map(|s| s.access_token), Some("t2".into()));

    provider.emit(ProviderEvent { kind: SessionChangeKind::SignedOut, session: None });
    assert!(handle.changed().await);
    assert!(handle.is_signed_out());

    listener.abort();
}

#[tokio::test]
async fn handle_reports_loading_and_error() {
    let (provider, cache) = cache();
    let handle = cache.handle();
    assert!(!handle.is_loading());

    provider.push_session(Err(unreachable()));
    handle.refetch().await;
    assert!(!handle.is_fetching());
    assert_eq!(handle.error().map(|e| e.code), Some(EXCEPTION_CODE.to_owned()));
}
