use auth::test_helpers::{MockProvider, raw_session};
use serde_json::Value;

use super::*;
use crate::profile::types::NewProfile;
use crate::profile::UserProfile;

struct NoProfiles;

#[async_trait::async_trait]
impl ProfileStore for NoProfiles {
    async fn fetch(&self, _access_token: &str, _user_id: &str) -> Result<Option<UserProfile>, ProfileError> {
        Ok(None)
    }

    async fn insert(&self, _access_token: &str, _profile: &NewProfile) -> Result<UserProfile, ProfileError> {
        Err(ProfileError::EmptyInsert)
    }

    async fn patch(&self, _access_token: &str, _user_id: &str, _changes: &Value) -> Result<(), ProfileError> {
        Ok(())
    }
}

fn state(provider: &Arc<MockProvider>) -> AppState {
    AppState::from_parts(provider.clone(), Arc::new(NoProfiles), "ProfileHub")
}

#[tokio::test]
async fn sign_in_through_actions_is_visible_in_cache() {
    let provider = Arc::new(MockProvider::new());
    let app = state(&provider);
    provider.push_sign_in(Ok(Ok(Some(raw_session("u-1", "tok")))));

    app.actions.sign_in("u-1@example.com", "pw").await.unwrap();
    assert_eq!(app.cache.current().map(|s| s.access_token), Some("tok".to_owned()));
    assert_eq!(provider.session_calls(), 0);
}

#[tokio::test]
async fn clones_share_notifier() {
    let provider = Arc::new(MockProvider::new());
    let app = state(&provider);
    let mut rx = app.clone().notifier.subscribe();

    app.notifier.info("hello");
    assert_eq!(rx.recv().await.unwrap().message, "hello");
}

#[tokio::test]
async fn background_without_gotrue_skips_auto_refresh() {
    let provider = Arc::new(MockProvider::new());
    let app = state(&provider);

    let tasks = app.spawn_background(true);
    assert_eq!(tasks.handles.len(), 2);
    drop(tasks);
}
