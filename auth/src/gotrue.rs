//! GoTrue REST client: the hosted provider behind [`AuthProvider`].
//!
//! SYSTEM CONTEXT
//! ==============
//! Talks to `{url}/auth/v1` with the project's publishable key. The client
//! owns the current session: it restores it from a [`SessionStore`] on first
//! use, persists every change, refreshes it when it has expired, and pushes
//! a [`ProviderEvent`] whenever the slot changes.
//!
//! ERROR HANDLING
//! ==============
//! Non-2xx answers become [`ProviderError`] objects parsed from the body.
//! Transport failures and undecodable bodies become [`ProviderException`].
//! A refresh rejected with a 4xx means the refresh token is dead, so the
//! local session is dropped and `SignedOut` is emitted.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::provider::{
    AuthProvider, ProviderCall, ProviderError, ProviderEvent, ProviderException, RawSession, RawUser, UserUpdate,
};
use crate::store::SessionStore;
use crate::types::SessionChangeKind;

const EVENT_CHANNEL_CAPACITY: usize = 32;
/// Sessions this close to expiry are treated as expired.
pub const EXPIRY_MARGIN_SECS: i64 = 10;
/// The auto-refresh task renews sessions expiring within this window.
pub const AUTO_REFRESH_MARGIN_SECS: i64 = 90;
pub const SESSION_MISSING_CODE: &str = "session_missing";

#[derive(Clone, Debug)]
pub struct GoTrueConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    pub api_key: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

#[derive(Default)]
struct SessionSlot {
    loaded: bool,
    current: Option<RawSession>,
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct GoTrueClient {
    http: reqwest::Client,
    base: String,
    api_key: String,
    store: Arc<dyn SessionStore>,
    slot: Mutex<SessionSlot>,
    events: broadcast::Sender<ProviderEvent>,
}

impl GoTrueClient {
    /// # Errors
    ///
    /// Returns [`ProviderException::Transport`] when the HTTP client cannot be
    /// built (TLS backend initialisation).
    pub fn new(config: &GoTrueConfig, store: Arc<dyn SessionStore>) -> Result<Self, ProviderException> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ProviderException::Transport(e.to_string()))?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            http,
            base: format!("{}/auth/v1", config.url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            store,
            slot: Mutex::default(),
            events,
        })
    }

    /// Renew the session in the background shortly before it expires.
    ///
    /// The task holds its own handle on the client; abort it on shutdown.
    pub fn spawn_auto_refresh(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                client.refresh_if_due(now_unix()).await;
            }
        })
    }

    async fn refresh_if_due(&self, now: i64) {
        let Some(session) = self.loaded_session() else {
            return;
        };
        if !expires_within(&session, now, AUTO_REFRESH_MARGIN_SECS) {
            return;
        }
        match self.refresh(&session.refresh_token).await {
            Ok(Ok(_)) => debug!("auto-refresh renewed session"),
            Ok(Err(err)) => warn!(status = ?err.status, code = ?err.code, "auto-refresh rejected"),
            Err(err) => warn!(error = %err, "auto-refresh failed"),
        }
    }

    // -------------------------------------------------------------------------
    // session slot
    // -------------------------------------------------------------------------

    /// Current slot contents, restoring from the store on first access.
    fn loaded_session(&self) -> Option<RawSession> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if !slot.loaded {
            slot.loaded = true;
            slot.current = match self.store.load() {
                Ok(session) => session,
                Err(err) => {
                    warn!(error = %err, "stored session unreadable; starting signed out");
                    if let Err(err) = self.store.clear() {
                        warn!(error = %err, "failed to discard unreadable session");
                    }
                    None
                }
            };
            if let Some(session) = &slot.current {
                info!(user_id = %session.user.id, "session restored");
                self.emit(SessionChangeKind::InitialSession, Some(session.clone()));
            }
        }
        slot.current.clone()
    }

    /// Persist `session`, then make it current and announce it. A failed
    /// save leaves the slot and subscribers untouched.
    fn install(&self, kind: SessionChangeKind, mut session: RawSession) -> Result<RawSession, ProviderException> {
        stamp_expiry(&mut session, now_unix());
        self.store.save(&session).map_err(|e| {
            warn!(error = %e, ?kind, "session not persisted; keeping previous session");
            ProviderException::Storage(e.to_string())
        })?;
        {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            slot.loaded = true;
            slot.current = Some(session.clone());
        }
        self.emit(kind, Some(session.clone()));
        Ok(session)
    }

    fn drop_session(&self) -> Result<(), ProviderException> {
        {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            slot.loaded = true;
            slot.current = None;
        }
        self.emit(SessionChangeKind::SignedOut, None);
        self.store.clear().map_err(|e| ProviderException::Storage(e.to_string()))
    }

    fn emit(&self, kind: SessionChangeKind, session: Option<RawSession>) {
        debug!(?kind, "session changed");
        let _ = self.events.send(ProviderEvent { kind, session });
    }

    async fn refresh(&self, refresh_token: &str) -> ProviderCall<RawSession> {
        let request = self
            .request(Method::POST, "/token?grant_type=refresh_token", None)
            .json(&RefreshGrant { refresh_token });
        match Self::execute::<RawSession>(request).await? {
            Ok(session) => Ok(Ok(self.install(SessionChangeKind::TokenRefreshed, session)?)),
            Err(err) => {
                if err.status.is_some_and(|status| (400..500).contains(&status)) {
                    info!(status = ?err.status, "refresh token rejected; dropping session");
                    self.drop_session()?;
                }
                Ok(Err(err))
            }
        }
    }

    // -------------------------------------------------------------------------
    // http
    // -------------------------------------------------------------------------

    fn request(&self, method: Method, path: &str, access_token: Option<&str>) -> RequestBuilder {
        let bearer = access_token.unwrap_or(&self.api_key);
        self.http
            .request(method, format!("{}{path}", self.base))
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    async fn send(request: RequestBuilder) -> Result<(u16, String), ProviderException> {
        let response = request.send().await.map_err(|e| ProviderException::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| ProviderException::Transport(e.to_string()))?;
        Ok((status, text))
    }

    async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> ProviderCall<T> {
        let (status, text) = Self::send(request).await?;
        if !is_success(status) {
            return Ok(Err(parse_error_body(status, &text)));
        }
        serde_json::from_str(&text).map(Ok).map_err(|e| ProviderException::Decode(e.to_string()))
    }

    async fn execute_empty(request: RequestBuilder) -> ProviderCall<()> {
        let (status, text) = Self::send(request).await?;
        if is_success(status) { Ok(Ok(())) } else { Ok(Err(parse_error_body(status, &text))) }
    }
}

#[async_trait::async_trait]
impl AuthProvider for GoTrueClient {
    async fn sign_up(&self, email: &str, password: &str) -> ProviderCall<Option<RawUser>> {
        let request = self.request(Method::POST, "/signup", None).json(&Credentials { email, password });
        let (status, text) = Self::send(request).await?;
        if !is_success(status) {
            return Ok(Err(parse_error_body(status, &text)));
        }
        match parse_sign_up(&text).map_err(|e| ProviderException::Decode(e.to_string()))? {
            SignUpPayload::Session(session) => {
                let session = self.install(SessionChangeKind::SignedIn, *session)?;
                Ok(Ok(Some(session.user)))
            }
            SignUpPayload::User(user) => Ok(Ok(Some(*user))),
            SignUpPayload::Empty => Ok(Ok(None)),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> ProviderCall<Option<RawSession>> {
        let request =
            self.request(Method::POST, "/token?grant_type=password", None).json(&Credentials { email, password });
        match Self::execute::<RawSession>(request).await? {
            Ok(session) => Ok(Ok(Some(self.install(SessionChangeKind::SignedIn, session)?))),
            Err(err) => Ok(Err(err)),
        }
    }

    async fn sign_out(&self) -> ProviderCall<()> {
        let Some(session) = self.loaded_session() else {
            self.drop_session()?;
            return Ok(Ok(()));
        };
        let request = self.request(Method::POST, "/logout", Some(&session.access_token));
        match Self::execute_empty(request).await? {
            Ok(()) => {}
            // The token is already invalid remotely; still sign out locally.
            Err(err) if matches!(err.status, Some(401 | 403 | 404)) => {
                debug!(status = ?err.status, "remote logout rejected stale token");
            }
            Err(err) => return Ok(Err(err)),
        }
        self.drop_session()?;
        Ok(Ok(()))
    }

    async fn reset_password_for_email(&self, email: &str) -> ProviderCall<()> {
        let request = self.request(Method::POST, "/recover", None).json(&RecoverRequest { email });
        Self::execute_empty(request).await
    }

    async fn update_user(&self, update: &UserUpdate) -> ProviderCall<Option<RawUser>> {
        let session = match self.get_session().await? {
            Ok(Some(session)) => session,
            Ok(None) => {
                return Ok(Err(ProviderError::new(Some(401), SESSION_MISSING_CODE, "Auth session missing!")));
            }
            Err(err) => return Ok(Err(err)),
        };
        let request = self.request(Method::PUT, "/user", Some(&session.access_token)).json(update);
        let user = match Self::execute::<RawUser>(request).await? {
            Ok(user) => user,
            Err(err) => return Ok(Err(err)),
        };
        let updated = RawSession { user: user.clone(), ..session };
        self.install(SessionChangeKind::UserUpdated, updated)?;
        Ok(Ok(Some(user)))
    }

    async fn get_session(&self) -> ProviderCall<Option<RawSession>> {
        let Some(session) = self.loaded_session() else {
            return Ok(Ok(None));
        };
        if !expires_within(&session, now_unix(), EXPIRY_MARGIN_SECS) {
            return Ok(Ok(Some(session)));
        }
        debug!("session expired; refreshing");
        Ok(self.refresh(&session.refresh_token).await?.map(Some))
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(serde::Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(serde::Serialize)]
struct RecoverRequest<'a> {
    email: &'a str,
}

#[derive(Default, Deserialize)]
struct ErrorBody {
    error_code: Option<String>,
    code: Option<Value>,
    error: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

/// Body of a successful `/signup`: a full session when confirmation is off,
/// the bare user when a confirmation email went out.
#[derive(Debug, PartialEq)]
enum SignUpPayload {
    Session(Box<RawSession>),
    User(Box<RawUser>),
    Empty,
}

// =============================================================================
// PARSING
// =============================================================================

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Build a [`ProviderError`] from whatever error shape GoTrue returned.
fn parse_error_body(status: u16, text: &str) -> ProviderError {
    let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();
    let string_code = body.code.and_then(|code| code.as_str().map(str::to_owned));
    let code = body.error_code.or(string_code).or_else(|| body.error.clone());
    let message = body
        .msg
        .or(body.message)
        .or(body.error_description)
        .or(body.error)
        .unwrap_or_else(|| format!("HTTP {status}"));
    ProviderError { status: Some(status), code, message: Some(message) }
}

fn parse_sign_up(text: &str) -> Result<SignUpPayload, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    if value.get("access_token").is_some() {
        return serde_json::from_value(value).map(|s| SignUpPayload::Session(Box::new(s)));
    }
    if value.get("id").is_some() {
        return serde_json::from_value(value).map(|u| SignUpPayload::User(Box::new(u)));
    }
    Ok(SignUpPayload::Empty)
}

fn stamp_expiry(session: &mut RawSession, now: i64) {
    if session.expires_at.is_none() {
        session.expires_at = Some(now + session.expires_in);
    }
}

/// Whether `session` expires within `margin` seconds of `now`. A session
/// without an expiry never expires.
fn expires_within(session: &RawSession, now: i64, margin: i64) -> bool {
    session.expires_at.is_some_and(|at| at - margin <= now)
}

#[cfg(test)]
#[path = "gotrue_test.rs"]
mod tests;
