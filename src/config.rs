//! Application configuration parsed from environment variables.
//!
//! A `.env` file in the working directory is loaded first (see `main`), so
//! every key below can live there during development.

use std::path::PathBuf;
use std::time::Duration;

use auth::gotrue::GoTrueConfig;

pub const DEFAULT_APP_NAME: &str = "ProfileHub";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {var}")]
    MissingVar { var: String },
    #[error("invalid SUPABASE_URL '{0}': expected an http(s) URL")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_key: String,
    pub app_name: String,
    pub session_file: PathBuf,
    pub timeouts: AuthTimeouts,
    /// Renew the session in the background before it expires.
    pub auto_refresh: bool,
}

impl Config {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `SUPABASE_URL`
    /// - `SUPABASE_PUBLISHABLE_KEY` (falls back to `SUPABASE_ANON_KEY`)
    ///
    /// Optional:
    /// - `APP_NAME`: default `ProfileHub`
    /// - `PROFILEHUB_SESSION_FILE`: default `~/.profilehub/session.json`
    /// - `AUTH_REQUEST_TIMEOUT_SECS`: default 30
    /// - `AUTH_CONNECT_TIMEOUT_SECS`: default 10
    /// - `AUTH_AUTO_REFRESH`: default true
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or the URL
    /// is not http(s).
    pub fn from_env() -> Result<Self, ConfigError> {
        let supabase_url = require("SUPABASE_URL")?.trim_end_matches('/').to_owned();
        if !(supabase_url.starts_with("https://") || supabase_url.starts_with("http://")) {
            return Err(ConfigError::InvalidUrl(supabase_url));
        }
        let supabase_key = require("SUPABASE_PUBLISHABLE_KEY").or_else(|_| require("SUPABASE_ANON_KEY"))?;

        let app_name = std::env::var("APP_NAME").unwrap_or_else(|_| DEFAULT_APP_NAME.to_owned());
        let session_file =
            std::env::var_os("PROFILEHUB_SESSION_FILE").map_or_else(default_session_file, PathBuf::from);
        let timeouts = AuthTimeouts {
            request_secs: env_parse("AUTH_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("AUTH_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let auto_refresh = env_bool("AUTH_AUTO_REFRESH", true);

        Ok(Self { supabase_url, supabase_key, app_name, session_file, timeouts, auto_refresh })
    }

    #[must_use]
    pub fn gotrue(&self) -> GoTrueConfig {
        GoTrueConfig {
            url: self.supabase_url.clone(),
            api_key: self.supabase_key.clone(),
            request_timeout: Duration::from_secs(self.timeouts.request_secs),
            connect_timeout: Duration::from_secs(self.timeouts.connect_secs),
        }
    }
}

fn require(var: &str) -> Result<String, ConfigError> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVar { var: var.to_owned() })
}

fn default_session_file() -> PathBuf {
    let base = std::env::var_os("HOME").map_or_else(PathBuf::new, PathBuf::from);
    base.join(".profilehub").join(SESSION_FILE_NAME)
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
