//! Profile persistence over the project's PostgREST endpoint.
//!
//! SYSTEM CONTEXT
//! ==============
//! Rows live in the `profiles` table at `{url}/rest/v1/profiles`. Row-level
//! security scopes every request to the caller, so each call carries the
//! signed-in user's access token as the bearer.

use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::types::{NewProfile, ProfileError, UserProfile};

#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch(&self, access_token: &str, user_id: &str) -> Result<Option<UserProfile>, ProfileError>;

    /// Insert and return the stored row.
    async fn insert(&self, access_token: &str, profile: &NewProfile) -> Result<UserProfile, ProfileError>;

    /// Apply `changes` (a JSON object of columns) to the user's row.
    async fn patch(&self, access_token: &str, user_id: &str, changes: &Value) -> Result<(), ProfileError>;
}

// =============================================================================
// POSTGREST
// =============================================================================

pub struct PostgrestProfiles {
    http: reqwest::Client,
    table_url: String,
    api_key: String,
}

impl PostgrestProfiles {
    /// # Errors
    ///
    /// Returns [`ProfileError::Transport`] when the HTTP client cannot be built.
    pub fn new(
        url: &str,
        api_key: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, ProfileError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ProfileError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            table_url: format!("{}/rest/v1/profiles", url.trim_end_matches('/')),
            api_key: api_key.to_owned(),
        })
    }

    fn request(&self, method: Method, query: &str, access_token: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{query}", self.table_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
    }

    async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ProfileError> {
        let text = Self::send(request).await?;
        serde_json::from_str(&text).map_err(|e| ProfileError::Decode(e.to_string()))
    }

    async fn send(request: RequestBuilder) -> Result<String, ProfileError> {
        let response = request.send().await.map_err(|e| ProfileError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| ProfileError::Transport(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(parse_error_body(status, &text));
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl ProfileStore for PostgrestProfiles {
    async fn fetch(&self, access_token: &str, user_id: &str) -> Result<Option<UserProfile>, ProfileError> {
        let query = format!("?id=eq.{user_id}&select=*");
        let rows: Vec<UserProfile> = Self::execute(self.request(Method::GET, &query, access_token)).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, access_token: &str, profile: &NewProfile) -> Result<UserProfile, ProfileError> {
        let request = self
            .request(Method::POST, "", access_token)
            .header("Prefer", "return=representation")
            .json(profile);
        let rows: Vec<UserProfile> = Self::execute(request).await?;
        rows.into_iter().next().ok_or(ProfileError::EmptyInsert)
    }

    async fn patch(&self, access_token: &str, user_id: &str, changes: &Value) -> Result<(), ProfileError> {
        let query = format!("?id=eq.{user_id}");
        let request = self
            .request(Method::PATCH, &query, access_token)
            .header("Prefer", "return=minimal")
            .json(changes);
        Self::send(request).await.map(|_| ())
    }
}

#[derive(Default, serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
    details: Option<String>,
}

/// PostgREST error objects carry `message` and sometimes `details`.
fn parse_error_body(status: u16, text: &str) -> ProfileError {
    let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();
    let message = match (body.message, body.details) {
        (Some(message), Some(details)) => format!("{message}: {details}"),
        (Some(message), None) => message,
        (None, _) => format!("HTTP {status}"),
    };
    ProfileError::Api { status, message }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
