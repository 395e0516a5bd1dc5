//! HTTP client for the Directus backend.
//!
//! Provides a client with configurable auth (static Bearer token or a persisted login
//! session), the `/items` collection surface behind [`sicc_core::ItemStore`], the auth
//! endpoints and file upload. The services and the CLI use this client directly.

pub mod auth;
pub mod files;
pub mod items;

use anyhow::Context;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use sicc_core::{SiccConfig, SiccError, SiccResult};
use std::sync::Arc;
use tokio::sync::Mutex;

pub use auth::{AuthSession, FileSessionStore, MemorySessionStore, SessionStore};

/// Authentication strategy for the API.
#[derive(Clone)]
pub enum Auth {
    /// No `Authorization` header
    Anonymous,
    /// `Authorization: Bearer {token}` with a fixed token
    Bearer(String),
    /// Tokens obtained through `/auth/login`, refreshed on 401
    Session(Arc<dyn SessionStore>),
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Anonymous => f.write_str("Anonymous"),
            Auth::Bearer(_) => f.write_str("Bearer(..)"),
            Auth::Session(_) => f.write_str("Session(..)"),
        }
    }
}

impl Auth {
    /// The configured static token wins; otherwise the session file is used.
    pub fn from_config(config: &SiccConfig) -> Self {
        match &config.directus_token {
            Some(token) => Auth::Bearer(token.clone()),
            None => Auth::Session(Arc::new(FileSessionStore::new(config.session_file.clone()))),
        }
    }
}

/// HTTP client for the Directus API.
#[derive(Clone, Debug)]
pub struct DirectusClient {
    client: Client,
    base_url: String,
    public_url: String,
    auth: Auth,
    refresh_lock: Arc<Mutex<()>>,
}

/// `{data: ...}` envelope of every Directus response.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    #[serde(default)]
    pub data: Option<T>,
}

impl DirectusClient {
    pub fn new(config: &SiccConfig, auth: Auth) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.directus_url.trim_end_matches('/').to_string(),
            public_url: config.directus_public_url.trim_end_matches('/').to_string(),
            auth,
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Client for `config` with the auth strategy it implies.
    pub fn from_config(config: &SiccConfig) -> anyhow::Result<Self> {
        Self::new(config, Auth::from_config(config))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Public link to an uploaded file.
    pub fn asset_url(&self, file_id: &str) -> String {
        format!("{}/assets/{}", self.public_url, file_id)
    }

    fn current_token(&self) -> Option<String> {
        match &self.auth {
            Auth::Anonymous => None,
            Auth::Bearer(token) => Some(token.clone()),
            Auth::Session(store) => store.load().map(|s| s.access_token),
        }
    }

    async fn send(&self, request: RequestBuilder, token: Option<&str>) -> SiccResult<Response> {
        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        request.send().await.map_err(transport_error)
    }

    /// Send the request built by `build`, attaching the held token. A 401 on a session
    /// client triggers one refresh, after which the request is rebuilt and sent again.
    pub(crate) async fn execute<F>(&self, build: F) -> SiccResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let token = self.current_token();
        let response = self.send(build(&self.client), token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let Auth::Session(store) = &self.auth else {
            return Ok(response);
        };

        tracing::debug!(url = %response.url(), "Received 401, refreshing session");
        let session = self.refresh_after(store.as_ref(), token.as_deref()).await?;
        self.send(build(&self.client), Some(&session.access_token))
            .await
    }

    /// Like [`execute`](Self::execute) but without any `Authorization` header or refresh.
    pub(crate) async fn execute_anonymous(&self, request: RequestBuilder) -> SiccResult<Response> {
        self.send(request, None).await
    }

    /// Execute and decode the JSON body of a successful response.
    pub(crate) async fn execute_json<T, F>(&self, build: F) -> SiccResult<T>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = self.execute(build).await?;
        read_json(response).await
    }
}

fn transport_error(err: reqwest::Error) -> SiccError {
    if err.is_timeout() {
        SiccError::Transport(format!("Request timed out: {}", err))
    } else {
        SiccError::Transport(err.to_string())
    }
}

/// Backend message of an error payload: `errors[0].message`, then `message`.
pub fn extract_error_message(payload: &Value) -> Option<String> {
    payload
        .pointer("/errors/0/message")
        .and_then(Value::as_str)
        .or_else(|| payload.get("message").and_then(Value::as_str))
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

/// Turn a non-2xx response into the error taxonomy.
pub(crate) async fn error_from_response(response: Response) -> SiccError {
    let status = response.status();
    let message = match response.json::<Value>().await {
        Ok(payload) => extract_error_message(&payload),
        Err(_) => None,
    }
    .unwrap_or_else(|| format!("Request failed: {}", status.as_u16()));

    tracing::debug!(status = status.as_u16(), message = %message, "Directus request failed");

    if status == StatusCode::UNAUTHORIZED {
        SiccError::Unauthorized(message)
    } else {
        SiccError::Http {
            status: status.as_u16(),
            message,
        }
    }
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> SiccResult<T> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    let bytes = response.bytes().await.map_err(transport_error)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| SiccError::InvalidResponse(format!("Failed to parse response as JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_message_prefers_errors_array() {
        let payload = json!({
            "errors": [{ "message": "Invalid user credentials." }],
            "message": "ignored"
        });
        assert_eq!(
            extract_error_message(&payload).as_deref(),
            Some("Invalid user credentials.")
        );
        assert_eq!(
            extract_error_message(&json!({ "message": "Forbidden" })).as_deref(),
            Some("Forbidden")
        );
        assert_eq!(extract_error_message(&json!({ "errors": [] })), None);
    }

    #[test]
    fn build_url_normalizes_leading_slash() {
        let config = SiccConfig::with_base_url("https://tto.com.ar/directus/");
        let client = DirectusClient::new(&config, Auth::Anonymous).unwrap();
        assert_eq!(client.build_url("/items/sites"), "https://tto.com.ar/directus/items/sites");
        assert_eq!(client.build_url("files"), "https://tto.com.ar/directus/files");
        assert_eq!(client.build_url("https://other/x"), "https://other/x");
        assert_eq!(client.asset_url("abc"), "https://tto.com.ar/directus/assets/abc");
    }

    #[test]
    fn static_token_takes_precedence_over_session_file() {
        let mut config = SiccConfig::default();
        config.directus_token = Some("static".to_string());
        assert!(matches!(Auth::from_config(&config), Auth::Bearer(t) if t == "static"));
        config.directus_token = None;
        assert!(matches!(Auth::from_config(&config), Auth::Session(_)));
    }
}
