//! Login sessions: the token bundle, where it is persisted, and the auth endpoints.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sicc_core::models::LoginRequest;
use sicc_core::{ErrorMetadata, SiccError, SiccResult};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use validator::Validate;

use crate::{error_from_response, read_json, Auth, DirectusClient};

/// Tokens of a logged-in user. `expires_at` is epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl AuthSession {
    /// Read `{data: {access_token, refresh_token, expires}}` (or the bare inner object).
    ///
    /// Both tokens are required. `expires` is taken as seconds from `now_millis`; a missing
    /// or zero value means the session has no known expiry.
    pub fn from_payload(payload: &Value, now_millis: i64) -> Option<Self> {
        let data = match payload.get("data") {
            Some(inner) if !inner.is_null() => inner,
            _ => payload,
        };
        let access_token = non_empty_str(data.get("access_token"))?;
        let refresh_token = non_empty_str(data.get("refresh_token"))?;
        let expires = data
            .get("expires")
            .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .unwrap_or(0);

        Some(Self {
            access_token,
            refresh_token,
            expires_at: (expires != 0).then(|| now_millis + expires * 1000),
        })
    }

    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        self.expires_at.is_some_and(|at| now_millis >= at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Where the session bundle lives between runs.
pub trait SessionStore: Send + Sync {
    /// The stored session. Missing or unreadable storage reads as no session.
    fn load(&self) -> Option<AuthSession>;

    fn save(&self, session: &AuthSession) -> SiccResult<()>;

    fn clear(&self) -> SiccResult<()>;
}

/// JSON file holding `{accessToken, refreshToken, expiresAt}`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<AuthSession> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring corrupt session file");
                None
            }
        }
    }

    fn save(&self, session: &AuthSession) -> SiccResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(session)
            .map_err(|e| SiccError::Session(format!("Failed to serialize session: {}", e)))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    fn clear(&self) -> SiccResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local session, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<AuthSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: AuthSession) -> Self {
        Self {
            inner: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<AuthSession> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, session: &AuthSession) -> SiccResult<()> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> SiccResult<()> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

impl DirectusClient {
    fn session_store(&self) -> SiccResult<&dyn SessionStore> {
        match self.auth() {
            Auth::Session(store) => Ok(store.as_ref()),
            _ => Err(SiccError::Config(
                "Login sessions are disabled while SICC_DIRECTUS_TOKEN is set".to_string(),
            )),
        }
    }

    /// The stored session, if this client uses login sessions and one is held.
    pub fn session(&self) -> Option<AuthSession> {
        match self.auth() {
            Auth::Session(store) => store.load(),
            _ => None,
        }
    }

    pub fn has_session(&self) -> bool {
        self.session().is_some()
    }

    /// `POST /auth/login`. Credentials are validated before any request is sent.
    pub async fn login(&self, credentials: &LoginRequest) -> SiccResult<AuthSession> {
        credentials.validate()?;
        let store = self.session_store()?;

        let request = self
            .client
            .post(self.build_url("/auth/login"))
            .json(&json!({ "email": credentials.email, "password": credentials.password }));
        let payload: Value = read_json(self.execute_anonymous(request).await?).await?;

        let session = AuthSession::from_payload(&payload, Utc::now().timestamp_millis())
            .ok_or_else(|| {
                SiccError::InvalidResponse("Respuesta de autenticación inválida.".to_string())
            })?;
        store.save(&session)?;
        tracing::info!(email = %credentials.email, "Logged in");
        Ok(session)
    }

    /// `POST /auth/refresh` with the stored refresh token.
    pub async fn refresh(&self) -> SiccResult<AuthSession> {
        let store = self.session_store()?;
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked(store).await
    }

    /// Refresh unless another caller already replaced `stale` while we waited for the lock.
    pub(crate) async fn refresh_after(
        &self,
        store: &dyn SessionStore,
        stale: Option<&str>,
    ) -> SiccResult<AuthSession> {
        let _guard = self.refresh_lock.lock().await;
        if let Some(current) = store.load() {
            if stale.is_some_and(|token| token != current.access_token) {
                return Ok(current);
            }
        }
        self.refresh_locked(store).await
    }

    async fn refresh_locked(&self, store: &dyn SessionStore) -> SiccResult<AuthSession> {
        match self.request_refresh(store).await {
            Ok(session) => {
                store.save(&session)?;
                tracing::debug!("Session refreshed");
                Ok(session)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Session refresh failed, clearing stored session");
                if let Err(clear_err) = store.clear() {
                    tracing::warn!(error = %clear_err, "Failed to clear session");
                }
                Err(match err {
                    SiccError::SessionExpired(_) | SiccError::Transport(_) => err,
                    other => SiccError::SessionExpired(other.client_message()),
                })
            }
        }
    }

    async fn request_refresh(&self, store: &dyn SessionStore) -> SiccResult<AuthSession> {
        let refresh_token = store
            .load()
            .map(|s| s.refresh_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                SiccError::SessionExpired("No hay refresh token disponible.".to_string())
            })?;

        let request = self
            .client
            .post(self.build_url("/auth/refresh"))
            .json(&json!({ "refresh_token": refresh_token }));
        let response = self.execute_anonymous(request).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let payload: Value = read_json(response).await?;
        AuthSession::from_payload(&payload, Utc::now().timestamp_millis()).ok_or_else(|| {
            SiccError::InvalidResponse("Respuesta de refresh inválida.".to_string())
        })
    }

    /// Forget the stored session.
    pub fn logout(&self) -> SiccResult<()> {
        self.session_store()?.clear()?;
        tracing::info!("Logged out");
        Ok(())
    }
}
