//! Error types module
//!
//! All failures of the client, the services and the session store are unified under
//! [`SiccError`]. The variants follow the error taxonomy of the dashboard: HTTP failures
//! carry the backend status, cancellation has its own kind so callers can swallow it,
//! auth failures distinguish a rejected request from an unrecoverable session, and
//! validation failures are reported per field before any request is sent.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures or cancellation
    Debug,
    /// Warning level - for recoverable issues like an expired session
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the user.
pub trait ErrorMetadata {
    /// HTTP status reported by the backend, if the error came from a response
    fn status_code(&self) -> Option<u16>;

    /// Machine-readable error code (e.g., "HTTP_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether re-running the same action may succeed
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (the raw backend message where there is one)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum SiccError {
    #[error("Request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request aborted")]
    Aborted,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Incomplete data: {0}")]
    Incomplete(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session storage error: {0}")]
    Session(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type SiccResult<T> = Result<T, SiccError>;

impl From<anyhow::Error> for SiccError {
    fn from(err: anyhow::Error) -> Self {
        SiccError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for SiccError {
    fn from(err: io::Error) -> Self {
        SiccError::Session(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for SiccError {
    fn from(err: serde_json::Error) -> Self {
        SiccError::InvalidResponse(format!("JSON parsing error: {}", err))
    }
}

impl From<envy::Error> for SiccError {
    fn from(err: envy::Error) -> Self {
        SiccError::Config(err.to_string())
    }
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn sicc_error_static_metadata(err: &SiccError) -> (&'static str, bool, LogLevel) {
    match err {
        SiccError::Http { status, .. } if *status >= 500 => ("HTTP_ERROR", true, LogLevel::Error),
        SiccError::Http { .. } => ("HTTP_ERROR", false, LogLevel::Warn),
        SiccError::Transport(_) => ("TRANSPORT_ERROR", true, LogLevel::Error),
        SiccError::Aborted => ("ABORTED", true, LogLevel::Debug),
        SiccError::Unauthorized(_) => ("UNAUTHORIZED", false, LogLevel::Debug),
        SiccError::SessionExpired(_) => ("SESSION_EXPIRED", false, LogLevel::Warn),
        SiccError::Validation(_) => ("VALIDATION_ERROR", false, LogLevel::Debug),
        SiccError::InvalidInput(_) => ("INVALID_INPUT", false, LogLevel::Debug),
        SiccError::InvalidResponse(_) => ("INVALID_RESPONSE", false, LogLevel::Error),
        SiccError::NotFound(_) => ("NOT_FOUND", false, LogLevel::Debug),
        SiccError::Incomplete(_) => ("INCOMPLETE_DATA", true, LogLevel::Warn),
        SiccError::Config(_) => ("CONFIG_ERROR", false, LogLevel::Error),
        SiccError::Session(_) => ("SESSION_STORAGE_ERROR", true, LogLevel::Warn),
        SiccError::InternalWithSource { .. } => ("INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl SiccError {
    /// True for the cancellation kind. Callers ignore these instead of showing them.
    pub fn is_aborted(&self) -> bool {
        matches!(self, SiccError::Aborted)
    }

    /// True when the user has to authenticate again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            SiccError::SessionExpired(_) | SiccError::Unauthorized(_)
        )
    }

    /// Banner text: a localized prefix followed by the raw message.
    pub fn banner_message(&self, prefix: &str) -> String {
        format!("{} {}", prefix.trim_end(), self.client_message())
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for SiccError {
    fn status_code(&self) -> Option<u16> {
        match self {
            SiccError::Http { status, .. } => Some(*status),
            SiccError::Unauthorized(_) | SiccError::SessionExpired(_) => Some(401),
            SiccError::NotFound(_) => Some(404),
            _ => None,
        }
    }

    fn error_code(&self) -> &'static str {
        sicc_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        sicc_error_static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        sicc_error_static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            SiccError::Http { message, .. } => message.clone(),
            SiccError::Transport(msg) => msg.clone(),
            SiccError::Aborted => "La operación fue cancelada.".to_string(),
            SiccError::Unauthorized(msg) => msg.clone(),
            SiccError::SessionExpired(msg) => msg.clone(),
            SiccError::Validation(errors) => errors.to_string(),
            SiccError::InvalidInput(msg) => msg.clone(),
            SiccError::InvalidResponse(msg) => msg.clone(),
            SiccError::NotFound(msg) => msg.clone(),
            SiccError::Incomplete(msg) => msg.clone(),
            SiccError::Config(msg) => msg.clone(),
            SiccError::Session(msg) => msg.clone(),
            SiccError::InternalWithSource { message, .. } => message.clone(),
        }
    }
}
