/*
[INPUT]:  Error sources (credentials, HTTP, stream protocol, socket, serialization)
[OUTPUT]: Structured error kinds with context and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or changing the REST error shape
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Description attached to REST failures when the server gives none.
pub const DEFAULT_DESCRIPTION: &str = "API request failed";

/// Main error type for the Ripple Prime adapter
#[derive(Error, Debug)]
pub enum PrimeError {
    /// Credentials are missing or unusable; raised before any network call
    #[error("Signing error: {message}")]
    Signing { message: String },

    /// Network failure or non-2xx response from the REST API
    #[error("{message}")]
    Transport {
        message: String,
        description: Option<String>,
        status: Option<u16>,
    },

    /// Inbound stream frame violated the wire contract
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// WebSocket could not be opened or was lost
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl PrimeError {
    /// Build a signing error
    pub fn signing(message: impl Into<String>) -> Self {
        PrimeError::Signing {
            message: message.into(),
        }
    }

    /// Build a transport error with the default description
    pub fn transport(message: impl Into<String>) -> Self {
        PrimeError::Transport {
            message: message.into(),
            description: Some(DEFAULT_DESCRIPTION.to_string()),
            status: None,
        }
    }

    /// Create a transport error from a non-success status and the server's reply.
    ///
    /// The reply's `message` (or `error`) field becomes the message and its
    /// `description` field the description, when the body is JSON.
    pub fn api_error(status: StatusCode, body: &str) -> Self {
        let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
        let field = |name: &str| {
            parsed
                .as_ref()
                .and_then(|value| value.get(name))
                .and_then(|value| value.as_str())
                .map(str::to_string)
        };

        let detail = field("message")
            .or_else(|| field("error"))
            .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

        PrimeError::Transport {
            message: format!("{} - {}", status.as_u16(), detail),
            description: Some(field("description").unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string())),
            status: Some(status.as_u16()),
        }
    }

    /// Check if the error is retryable.
    ///
    /// The client itself never retries; this is a hint for callers that do.
    pub fn is_retryable(&self) -> bool {
        match self {
            PrimeError::Transport { status, .. } => match status {
                None => true,
                Some(code) => *code == 429 || *code >= 500,
            },
            PrimeError::Connectivity(_) => true,
            _ => false,
        }
    }

    /// Check if error was detected before any network call
    pub fn is_signing_error(&self) -> bool {
        matches!(self, PrimeError::Signing { .. } | PrimeError::Config(_))
    }

    /// Human readable description, if one was attached
    pub fn description(&self) -> Option<&str> {
        match self {
            PrimeError::Transport { description, .. } => description.as_deref(),
            _ => None,
        }
    }

    /// HTTP status code, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            PrimeError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PrimeError {
    fn from(err: reqwest::Error) -> Self {
        PrimeError::Transport {
            message: err.to_string(),
            description: Some(DEFAULT_DESCRIPTION.to_string()),
            status: err.status().map(|status| status.as_u16()),
        }
    }
}

/// Result type alias for Ripple Prime operations
pub type Result<T> = std::result::Result<T, PrimeError>;
