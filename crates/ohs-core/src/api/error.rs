use serde::Deserialize;
use thiserror::Error;

use super::transport::TransportError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The session could not be recovered; the user has to log in again
    #[error("Authentication required: {0}")]
    Authentication(String),
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("No cached response for {endpoint} while offline")]
    CacheMiss { endpoint: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl ApiError {
    /// Whether the request never reached the server
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<TransportError> for ApiError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Unreachable(message) => Self::Network(message),
            TransportError::Request(message) => Self::InvalidConfiguration(message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Human-readable message for a non-2xx response body.
pub(crate) fn parse_api_error(status: u16, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload
            .message
            .or(payload.error)
            .filter(|message| !message.trim().is_empty())
        {
            return message.trim().to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        trimmed.to_string()
    }
}
