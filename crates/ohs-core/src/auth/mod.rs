//! Session credentials and the 401 refresh-and-retry state machine.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Endpoint used to exchange a refresh token for a new access token.
pub const REFRESH_ENDPOINT: &str = "/auth/refresh";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl Session {
    pub fn new(token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            token: token.into(),
            refresh_token,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Where the `token`/`refreshToken` pair lives between runs.
pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<Session>>;
    fn save_session(&self, session: &Session) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Process-local session store.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    session: Arc<Mutex<Option<Session>>>,
}

impl MemorySessionStore {
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(Some(session))),
        }
    }
}

impl SessionPersistence for MemorySessionStore {
    fn load_session(&self) -> AuthResult<Option<Session>> {
        let guard = self
            .session
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        Ok(guard.clone())
    }

    fn save_session(&self, session: &Session) -> AuthResult<()> {
        let mut guard = self
            .session
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> AuthResult<()> {
        let mut guard = self
            .session
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// Hook invoked when the session cannot be recovered and the user must log in again.
pub trait LoginRedirect: Send + Sync {
    fn redirect_to_login(&self);
}

impl<F> LoginRedirect for F
where
    F: Fn() + Send + Sync,
{
    fn redirect_to_login(&self) {
        self();
    }
}

/// Progress of a single request through 401 handling.
///
/// `Authenticated → Refreshing → Retried → Failed`. A request refreshes at
/// most once; any 401 after `Refreshing` ends in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    /// First attempt with the stored token
    Authenticated,
    /// First attempt was rejected; a refresh is in progress
    Refreshing,
    /// Refresh succeeded; the request was re-sent once
    Retried,
    /// The session is unrecoverable
    Failed,
}

impl AuthPhase {
    /// Transition after the server answered 401.
    #[must_use]
    pub const fn on_unauthorized(self) -> Self {
        match self {
            Self::Authenticated => Self::Refreshing,
            Self::Refreshing | Self::Retried | Self::Failed => Self::Failed,
        }
    }

    /// Transition after a refresh attempt finished.
    #[must_use]
    pub const fn on_refresh(self, refreshed: bool) -> Self {
        match (self, refreshed) {
            (Self::Refreshing, true) => Self::Retried,
            _ => Self::Failed,
        }
    }

    /// Whether the request may be (re)sent in this phase.
    #[must_use]
    pub const fn may_send(self) -> bool {
        matches!(self, Self::Authenticated | Self::Retried)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    token: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Build the replacement session from a refresh response body.
///
/// Keeps the previous refresh token when the server does not rotate it.
pub fn parse_refresh_response(body: &[u8], previous_refresh_token: &str) -> AuthResult<Session> {
    let payload = serde_json::from_slice::<RefreshResponse>(body)?;
    let token = payload
        .token
        .or(payload.access_token)
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::Api("Refresh response did not include a token".to_string()))?;
    let refresh_token = payload
        .refresh_token
        .filter(|token| !token.trim().is_empty())
        .unwrap_or_else(|| previous_refresh_token.to_string());

    Ok(Session::new(token, Some(refresh_token)))
}
