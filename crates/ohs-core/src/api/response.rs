use chrono::{DateTime, Utc};
use serde_json::{json, Value};

/// Per-call switches for [`super::ApiClient::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Queue writes / serve cached reads when the network is unavailable
    pub offline_fallback: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            offline_fallback: true,
        }
    }
}

impl RequestOptions {
    /// Fail with `ApiError::Network` instead of queueing or reading the cache.
    pub const fn online_only() -> Self {
        Self {
            offline_fallback: false,
        }
    }
}

/// Outcome of a request that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// The server answered with this payload
    Online(Value),
    /// The write was deferred to the sync queue under this id
    Queued { id: i64 },
    /// The read was served from the response cache
    Cached {
        data: Value,
        cached_at: DateTime<Utc>,
    },
}

impl ApiResponse {
    pub const fn is_offline(&self) -> bool {
        !matches!(self, Self::Online(_))
    }

    /// Payload from the server or the cache.
    pub const fn payload(&self) -> Option<&Value> {
        match self {
            Self::Online(data) | Self::Cached { data, .. } => Some(data),
            Self::Queued { .. } => None,
        }
    }

    /// Flatten into the JSON shape UI callers expect.
    ///
    /// Queued writes become `{"offline": true, "queued": true}`; cached reads
    /// become `{"data": ..., "offline": true, "cached": true}`.
    pub fn into_json(self) -> Value {
        match self {
            Self::Online(data) => data,
            Self::Queued { .. } => json!({"offline": true, "queued": true}),
            Self::Cached { data, .. } => json!({"data": data, "offline": true, "cached": true}),
        }
    }
}
