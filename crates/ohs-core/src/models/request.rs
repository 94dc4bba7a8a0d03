//! Request verbs, queued mutations, and cached responses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// HTTP verbs accepted by the API client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// The queueable form of a state-changing verb; `None` for reads.
    #[must_use]
    pub const fn mutation_kind(self) -> Option<MutationKind> {
        match self {
            Self::Get => None,
            Self::Post => Some(MutationKind::Post),
            Self::Put => Some(MutationKind::Put),
            Self::Patch => Some(MutationKind::Patch),
            Self::Delete => Some(MutationKind::Delete),
        }
    }

    /// Whether a JSON body is sent with this verb
    #[must_use]
    pub const fn carries_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("Unsupported HTTP method: {other}")),
        }
    }
}

/// State-changing verbs that can be deferred while offline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MutationKind {
    Post,
    Put,
    Patch,
    Delete,
}

impl MutationKind {
    #[must_use]
    pub const fn method(self) -> HttpMethod {
        match self {
            Self::Post => HttpMethod::Post,
            Self::Put => HttpMethod::Put,
            Self::Patch => HttpMethod::Patch,
            Self::Delete => HttpMethod::Delete,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.method().as_str()
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<HttpMethod>()?
            .mutation_kind()
            .ok_or_else(|| format!("{} is not a state-changing method", s.trim()))
    }
}

/// A state-changing request recorded while offline, awaiting replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMutation {
    /// Auto-increment queue key; replay order is ascending `id`
    pub id: i64,
    #[serde(rename = "method")]
    pub kind: MutationKind,
    /// Endpoint relative to the API base URL
    pub endpoint: String,
    #[serde(default)]
    pub data: Option<Value>,
    pub timestamp: DateTime<Utc>,
    /// Fully-qualified URL at the time the request was queued
    pub url: String,
}

/// Last successful read payload for an endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub endpoint: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_reads_have_no_mutation_kind() {
        assert_eq!(HttpMethod::Get.mutation_kind(), None);
        assert_eq!(HttpMethod::Patch.mutation_kind(), Some(MutationKind::Patch));
        assert_eq!(MutationKind::Delete.method(), HttpMethod::Delete);
    }

    #[test]
    fn body_is_limited_to_post_put_patch() {
        assert!(HttpMethod::Post.carries_body());
        assert!(HttpMethod::Put.carries_body());
        assert!(HttpMethod::Patch.carries_body());
        assert!(!HttpMethod::Get.carries_body());
        assert!(!HttpMethod::Delete.carries_body());
    }

    #[test]
    fn mutation_kind_parse_rejects_get() {
        assert_eq!("post".parse::<MutationKind>().unwrap(), MutationKind::Post);
        assert!("GET".parse::<MutationKind>().is_err());
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }
}
