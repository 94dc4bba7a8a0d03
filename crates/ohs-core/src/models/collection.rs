//! Named record collections mirrored from the remote API

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A local record collection.
///
/// Each collection mirrors one remote resource; records are keyed by their
/// `id` field and are never authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Incidents,
    Documents,
    Inspections,
    CorrectiveActions,
}

impl Collection {
    pub const ALL: [Self; 4] = [
        Self::Incidents,
        Self::Documents,
        Self::Inspections,
        Self::CorrectiveActions,
    ];

    /// Storage name of the collection
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Incidents => "incidents",
            Self::Documents => "documents",
            Self::Inspections => "inspections",
            Self::CorrectiveActions => "correctiveActions",
        }
    }

    /// Remote endpoint root for the collection
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Incidents => "/incidents",
            Self::Documents => "/documents",
            Self::Inspections => "/inspections",
            Self::CorrectiveActions => "/corrective-actions",
        }
    }

    /// Map an endpoint path to its collection and optional record id.
    ///
    /// `/incidents` → `(Incidents, None)`, `/incidents/42` → `(Incidents, Some("42"))`.
    /// Deeper paths such as `/corrective-actions/7/complete` still resolve to
    /// their collection and record id. Query strings are ignored.
    pub fn from_endpoint(endpoint: &str) -> Option<(Self, Option<String>)> {
        let path = endpoint.split(['?', '#']).next().unwrap_or_default();
        let mut segments = path.split('/').filter(|segment| !segment.is_empty());
        let root = format!("/{}", segments.next()?);
        let collection = Self::ALL
            .into_iter()
            .find(|collection| collection.endpoint() == root)?;
        let id = segments
            .next()
            .and_then(|segment| urlencoding::decode(segment).ok())
            .map(|segment| segment.into_owned());
        Some((collection, id))
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|collection| {
                collection.as_str().eq_ignore_ascii_case(wanted)
                    || collection.endpoint().trim_start_matches('/') == wanted
            })
            .ok_or_else(|| format!("Unknown collection: {wanted}"))
    }
}

/// Extract the record key of a JSON item.
///
/// String ids are used as-is; numeric ids are rendered in decimal.
pub fn record_key(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(id) if !id.trim().is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_endpoint_resolves_collection_and_id() {
        assert_eq!(
            Collection::from_endpoint("/incidents"),
            Some((Collection::Incidents, None))
        );
        assert_eq!(
            Collection::from_endpoint("/documents/abc-1?include=history"),
            Some((Collection::Documents, Some("abc-1".to_string())))
        );
        assert_eq!(
            Collection::from_endpoint("/corrective-actions/7/complete"),
            Some((Collection::CorrectiveActions, Some("7".to_string())))
        );
        assert_eq!(Collection::from_endpoint("/users/1"), None);
    }

    #[test]
    fn parse_accepts_storage_and_endpoint_names() {
        assert_eq!(
            "correctiveActions".parse::<Collection>().unwrap(),
            Collection::CorrectiveActions
        );
        assert_eq!(
            "corrective-actions".parse::<Collection>().unwrap(),
            Collection::CorrectiveActions
        );
        assert!("risks".parse::<Collection>().is_err());
    }

    #[test]
    fn record_key_accepts_strings_and_numbers() {
        assert_eq!(record_key(&json!({"id": "inc-1"})), Some("inc-1".to_string()));
        assert_eq!(record_key(&json!({"id": 42})), Some("42".to_string()));
        assert_eq!(record_key(&json!({"id": ""})), None);
        assert_eq!(record_key(&json!({"title": "Fall"})), None);
    }
}
