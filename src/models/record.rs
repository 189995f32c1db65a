//! Raw CRM record as returned by the HubSpot v3 search and batch-read
//! endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single entity from a search or batch-read response. Property values
/// are kept as raw JSON because HubSpot returns everything as nullable
/// strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub archived: bool,
}

impl RawRecord {
    /// Non-empty string property, `None` when absent or null.
    pub fn prop_str(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Property parsed as an integer, defaulting to 0 when absent or
    /// unparsable. HubSpot scores arrive as strings, sometimes with a
    /// fractional part; only the leading integer digits count.
    pub fn prop_i64_or_zero(&self, name: &str) -> i64 {
        let Some(raw) = self.prop_str(name).map(str::trim) else {
            return 0;
        };
        let bytes = raw.as_bytes();
        let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        raw[..end].parse().unwrap_or(0)
    }
}
