//! Normalized analytics action events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Action classification per entity type. Serialized using the analytics
/// sink's display names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActionName {
    #[serde(rename = "Company Created")]
    CompanyCreated,
    #[serde(rename = "Company Updated")]
    CompanyUpdated,
    #[serde(rename = "Contact Created")]
    ContactCreated,
    #[serde(rename = "Contact Updated")]
    ContactUpdated,
    #[serde(rename = "Meeting Created")]
    MeetingCreated,
    #[serde(rename = "Meeting Updated")]
    MeetingUpdated,
}

impl ActionName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompanyCreated => "Company Created",
            Self::CompanyUpdated => "Company Updated",
            Self::ContactCreated => "Contact Created",
            Self::ContactUpdated => "Contact Updated",
            Self::MeetingCreated => "Meeting Created",
            Self::MeetingUpdated => "Meeting Updated",
        }
    }
}

impl std::fmt::Display for ActionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single timestamped event destined for the analytics sink.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub action_name: ActionName,
    /// Epoch milliseconds.
    pub action_date: i64,
    pub include_in_analytics: u8,
    /// Identity key for person-scoped actions (the contact's email).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Action {
    pub fn new(action_name: ActionName, action_date: DateTime<Utc>) -> Self {
        Self {
            action_name,
            action_date: action_date.timestamp_millis(),
            include_in_analytics: 0,
            identity: None,
            payload: Map::new(),
        }
    }

    pub fn with_identity<S: Into<String>>(mut self, identity: S) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn with_payload<S: Into<String>>(mut self, key: S, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }
}

/// Drop null-valued entries from a payload mapping so the sink never sees
/// absent attributes as explicit nulls.
pub fn filter_null_values(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().filter(|(_, v)| !v.is_null()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_sink_field_names() {
        let action = Action::new(
            ActionName::ContactCreated,
            "2025-03-01T12:00:00Z".parse().unwrap(),
        )
        .with_identity("jane@example.com")
        .with_payload("userProperties", json!({"contact_score": 12}));

        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["actionName"], "Contact Created");
        assert_eq!(value["includeInAnalytics"], 0);
        assert_eq!(value["identity"], "jane@example.com");
        assert_eq!(value["userProperties"]["contact_score"], 12);
        assert_eq!(value["actionDate"], 1740830400000i64);
    }

    #[test]
    fn identity_omitted_for_company_actions() {
        let action = Action::new(ActionName::CompanyUpdated, Utc::now());
        let value = serde_json::to_value(&action).unwrap();
        assert!(value.get("identity").is_none());
    }

    #[test]
    fn filter_null_values_drops_only_nulls() {
        let map = json!({"a": null, "b": "x", "c": 0})
            .as_object()
            .cloned()
            .unwrap();
        let filtered = filter_null_values(map);
        assert!(!filtered.contains_key("a"));
        assert_eq!(filtered.len(), 2);
    }
}
