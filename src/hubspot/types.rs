//! Wire structs for the HubSpot v3 endpoints used by the engine.

use serde::{Deserialize, Serialize};

use crate::models::RawRecord;

/// One property filter inside a filter group.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub property_name: String,
    pub operator: String,
    pub value: String,
}

impl Filter {
    pub fn gte<S: Into<String>, V: Into<String>>(property: S, value: V) -> Self {
        Self {
            property_name: property.into(),
            operator: "GTE".to_string(),
            value: value.into(),
        }
    }

    pub fn lte<S: Into<String>, V: Into<String>>(property: S, value: V) -> Self {
        Self {
            property_name: property.into(),
            operator: "LTE".to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterGroup {
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sort {
    pub property_name: String,
    pub direction: String,
}

impl Sort {
    pub fn ascending<S: Into<String>>(property: S) -> Self {
        Self {
            property_name: property.into(),
            direction: "ASCENDING".to_string(),
        }
    }
}

/// Body for `POST /crm/v3/objects/{type}/search`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub filter_groups: Vec<FilterGroup>,
    pub sorts: Vec<Sort>,
    pub properties: Vec<String>,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PagingNext {
    pub after: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paging {
    pub next: Option<PagingNext>,
}

/// Response envelope for search and batch-read calls.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<RawRecord>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

impl SearchResponse {
    /// Next-page offset, parsed from the paging cursor. HubSpot returns the
    /// offset as a decimal string.
    pub fn next_after(&self) -> Option<u64> {
        self.paging
            .as_ref()
            .and_then(|p| p.next.as_ref())
            .and_then(|n| n.after.parse().ok())
    }
}

/// Response from `POST /oauth/v1/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: String,
}

/// One row of an association batch-read response: a source object and the
/// objects associated with it.
#[derive(Debug, Clone, Deserialize)]
pub struct AssociationResult {
    pub from: Option<ObjectRef>,
    #[serde(default)]
    pub to: Vec<ObjectRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssociationBatchResponse {
    #[serde(default)]
    pub results: Vec<AssociationResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_request_serializes_camel_case() {
        let request = SearchRequest {
            filter_groups: vec![FilterGroup {
                filters: vec![Filter::gte("hs_lastmodifieddate", "1700000000000")],
            }],
            sorts: vec![Sort::ascending("hs_lastmodifieddate")],
            properties: vec!["name".to_string()],
            limit: 100,
            after: Some(200),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value["filterGroups"][0]["filters"][0]["propertyName"],
            "hs_lastmodifieddate"
        );
        assert_eq!(value["filterGroups"][0]["filters"][0]["operator"], "GTE");
        assert_eq!(value["sorts"][0]["direction"], "ASCENDING");
        assert_eq!(value["after"], 200);
    }

    #[test]
    fn search_request_omits_absent_cursor() {
        let request = SearchRequest {
            filter_groups: vec![],
            sorts: vec![],
            properties: vec![],
            limit: 100,
            after: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("after").is_none());
    }

    #[test]
    fn next_after_parses_string_cursor() {
        let response: SearchResponse = serde_json::from_value(json!({
            "results": [],
            "paging": {"next": {"after": "9900"}},
        }))
        .unwrap();
        assert_eq!(response.next_after(), Some(9900));

        let terminal: SearchResponse = serde_json::from_value(json!({"results": []})).unwrap();
        assert_eq!(terminal.next_after(), None);
    }

    #[test]
    fn association_rows_tolerate_missing_from() {
        let response: AssociationBatchResponse = serde_json::from_value(json!({
            "results": [
                {"from": {"id": "1"}, "to": [{"id": "9"}]},
                {"to": []},
            ],
        }))
        .unwrap();
        assert_eq!(response.results.len(), 2);
        assert!(response.results[1].from.is_none());
    }
}
