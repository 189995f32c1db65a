//! HubSpot HTTP client.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, error};

use crate::config::AppConfig;
use crate::error::SyncError;
use crate::hubspot::types::{
    AssociationBatchResponse, ObjectRef, SearchRequest, SearchResponse, TokenResponse,
};

/// Typed client for the HubSpot v3 API. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HubSpotClient {
    http: reqwest::Client,
    api_base: String,
    token_base: String,
    client_id: String,
    client_secret: String,
}

#[derive(Serialize)]
struct BatchReadRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    properties: Vec<String>,
    inputs: Vec<ObjectRef>,
}

impl HubSpotClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.hubspot_api_base.trim_end_matches('/').to_string(),
            token_base: config.hubspot_token_base.trim_end_matches('/').to_string(),
            client_id: config.hubspot_client_id.clone(),
            client_secret: config.hubspot_client_secret.clone(),
        }
    }

    /// Construct a client against explicit base URLs (useful for tests).
    pub fn new_with_api_base(
        client_id: String,
        client_secret: String,
        api_base: String,
        token_base: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token_base: token_base.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        }
    }

    /// Search one object type: `POST /crm/v3/objects/{type}/search`.
    pub async fn search(
        &self,
        access_token: &str,
        object_type: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, SyncError> {
        let url = format!("{}/crm/v3/objects/{}/search", self.api_base, object_type);
        debug!(object_type, after = ?request.after, "Issuing search request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(request)
            .send()
            .await?;

        Self::read_json(response, "search").await
    }

    /// Exchange the refresh credential for a new access token:
    /// `POST /oauth/v1/token`.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, SyncError> {
        let url = format!("{}/oauth/v1/token", self.token_base);

        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("client_id", &self.client_id);
        params.insert("client_secret", &self.client_secret);
        params.insert("refresh_token", refresh_token);

        let response = self
            .http
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| SyncError::auth(e.to_string()))?;

        if response.status().is_success() {
            response
                .json::<TokenResponse>()
                .await
                .map_err(|e| SyncError::auth(format!("malformed token response: {}", e)))
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, "Token exchange rejected");
            Err(SyncError::auth(format!(
                "token endpoint returned {}: {}",
                status, body
            )))
        }
    }

    /// Batch-read associations between two object types:
    /// `POST /crm/v3/associations/{FROM}/{TO}/batch/read`.
    pub async fn read_associations(
        &self,
        access_token: &str,
        from_type: &str,
        to_type: &str,
        ids: &[String],
    ) -> Result<AssociationBatchResponse, SyncError> {
        let url = format!(
            "{}/crm/v3/associations/{}/{}/batch/read",
            self.api_base, from_type, to_type
        );
        let body = BatchReadRequest {
            properties: Vec::new(),
            inputs: ids.iter().map(|id| ObjectRef { id: id.clone() }).collect(),
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?;

        Self::read_json(response, "association batch read").await
    }

    /// Batch-read objects by id with a property selection:
    /// `POST /crm/v3/objects/{type}/batch/read`.
    pub async fn batch_read(
        &self,
        access_token: &str,
        object_type: &str,
        properties: &[&str],
        ids: &[String],
    ) -> Result<SearchResponse, SyncError> {
        let url = format!("{}/crm/v3/objects/{}/batch/read", self.api_base, object_type);
        let body = BatchReadRequest {
            properties: properties.iter().map(|p| p.to_string()).collect(),
            inputs: ids.iter().map(|id| ObjectRef { id: id.clone() }).collect(),
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?;

        Self::read_json(response, "object batch read").await
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<T, SyncError> {
        let status = response.status();
        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| SyncError::transient(format!("malformed {} response: {}", operation, e)))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SyncError::transient(format!(
                "{} returned {}: {}",
                operation, status, body
            )))
        }
    }
}
