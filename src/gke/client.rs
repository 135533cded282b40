/// GKE (container.googleapis.com) API client
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::models::*;
use crate::error::ReportError;

pub const GKE_API_BASE: &str = "https://container.googleapis.com/v1";

/// Read-only operations the report needs from the GKE control plane
#[async_trait]
pub trait ContainerApi: Send + Sync {
    /// List clusters of a project in one zone, or all zones for "-"
    async fn list_clusters(&self, project: &str, zone: &str) -> Result<Vec<Cluster>, ReportError>;

    /// List node pools of one cluster
    async fn list_node_pools(
        &self,
        project: &str,
        zone: &str,
        cluster: &str,
    ) -> Result<Vec<NodePool>, ReportError>;
}

/// Main GKE API client
#[derive(Clone)]
pub struct GkeClient {
    client: Client,
    base_url: String,
}

impl GkeClient {
    /// Create a client for the public GKE endpoint
    pub fn new(access_token: &str) -> Result<Self> {
        Self::with_base_url(access_token, GKE_API_BASE)
    }

    /// Create a client against a custom API base URL
    pub fn with_base_url(access_token: &str, base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .with_context(|| format!("Invalid API endpoint: {}", base_url))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", access_token))
                .context("Invalid access token format")?,
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Make a GET request to the API
    pub(crate) async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send GET request")?;

        self.handle_response(response).await
    }

    /// Handle API response, checking for errors
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json::<T>()
                .await
                .context("Failed to parse API response")
        } else {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_text) {
                anyhow::bail!(
                    "API error: {} {} - {}",
                    error_response.error.code,
                    error_response.error.status,
                    error_response.error.message
                );
            }

            anyhow::bail!("API request failed with status {}: {}", status, error_text)
        }
    }
}

#[async_trait]
impl ContainerApi for GkeClient {
    async fn list_clusters(&self, project: &str, zone: &str) -> Result<Vec<Cluster>, ReportError> {
        // clusters.list is not paginated; one response holds the full list
        let response: ListClustersResponse = self
            .get(&format!("projects/{}/zones/{}/clusters", project, zone))
            .await
            .map_err(|source| ReportError::ListFailure {
                project: project.to_string(),
                zone: zone.to_string(),
                source,
            })?;

        if !response.missing_zones.is_empty() {
            warn!(
                "Cluster list is incomplete, unreachable zones: {}",
                response.missing_zones.join(", ")
            );
        }

        debug!("Found {} clusters", response.clusters.len());
        Ok(response.clusters)
    }

    async fn list_node_pools(
        &self,
        project: &str,
        zone: &str,
        cluster: &str,
    ) -> Result<Vec<NodePool>, ReportError> {
        let response: ListNodePoolsResponse = self
            .get(&format!(
                "projects/{}/zones/{}/clusters/{}/nodePools",
                project, zone, cluster
            ))
            .await
            .map_err(|source| ReportError::NodePoolListFailure {
                cluster: cluster.to_string(),
                source,
            })?;

        Ok(response.node_pools)
    }
}
