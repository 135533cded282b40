/// GKE API data models
use serde::{Deserialize, Serialize};

/// GKE cluster resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub name: String,
    #[serde(default)]
    pub current_node_count: i32,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub location: String,
    /// Control plane address, without scheme
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub master_auth: MasterAuth,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub current_master_version: String,
}

/// Authentication material for the cluster control plane
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterAuth {
    /// Base64 encoded PEM of the cluster root CA
    #[serde(default)]
    pub cluster_ca_certificate: String,
}

/// Node pool resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    pub name: String,
    #[serde(default)]
    pub config: NodeConfig,
    #[serde(default)]
    pub initial_node_count: i32,
    #[serde(default)]
    pub status: String,
}

/// Node pool machine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    #[serde(default)]
    pub machine_type: String,
}

/// Cluster list response
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListClustersResponse {
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    /// Zones that could not be reached when listing with the wildcard zone
    #[serde(default)]
    pub missing_zones: Vec<String>,
}

/// Node pool list response
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNodePoolsResponse {
    #[serde(default)]
    pub node_pools: Vec<NodePool>,
}

/// Error response from API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ApiError,
}

/// API error details
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub status: String,
}
