/// Per-cluster Kubernetes API access
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::collections::BTreeMap;
use tracing::debug;

use super::kubeconfig::ClientConfig;
use crate::error::ReportError;
use crate::gke::Cluster;

/// Kubernetes client factory over a synthesized client configuration
pub struct KubernetesClient {
    kubeconfig: Kubeconfig,
    /// API server behind each context
    servers: BTreeMap<String, String>,
}

impl KubernetesClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ReportError> {
        let kubeconfig = config
            .to_kubeconfig()
            .map_err(|e| ReportError::KubeconfigFailure(e.to_string()))?;

        let servers = config
            .clusters
            .iter()
            .map(|(name, entry)| (name.clone(), entry.server.clone()))
            .collect();

        Ok(Self {
            kubeconfig,
            servers,
        })
    }

    /// Whether the context named after `cluster` points at this cluster.
    ///
    /// False for a second cluster sharing the name of an earlier one.
    pub fn owns_context(&self, cluster: &Cluster) -> bool {
        self.servers
            .get(&cluster.name)
            .is_some_and(|server| *server == format!("https://{}", cluster.endpoint))
    }

    /// Build a client scoped to the named cluster's context
    pub async fn client_for(&self, cluster: &str) -> Result<Client, ReportError> {
        let options = KubeConfigOptions {
            context: Some(cluster.to_string()),
            ..Default::default()
        };

        let config = Config::from_custom_kubeconfig(self.kubeconfig.clone(), &options)
            .await
            .map_err(|e| ReportError::ClientConfigFailure {
                cluster: cluster.to_string(),
                reason: e.to_string(),
            })?;

        Client::try_from(config).map_err(|e| ReportError::ClientConfigFailure {
            cluster: cluster.to_string(),
            reason: e.to_string(),
        })
    }

    /// Count pods across all namespaces of a cluster
    pub async fn count_pods(&self, cluster: &str) -> Result<usize, ReportError> {
        let client = self.client_for(cluster).await?;
        let pods: Api<Pod> = Api::all(client);

        let list = pods
            .list(&ListParams::default())
            .await
            .map_err(|source| ReportError::PodListFailure {
                cluster: cluster.to_string(),
                source,
            })?;

        debug!("Cluster {} has {} pods", cluster, list.items.len());
        Ok(list.items.len())
    }
}
