/// Per-cluster secondary queries
use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use super::ReportRow;
use crate::config::{ErrorPolicy, QueryKind};
use crate::error::ReportError;
use crate::gke::{Cluster, ContainerApi};
use crate::k8s::KubernetesClient;

/// Value reported in the third column of a row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    PodCount(usize),
    MachineTypes(Vec<String>),
    /// The cluster could not be queried
    Error(String),
}

/// A follow-up query issued once per listed cluster
#[async_trait]
pub trait SecondaryQuery: Send + Sync {
    fn kind(&self) -> QueryKind;

    async fn query(&self, cluster: &Cluster) -> Result<Metric, ReportError>;
}

/// Counts pods in all namespaces through the cluster's own API server
pub struct PodCountQuery {
    client: KubernetesClient,
    ignore_errors: bool,
}

impl PodCountQuery {
    /// With `ignore_errors`, a failed pod listing reports zero pods
    pub fn new(client: KubernetesClient, ignore_errors: bool) -> Self {
        Self {
            client,
            ignore_errors,
        }
    }
}

#[async_trait]
impl SecondaryQuery for PodCountQuery {
    fn kind(&self) -> QueryKind {
        QueryKind::Pods
    }

    async fn query(&self, cluster: &Cluster) -> Result<Metric, ReportError> {
        if !self.client.owns_context(cluster) {
            warn!(
                "Cluster {} in {} shares its name with another cluster, pods not counted",
                cluster.name, cluster.zone
            );
            return Ok(Metric::Error(format!(
                "duplicate cluster name {} (zone {})",
                cluster.name, cluster.zone
            )));
        }

        match self.client.count_pods(&cluster.name).await {
            Ok(count) => Ok(Metric::PodCount(count)),
            Err(e) => pod_failure_metric(e, self.ignore_errors),
        }
    }
}

/// A pod listing failure counts as zero pods when ignored; any other error passes through
fn pod_failure_metric(error: ReportError, ignore_errors: bool) -> Result<Metric, ReportError> {
    match error {
        ReportError::PodListFailure { cluster, source } if ignore_errors => {
            debug!("Ignoring pod list failure for {}: {}", cluster, source);
            Ok(Metric::PodCount(0))
        }
        e => Err(e),
    }
}

/// Lists node pool machine types through the GKE API
pub struct MachineTypeQuery<'a> {
    api: &'a dyn ContainerApi,
    project: String,
}

impl<'a> MachineTypeQuery<'a> {
    pub fn new(api: &'a dyn ContainerApi, project: impl Into<String>) -> Self {
        Self {
            api,
            project: project.into(),
        }
    }
}

#[async_trait]
impl SecondaryQuery for MachineTypeQuery<'_> {
    fn kind(&self) -> QueryKind {
        QueryKind::MachineTypes
    }

    async fn query(&self, cluster: &Cluster) -> Result<Metric, ReportError> {
        let pools = self
            .api
            .list_node_pools(&self.project, &cluster.zone, &cluster.name)
            .await?;

        Ok(Metric::MachineTypes(
            pools.into_iter().map(|p| p.config.machine_type).collect(),
        ))
    }
}

/// Run `query` for every cluster, at most `concurrency` at a time.
///
/// Rows come back in the order of `clusters`.
pub async fn collect_rows<Q>(
    clusters: &[Cluster],
    query: &Q,
    policy: ErrorPolicy,
    concurrency: usize,
) -> Result<Vec<ReportRow>, ReportError>
where
    Q: SecondaryQuery + ?Sized,
{
    stream::iter(clusters)
        .map(|cluster| async move {
            let metric = match query.query(cluster).await {
                Ok(metric) => metric,
                Err(e) if row_level(&e, policy) => {
                    let name = e.cluster().unwrap_or(&cluster.name).to_string();
                    let message = format!("{:#}", anyhow::Error::new(e));
                    warn!("Cluster {} reported as error: {}", name, message);
                    Metric::Error(message)
                }
                Err(e) => return Err(e),
            };

            Ok(ReportRow {
                name: cluster.name.clone(),
                node_count: cluster.current_node_count,
                metric,
            })
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

/// Whether a per-cluster failure is reported in its row instead of aborting
fn row_level(error: &ReportError, policy: ErrorPolicy) -> bool {
    match error {
        ReportError::PodListFailure { .. } => true,
        ReportError::ClientConfigFailure { .. } | ReportError::NodePoolListFailure { .. } => {
            policy == ErrorPolicy::BestEffort
        }
        _ => false,
    }
}
