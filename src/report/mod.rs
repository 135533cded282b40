/// Cluster report: listing, per-cluster queries and rendering
pub mod query;
pub mod render;

use serde::Serialize;
use tracing::info;

use crate::config::{QueryKind, ReportConfig};
use crate::error::ReportError;
use crate::gke::ContainerApi;
use crate::k8s::{synthesize, AuthPlugin, KubernetesClient};
use query::{collect_rows, MachineTypeQuery, Metric, PodCountQuery, SecondaryQuery};

/// One line of the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub name: String,
    pub node_count: i32,
    #[serde(flatten)]
    pub metric: Metric,
}

/// Rows ready for rendering, sorted by node count
#[derive(Debug, Clone)]
pub struct Report {
    pub query: QueryKind,
    pub rows: Vec<ReportRow>,
}

/// List clusters, query each one and return the sorted report.
///
/// For the pod query, `plugin` must come from [`AuthPlugin::initialize`].
pub async fn generate(
    config: &ReportConfig,
    api: &dyn ContainerApi,
    plugin: &AuthPlugin,
) -> Result<Report, ReportError> {
    let clusters = api.list_clusters(&config.project, &config.zone).await?;
    info!(
        "Found {} clusters in project {} (zone {})",
        clusters.len(),
        config.project,
        config.zone
    );

    match config.query {
        QueryKind::Pods => {
            let client_config = synthesize(&clusters, &config.project, plugin)?;
            let query = PodCountQuery::new(
                KubernetesClient::new(&client_config)?,
                config.ignore_pod_errors,
            );
            build(&clusters, &query, config).await
        }
        QueryKind::MachineTypes => {
            let query = MachineTypeQuery::new(api, config.project.clone());
            build(&clusters, &query, config).await
        }
    }
}

async fn build<Q>(
    clusters: &[crate::gke::Cluster],
    query: &Q,
    config: &ReportConfig,
) -> Result<Report, ReportError>
where
    Q: SecondaryQuery + ?Sized,
{
    let mut rows = collect_rows(clusters, query, config.on_error, config.concurrency).await?;
    render::sort_rows(&mut rows);

    Ok(Report {
        query: query.kind(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ErrorPolicy;
    use crate::gke::models::{MasterAuth, NodeConfig};
    use crate::gke::{Cluster, NodePool};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeApi {
        clusters: Option<Vec<Cluster>>,
        pools: Vec<(&'static str, Vec<&'static str>)>,
        pool_calls: AtomicUsize,
    }

    impl FakeApi {
        fn with_clusters(clusters: Vec<Cluster>) -> Self {
            Self {
                clusters: Some(clusters),
                pools: vec![],
                pool_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContainerApi for FakeApi {
        async fn list_clusters(
            &self,
            project: &str,
            zone: &str,
        ) -> Result<Vec<Cluster>, ReportError> {
            self.clusters
                .clone()
                .ok_or_else(|| ReportError::ListFailure {
                    project: project.to_string(),
                    zone: zone.to_string(),
                    source: anyhow::anyhow!("quota exceeded"),
                })
        }

        async fn list_node_pools(
            &self,
            _project: &str,
            _zone: &str,
            cluster: &str,
        ) -> Result<Vec<NodePool>, ReportError> {
            self.pool_calls.fetch_add(1, Ordering::SeqCst);
            let (_, types) = self
                .pools
                .iter()
                .find(|(name, _)| *name == cluster)
                .ok_or_else(|| ReportError::NodePoolListFailure {
                    cluster: cluster.to_string(),
                    source: anyhow::anyhow!("not found"),
                })?;

            Ok(types
                .iter()
                .map(|t| NodePool {
                    name: format!("{}-pool", t),
                    config: NodeConfig {
                        machine_type: t.to_string(),
                    },
                    ..Default::default()
                })
                .collect())
        }
    }

    fn cluster(name: &str, nodes: i32) -> Cluster {
        Cluster {
            name: name.to_string(),
            current_node_count: nodes,
            zone: "us-central1-a".to_string(),
            endpoint: "10.0.0.1".to_string(),
            master_auth: MasterAuth::default(),
            ..Default::default()
        }
    }

    fn machine_config() -> ReportConfig {
        let mut config = ReportConfig::new("my-project", "-");
        config.query = QueryKind::MachineTypes;
        config
    }

    #[tokio::test]
    async fn test_rows_sorted_by_node_count() {
        let mut api =
            FakeApi::with_clusters(vec![cluster("a", 3), cluster("b", 7), cluster("c", 7)]);
        api.pools = vec![("a", vec!["e2-small"]), ("b", vec!["e2-medium"]), ("c", vec![])];

        let report = generate(&machine_config(), &api, &AuthPlugin::ApplicationDefault)
            .await
            .unwrap();

        let names: Vec<_> = report.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
        assert_eq!(report.query, QueryKind::MachineTypes);
    }

    #[tokio::test]
    async fn test_machine_types_for_single_cluster() {
        let mut api = FakeApi::with_clusters(vec![cluster("prod", 4)]);
        api.pools = vec![("prod", vec!["n1-standard-4", "e2-medium"])];

        let report = generate(&machine_config(), &api, &AuthPlugin::ApplicationDefault)
            .await
            .unwrap();

        assert_eq!(report.rows.len(), 1);
        assert_eq!(
            report.rows[0].metric,
            Metric::MachineTypes(vec!["n1-standard-4".to_string(), "e2-medium".to_string()])
        );
    }

    #[tokio::test]
    async fn test_list_failure_produces_no_report() {
        let api = FakeApi {
            clusters: None,
            pools: vec![],
            pool_calls: AtomicUsize::new(0),
        };

        let err = generate(&machine_config(), &api, &AuthPlugin::ApplicationDefault)
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::ListFailure { .. }));
        assert_eq!(api.pool_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_node_pool_failure_aborts() {
        let mut api = FakeApi::with_clusters(vec![cluster("a", 1), cluster("missing", 2)]);
        api.pools = vec![("a", vec!["e2-small"])];

        let err = generate(&machine_config(), &api, &AuthPlugin::ApplicationDefault)
            .await
            .unwrap_err();
        assert_eq!(err.cluster(), Some("missing"));
    }

    #[tokio::test]
    async fn test_node_pool_failure_best_effort() {
        let mut api = FakeApi::with_clusters(vec![cluster("a", 1), cluster("missing", 2)]);
        api.pools = vec![("a", vec!["e2-small"])];
        let mut config = machine_config();
        config.on_error = ErrorPolicy::BestEffort;

        let report = generate(&config, &api, &AuthPlugin::ApplicationDefault)
            .await
            .unwrap();

        assert_eq!(report.rows[0].name, "missing");
        assert!(matches!(report.rows[0].metric, Metric::Error(_)));
        assert_eq!(
            report.rows[1].metric,
            Metric::MachineTypes(vec!["e2-small".to_string()])
        );
    }

    #[tokio::test]
    async fn test_pod_query_rejects_invalid_certificate_before_any_query() {
        let mut bad = cluster("bad", 1);
        bad.master_auth.cluster_ca_certificate = "***".to_string();
        let api = FakeApi::with_clusters(vec![cluster("good", 2), bad]);

        let config = ReportConfig::new("my-project", "-");
        let err = generate(&config, &api, &AuthPlugin::ApplicationDefault)
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::InvalidCertificate { .. }));
    }
}
