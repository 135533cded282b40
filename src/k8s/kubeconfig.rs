/// In-memory kubeconfig synthesized from the GKE cluster list
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use kube::config::Kubeconfig;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::AuthPluginKind;
use crate::error::ReportError;
use crate::gke::credentials::CLOUD_PLATFORM_SCOPE;
use crate::gke::Cluster;
use crate::utils::command::check_tool_installed;

/// Name of the auth provider plugin handling GKE tokens
pub const GCP_AUTH_PROVIDER: &str = "gcp";

/// Connection details for one cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterEntry {
    pub server: String,
    /// Decoded PEM bytes of the cluster CA
    pub certificate_authority_data: Vec<u8>,
}

/// Auth provider descriptor; carries no token
#[derive(Debug, Clone, PartialEq)]
pub struct AuthProvider {
    pub name: String,
    pub config: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextEntry {
    pub cluster: String,
    pub auth_info: String,
}

/// Client configuration covering every cluster of a run, keyed by cluster name
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub clusters: BTreeMap<String, ClusterEntry>,
    pub auth_infos: BTreeMap<String, AuthProvider>,
    pub contexts: BTreeMap<String, ContextEntry>,
}

/// Token source for the `gcp` auth provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPlugin {
    /// Tokens from application default credentials
    ApplicationDefault,
    /// Tokens from `gcloud config config-helper`
    Gcloud { cmd_path: String },
}

impl AuthPlugin {
    /// Prepare the auth provider plugin. Must run before any cluster client is built.
    pub async fn initialize(kind: AuthPluginKind) -> Result<Self, ReportError> {
        match kind {
            AuthPluginKind::Adc => {
                if let Ok(path) = std::env::var("GOOGLE_APPLICATION_CREDENTIALS") {
                    if !std::path::Path::new(&path).exists() {
                        return Err(ReportError::AuthFailure(format!(
                            "GOOGLE_APPLICATION_CREDENTIALS points to a missing file: {}",
                            path
                        )));
                    }
                }
                Ok(AuthPlugin::ApplicationDefault)
            }
            AuthPluginKind::Gcloud => {
                check_tool_installed(
                    "gcloud",
                    &["--version"],
                    "https://cloud.google.com/sdk/docs/install",
                )
                .await
                .map_err(|e| ReportError::AuthFailure(e.to_string()))?;
                Ok(AuthPlugin::Gcloud {
                    cmd_path: "gcloud".to_string(),
                })
            }
        }
    }

    /// Auth provider descriptor registered for every cluster
    pub fn provider(&self) -> AuthProvider {
        let mut config = BTreeMap::new();
        config.insert("scopes".to_string(), CLOUD_PLATFORM_SCOPE.to_string());

        if let AuthPlugin::Gcloud { cmd_path } = self {
            config.insert("cmd-path".to_string(), cmd_path.clone());
            config.insert(
                "cmd-args".to_string(),
                "config config-helper --format=json".to_string(),
            );
            config.insert(
                "token-key".to_string(),
                "{.credential.access_token}".to_string(),
            );
            config.insert(
                "expiry-key".to_string(),
                "{.credential.token_expiry}".to_string(),
            );
        }

        AuthProvider {
            name: GCP_AUTH_PROVIDER.to_string(),
            config,
        }
    }
}

/// Build a client configuration for every cluster.
///
/// Fails on the first certificate that is not valid base64; no partial
/// configuration is returned in that case.
pub fn synthesize(
    clusters: &[Cluster],
    project: &str,
    plugin: &AuthPlugin,
) -> Result<ClientConfig, ReportError> {
    let mut config = ClientConfig::default();

    for cluster in clusters {
        let name = cluster.name.clone();
        let raw = &cluster.master_auth.cluster_ca_certificate;

        let cert = STANDARD
            .decode(raw)
            .map_err(|source| ReportError::InvalidCertificate {
                cluster: name.clone(),
                raw: raw.clone(),
                source,
            })?;

        if config.clusters.contains_key(&name) {
            warn!(
                "Duplicate cluster name {} (zone {}), keeping the first entry",
                name, cluster.zone
            );
            continue;
        }

        config.clusters.insert(
            name.clone(),
            ClusterEntry {
                server: format!("https://{}", cluster.endpoint),
                certificate_authority_data: cert,
            },
        );
        config.contexts.insert(
            name.clone(),
            ContextEntry {
                cluster: name.clone(),
                auth_info: name.clone(),
            },
        );
        config.auth_infos.insert(name, plugin.provider());
    }

    if config.is_empty() {
        debug!("No clusters to configure in project {}", project);
    } else {
        debug!(
            "Synthesized client configuration for {} clusters in project {}",
            config.len(),
            project
        );
    }

    Ok(config)
}

impl ClientConfig {
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Materialize as a kube-rs kubeconfig
    pub fn to_kubeconfig(&self) -> Result<Kubeconfig, serde_json::Error> {
        let clusters: Vec<_> = self
            .clusters
            .iter()
            .map(|(name, entry)| {
                serde_json::json!({
                    "name": name,
                    "cluster": {
                        "server": entry.server,
                        "certificate-authority-data": STANDARD.encode(&entry.certificate_authority_data),
                    }
                })
            })
            .collect();

        let users: Vec<_> = self
            .auth_infos
            .iter()
            .map(|(name, provider)| {
                serde_json::json!({
                    "name": name,
                    "user": {
                        "auth-provider": {
                            "name": provider.name,
                            "config": provider.config,
                        }
                    }
                })
            })
            .collect();

        let contexts: Vec<_> = self
            .contexts
            .iter()
            .map(|(name, context)| {
                serde_json::json!({
                    "name": name,
                    "context": {
                        "cluster": context.cluster,
                        "user": context.auth_info,
                    }
                })
            })
            .collect();

        serde_json::from_value(serde_json::json!({
            "apiVersion": "v1",
            "kind": "Config",
            "clusters": clusters,
            "users": users,
            "contexts": contexts,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gke::models::MasterAuth;

    fn cluster(name: &str, endpoint: &str, cert: &str) -> Cluster {
        Cluster {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            zone: "us-central1-a".to_string(),
            master_auth: MasterAuth {
                cluster_ca_certificate: cert.to_string(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_one_entry_per_cluster_in_each_map() {
        let clusters = vec![
            cluster("a", "10.0.0.1", &STANDARD.encode("cert-a")),
            cluster("b", "10.0.0.2", &STANDARD.encode("cert-b")),
            cluster("c", "10.0.0.3", ""),
        ];

        let config = synthesize(&clusters, "my-project", &AuthPlugin::ApplicationDefault).unwrap();

        assert_eq!(config.clusters.len(), 3);
        assert_eq!(config.auth_infos.len(), 3);
        assert_eq!(config.contexts.len(), 3);

        for c in &clusters {
            let entry = &config.clusters[&c.name];
            assert_eq!(entry.server, format!("https://{}", c.endpoint));
            assert_eq!(config.contexts[&c.name].cluster, c.name);
            assert_eq!(config.contexts[&c.name].auth_info, c.name);
        }
        assert_eq!(config.clusters["a"].certificate_authority_data, b"cert-a");
    }

    #[test]
    fn test_invalid_certificate_fails_whole_config() {
        let clusters = vec![
            cluster("good", "10.0.0.1", &STANDARD.encode("cert")),
            cluster("bad", "10.0.0.2", "%%% not base64 %%%"),
        ];

        let err = synthesize(&clusters, "my-project", &AuthPlugin::ApplicationDefault).unwrap_err();
        match err {
            ReportError::InvalidCertificate { cluster, raw, .. } => {
                assert_eq!(cluster, "bad");
                assert_eq!(raw, "%%% not base64 %%%");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_auth_provider_placeholder_has_no_token() {
        let provider = AuthPlugin::ApplicationDefault.provider();
        assert_eq!(provider.name, "gcp");
        assert_eq!(
            provider.config.get("scopes").map(String::as_str),
            Some("https://www.googleapis.com/auth/cloud-platform")
        );
        assert_eq!(provider.config.len(), 1);
    }

    #[test]
    fn test_gcloud_provider_uses_config_helper() {
        let provider = AuthPlugin::Gcloud {
            cmd_path: "gcloud".to_string(),
        }
        .provider();
        assert_eq!(provider.config["cmd-path"], "gcloud");
        assert_eq!(provider.config["token-key"], "{.credential.access_token}");
        assert!(provider.config.contains_key("scopes"));
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let clusters = vec![
            cluster("dup", "10.0.0.1", ""),
            cluster("dup", "10.0.0.2", ""),
        ];

        let config = synthesize(&clusters, "p", &AuthPlugin::ApplicationDefault).unwrap();
        assert_eq!(config.len(), 1);
        assert_eq!(config.clusters["dup"].server, "https://10.0.0.1");

        let empty = synthesize(&[], "p", &AuthPlugin::ApplicationDefault).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_to_kubeconfig() {
        let clusters = vec![
            cluster("a", "10.0.0.1", &STANDARD.encode("cert-a")),
            cluster("b", "10.0.0.2", &STANDARD.encode("cert-b")),
        ];
        let config = synthesize(&clusters, "p", &AuthPlugin::ApplicationDefault).unwrap();

        let kubeconfig = config.to_kubeconfig().unwrap();
        assert_eq!(kubeconfig.clusters.len(), 2);
        assert_eq!(kubeconfig.auth_infos.len(), 2);
        assert_eq!(kubeconfig.contexts.len(), 2);

        let named = kubeconfig.clusters.iter().find(|c| c.name == "b").unwrap();
        let cluster = named.cluster.as_ref().unwrap();
        assert_eq!(cluster.server.as_deref(), Some("https://10.0.0.2"));
        assert_eq!(
            cluster.certificate_authority_data.as_deref(),
            Some(STANDARD.encode("cert-b").as_str())
        );

        let user = kubeconfig.auth_infos[0].auth_info.as_ref().unwrap();
        assert_eq!(user.auth_provider.as_ref().unwrap().name, "gcp");
    }

    #[tokio::test]
    async fn test_adc_initialization() {
        if std::env::var("GOOGLE_APPLICATION_CREDENTIALS").is_err() {
            let plugin = AuthPlugin::initialize(AuthPluginKind::Adc).await.unwrap();
            assert_eq!(plugin, AuthPlugin::ApplicationDefault);
        }
    }
}
