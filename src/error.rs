/// Error kinds produced while building a cluster report
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// No authenticated client could be obtained
    #[error("could not get authenticated client: {0}")]
    AuthFailure(String),

    /// Cluster enumeration failed
    #[error("failed to list clusters project={project} zone={zone}")]
    ListFailure {
        project: String,
        zone: String,
        #[source]
        source: anyhow::Error,
    },

    /// A cluster carries a CA certificate that is not valid base64
    #[error("invalid certificate cluster={cluster} cert={raw}")]
    InvalidCertificate {
        cluster: String,
        raw: String,
        #[source]
        source: base64::DecodeError,
    },

    /// A connectable Kubernetes client could not be built for a cluster context
    #[error("failed to create Kubernetes client cluster={cluster}: {reason}")]
    ClientConfigFailure { cluster: String, reason: String },

    /// The synthesized configuration could not be loaded as a kubeconfig
    #[error("invalid client configuration: {0}")]
    KubeconfigFailure(String),

    #[error("failed to list node pools for cluster {cluster:?}")]
    NodePoolListFailure {
        cluster: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to list pods cluster={cluster}")]
    PodListFailure {
        cluster: String,
        #[source]
        source: kube::Error,
    },
}

impl ReportError {
    /// Name of the cluster the error is scoped to, if any
    pub fn cluster(&self) -> Option<&str> {
        match self {
            ReportError::InvalidCertificate { cluster, .. }
            | ReportError::ClientConfigFailure { cluster, .. }
            | ReportError::NodePoolListFailure { cluster, .. }
            | ReportError::PodListFailure { cluster, .. } => Some(cluster),
            ReportError::AuthFailure(_)
            | ReportError::ListFailure { .. }
            | ReportError::KubeconfigFailure(_) => None,
        }
    }
}
