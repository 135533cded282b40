/// Kubernetes client configuration and cluster queries
pub mod client;
pub mod kubeconfig;

pub use client::KubernetesClient;
pub use kubeconfig::{synthesize, AuthPlugin};
