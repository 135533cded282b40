/// GKE API client implementation
pub mod client;
pub mod credentials;
pub mod models;

pub use client::{ContainerApi, GkeClient};
pub use models::{Cluster, NodePool};
