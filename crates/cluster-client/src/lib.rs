//! Cluster Client
//!
//! The object-store surface the dashboard controller needs: read and write
//! `DashboardConfig` resources and the `ConfigMap`s derived from them, plus
//! the owner-reference helper that links the two for garbage collection.
//!
//! # Example
//!
//! ```no_run
//! use cluster_client::{ClusterClient, ClusterClientTrait, ObjectKey};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ClusterClient::new(kube::Client::try_default().await?);
//! let key = ObjectKey::new("monitoring", "alpha");
//! let dashboard = client.get_dashboard_config(&key).await?;
//! println!("{}", dashboard.spec.title);
//! # Ok(())
//! # }
//! ```
//!
//! Unit tests use [`MockClusterClient`] (feature `test-util`), which keeps
//! objects in memory and enforces resource versions the way the API server
//! does.

pub mod client;
pub mod error;
pub mod key;
pub mod owner;
#[path = "trait.rs"]
pub mod cluster_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::ClusterClient;
pub use cluster_trait::ClusterClientTrait;
pub use error::ClusterError;
pub use key::ObjectKey;
pub use owner::{is_controlled_by, set_controller_reference};
#[cfg(feature = "test-util")]
pub use mock::{Failure, MockClusterClient, Operation};
