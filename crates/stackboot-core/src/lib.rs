//! Idempotent reconciliation of the cloud resources a cluster bootstrap needs.
//!
//! The workflow converges images, the metadata container and the environment
//! config to the desired state; every step is safe to re-run.

pub mod error;
pub use error::{CloudError, CoreError, ToolError};

pub mod capability;
pub use capability::{ClusterTool, ImageCatalog, MetadataGenerator, ObjectStore};

mod poll;
pub use poll::PollPolicy;

pub mod images;
pub use images::ImageProvisioner;

pub mod container;
pub use container::ContainerReconciler;

pub mod publish;
pub use publish::MetadataPublisher;

pub mod environment;
pub use environment::{EnvironmentConfigWriter, EnvironmentSettings};

pub mod orchestrator;
pub use orchestrator::{Orchestrator, RunOptions, RunReport, Stage};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
