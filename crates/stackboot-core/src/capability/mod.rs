//! Capabilities the reconciliation workflow drives.
//!
//! Each trait abstracts one external collaborator so the workflow can run
//! against real services or in-memory fakes.

use std::{collections::BTreeMap, path::Path};

use async_trait::async_trait;
use stackboot_model::{Image, ImageSpec};
use tokio_util::sync::CancellationToken;

use crate::error::{CloudError, ToolError};

/// Image service: named virtual-machine images.
#[async_trait]
pub trait ImageCatalog: Send + Sync {
    /// Every image visible to the tenant (all pages).
    async fn list(&self) -> Result<Vec<Image>, CloudError>;

    /// Register an image copied out of band from `spec.source_url`.
    ///
    /// The returned image is usually not yet `active`.
    async fn create(&self, spec: &ImageSpec) -> Result<Image, CloudError>;

    /// Fresh read of one image.
    async fn get(&self, id: &str) -> Result<Image, CloudError>;

    async fn delete(&self, id: &str) -> Result<(), CloudError>;
}

/// Object storage: containers of named byte blobs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Base URL objects are publicly reachable under (`{endpoint}/{container}/{object}`).
    fn endpoint(&self) -> &str;

    /// Create `container` and apply `headers`; succeeds when it already exists.
    async fn create_container(
        &self,
        container: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<(), CloudError>;

    /// Names of every object in `container` (full listing).
    async fn list_objects(&self, container: &str) -> Result<Vec<String>, CloudError>;

    async fn delete_object(&self, container: &str, object: &str) -> Result<(), CloudError>;

    async fn delete_container(&self, container: &str) -> Result<(), CloudError>;

    async fn put_object(
        &self,
        container: &str,
        object: &str,
        body: Vec<u8>,
    ) -> Result<(), CloudError>;
}

/// Writes simplestreams image metadata for one image into `output_dir`.
#[async_trait]
pub trait MetadataGenerator: Send + Sync {
    async fn generate(
        &self,
        image_id: &str,
        series: &str,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), ToolError>;
}

/// The orchestration tool's own commands.
#[async_trait]
pub trait ClusterTool: Send + Sync {
    /// Confirm the published image metadata is well-formed and reachable.
    async fn validate_images(&self, cancel: &CancellationToken) -> Result<(), ToolError>;

    /// Bootstrap the cluster control plane.
    async fn bootstrap(&self, cancel: &CancellationToken) -> Result<(), ToolError>;
}
