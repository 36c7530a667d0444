//! Image metadata generation and upload.

mod workspace;
pub use workspace::{Workspace, WorkspaceFile, collect_files};

use std::{path::Path, sync::Arc};

use stackboot_model::{ContainerTarget, ResolvedImageSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::{
    capability::{MetadataGenerator, ObjectStore},
    error::CoreError,
};

pub struct MetadataPublisher {
    store: Arc<dyn ObjectStore>,
    generator: Arc<dyn MetadataGenerator>,
}

impl MetadataPublisher {
    pub fn new(store: Arc<dyn ObjectStore>, generator: Arc<dyn MetadataGenerator>) -> Self {
        Self { store, generator }
    }

    /// Generate metadata for every resolved image and upload it to `target`.
    ///
    /// Every handle must be `active`; otherwise nothing is generated or
    /// uploaded. Generation runs in a fresh workspace that is removed on every
    /// exit path. Returns the uploaded object names.
    #[instrument(level = "info", skip_all, fields(container = %target.name, images = resolved.len()))]
    pub async fn publish(
        &self,
        resolved: &ResolvedImageSet,
        target: &ContainerTarget,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, CoreError> {
        if let Some(handle) = resolved.first_inactive() {
            return Err(CoreError::ImageNotActive {
                series: handle.series.clone(),
                status: handle.status,
            });
        }

        let workspace = Workspace::acquire()?;
        let result = self.publish_from(workspace.path(), resolved, target, cancel).await;
        workspace.release();
        result
    }

    async fn publish_from(
        &self,
        dir: &Path,
        resolved: &ResolvedImageSet,
        target: &ContainerTarget,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, CoreError> {
        for (series, handle) in resolved {
            debug!(name = %handle.name, %series, "generating metadata for image");
            self.generator
                .generate(&handle.id, series, dir, cancel)
                .await
                .map_err(|source| CoreError::Generate {
                    series: series.clone(),
                    source,
                })?;
        }

        let files = collect_files(dir)?;
        let mut uploaded = Vec::with_capacity(files.len());
        for file in files {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            let body = tokio::fs::read(&file.path)
                .await
                .map_err(CoreError::Workspace)?;

            debug!(object = %file.object, bytes = body.len(), "pushing file to container");
            self.store
                .put_object(&target.name, &file.object, body)
                .await
                .map_err(|source| CoreError::Upload {
                    object: file.object.clone(),
                    source,
                })?;
            uploaded.push(file.object);
        }

        info!(objects = uploaded.len(), "image metadata published");
        Ok(uploaded)
    }
}
