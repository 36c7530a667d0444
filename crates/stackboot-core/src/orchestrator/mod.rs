//! End-to-end bootstrap workflow.

mod stage;
pub use stage::Stage;

use std::{path::PathBuf, sync::Arc};

use stackboot_model::{BootstrapConfig, CleanupFlags, ResolvedImageSet};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::{
    capability::{ClusterTool, ImageCatalog, MetadataGenerator, ObjectStore},
    container::ContainerReconciler,
    environment::{EnvironmentConfigWriter, EnvironmentSettings},
    error::CoreError,
    images::ImageProvisioner,
    poll::PollPolicy,
    publish::MetadataPublisher,
};

/// Operator choices for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub cleanup: CleanupFlags,
    pub skip_bootstrap: bool,
}

/// What a successful run converged to.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub resolved: ResolvedImageSet,
    /// Object names uploaded to the metadata container.
    pub uploaded: Vec<String>,
    pub config_path: PathBuf,
    pub bootstrapped: bool,
    /// Stages reached, in order.
    pub stages: Vec<Stage>,
}

/// Sequences the reconciliation steps and the final tool invocations.
///
/// The run is linear: a failure at any stage aborts it and nothing is retried
/// here. Re-running from the start is safe since each step is idempotent.
pub struct Orchestrator {
    images: ImageProvisioner,
    container: ContainerReconciler,
    publisher: MetadataPublisher,
    store: Arc<dyn ObjectStore>,
    tool: Arc<dyn ClusterTool>,
    environment: EnvironmentConfigWriter,
}

impl Orchestrator {
    pub fn new(
        catalog: Arc<dyn ImageCatalog>,
        store: Arc<dyn ObjectStore>,
        generator: Arc<dyn MetadataGenerator>,
        tool: Arc<dyn ClusterTool>,
        environment: EnvironmentConfigWriter,
    ) -> Self {
        Self {
            images: ImageProvisioner::new(catalog),
            container: ContainerReconciler::new(store.clone()),
            publisher: MetadataPublisher::new(store.clone(), generator),
            store,
            tool,
            environment,
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.images = self.images.with_policy(policy);
        self
    }

    #[instrument(level = "info", skip_all, fields(container = %config.container_name))]
    pub async fn run(
        &self,
        config: &BootstrapConfig,
        opts: &RunOptions,
        cancel: &CancellationToken,
    ) -> Result<RunReport, CoreError> {
        config.validate()?;
        let target = config.container_target();
        let mut stages = Vec::new();

        if opts.cleanup.environment || opts.cleanup.images {
            if opts.cleanup.environment {
                self.environment.clean().await?;
            }
            if opts.cleanup.images {
                let removed = self.images.purge(&config.series).await?;
                info!(removed, "previous images removed");
            }
            advance(&mut stages, Stage::CleanRequested);
        }

        checkpoint(cancel)?;
        let resolved = self.images.reconcile(&config.series, cancel).await?;
        advance(&mut stages, Stage::ImagesReconciled);

        checkpoint(cancel)?;
        self.container.prepare(&target, opts.cleanup.container).await?;
        advance(&mut stages, Stage::ContainerPrepared);

        checkpoint(cancel)?;
        let uploaded = self.publisher.publish(&resolved, &target, cancel).await?;
        advance(&mut stages, Stage::MetadataPublished);

        let settings = EnvironmentSettings {
            cloud: config.cloud.clone(),
            image_metadata_url: metadata_url(self.store.endpoint(), &target.name),
            control_bucket: target.name.clone(),
        };
        let config_path = self.environment.write(&settings).await?;
        advance(&mut stages, Stage::ConfigWritten);

        checkpoint(cancel)?;
        self.tool
            .validate_images(cancel)
            .await
            .map_err(CoreError::Validate)?;
        advance(&mut stages, Stage::MetadataValidated);

        let bootstrapped = if opts.skip_bootstrap {
            info!("bootstrap skipped");
            false
        } else {
            checkpoint(cancel)?;
            self.tool
                .bootstrap(cancel)
                .await
                .map_err(CoreError::Bootstrap)?;
            advance(&mut stages, Stage::BootstrapInvoked);
            true
        };

        advance(&mut stages, Stage::Done);
        Ok(RunReport {
            resolved,
            uploaded,
            config_path,
            bootstrapped,
            stages,
        })
    }
}

/// Where the orchestration tool looks up published image metadata.
pub fn metadata_url(endpoint: &str, container: &str) -> String {
    format!("{}/{}/images", endpoint.trim_end_matches('/'), container)
}

fn advance(stages: &mut Vec<Stage>, stage: Stage) {
    info!(%stage, "stage reached");
    stages.push(stage);
}

fn checkpoint(cancel: &CancellationToken) -> Result<(), CoreError> {
    if cancel.is_cancelled() {
        return Err(CoreError::Cancelled);
    }
    Ok(())
}
