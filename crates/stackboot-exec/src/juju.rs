use std::path::{Path, PathBuf};

use async_trait::async_trait;
use stackboot_core::{ClusterTool, MetadataGenerator, ToolError};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::proc::{self, ProcConfig};

pub const DEFAULT_PROGRAM: &str = "juju";
pub const JUJU_HOME_ENV: &str = "JUJU_HOME";

/// The `juju` command line, pinned to one home directory.
#[derive(Clone, Debug)]
pub struct JujuCli {
    program: String,
    home: PathBuf,
}

impl JujuCli {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            home: home.into(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn command<I, S>(&self, args: I) -> ProcConfig
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProcConfig::new(&self.program)
            .args(args)
            .env(JUJU_HOME_ENV, self.home.to_string_lossy())
    }

    /// Output goes to an explicit directory; the working directory is untouched.
    fn generate_command(&self, image_id: &str, series: &str, output_dir: &Path) -> ProcConfig {
        self.command([
            "metadata".to_string(),
            "generate-image".to_string(),
            "-i".to_string(),
            image_id.to_string(),
            "-s".to_string(),
            series.to_string(),
            "-d".to_string(),
            output_dir.to_string_lossy().into_owned(),
        ])
    }

    async fn invoke(&self, cfg: ProcConfig, cancel: &CancellationToken) -> Result<(), ToolError> {
        proc::run(&cfg, cancel)
            .await
            .map(|_| ())
            .map_err(|e| e.into_tool_error(&self.program))
    }
}

#[async_trait]
impl MetadataGenerator for JujuCli {
    async fn generate(
        &self,
        image_id: &str,
        series: &str,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), ToolError> {
        let cfg = self.generate_command(image_id, series, output_dir);
        self.invoke(cfg, cancel).await
    }
}

#[async_trait]
impl ClusterTool for JujuCli {
    async fn validate_images(&self, cancel: &CancellationToken) -> Result<(), ToolError> {
        info!("validating image metadata");
        self.invoke(self.command(["metadata", "validate-images"]), cancel)
            .await
    }

    async fn bootstrap(&self, cancel: &CancellationToken) -> Result<(), ToolError> {
        info!("bootstrapping environment");
        self.invoke(self.command(["bootstrap"]), cancel).await
    }
}
