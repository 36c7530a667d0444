use std::sync::Arc;

use anyhow::Context;
use stackboot_cloud::OpenStack;
use stackboot_core::{EnvironmentConfigWriter, Orchestrator, RunReport};
use stackboot_exec::JujuCli;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument::WithSubscriber, warn};

use crate::{args::Args, config::load_config};

/// Load the configuration, connect to the cloud and run the workflow.
pub async fn run(args: &Args, cancel: CancellationToken) -> anyhow::Result<RunReport> {
    let config = load_config(&args.config_file)?;
    let home = args
        .juju_home()
        .context("cannot determine juju home; pass --juju-home or set JUJU_HOME")?;

    let cloud = OpenStack::connect(&config.cloud)
        .await
        .context("connecting to OpenStack")?;
    let juju = Arc::new(JujuCli::new(&home).with_program(&args.juju));

    let orchestrator = Orchestrator::new(
        Arc::new(cloud.glance),
        Arc::new(cloud.swift),
        juju.clone(),
        juju,
        EnvironmentConfigWriter::new(&home),
    )
    .with_poll_policy(args.poll_policy());

    let signal = cancel.clone();
    tokio::spawn(
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted; cancelling");
                signal.cancel();
            }
        }
        .with_current_subscriber(),
    );

    let report = orchestrator
        .run(&config, &args.run_options(), &cancel)
        .await?;
    info!(
        images = report.resolved.len(),
        objects = report.uploaded.len(),
        config = %report.config_path.display(),
        bootstrapped = report.bootstrapped,
        "bootstrap workflow finished"
    );
    Ok(report)
}
