use std::{path::PathBuf, time::Duration};

use clap::Parser;
use stackboot_core::{PollPolicy, RunOptions};
use stackboot_model::CleanupFlags;
use stackboot_observe::{LoggerConfig, LoggerFormat};

/// Provision images, publish their metadata and bootstrap juju on OpenStack.
#[derive(Parser, Debug, Clone)]
#[command(name = "stackboot", version, about)]
pub struct Args {
    /// YAML file with credentials, container and images.
    #[arg(short = 'c', long, default_value = "config.yml")]
    pub config_file: PathBuf,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,

    /// Log filter directive; overrides --verbose.
    #[arg(long)]
    pub log_level: Option<String>,

    #[arg(long, default_value = "text")]
    pub log_format: LoggerFormat,

    /// Stop after validating the published metadata.
    #[arg(long)]
    pub skip_bootstrap: bool,

    /// Empty and delete the metadata container before re-creating it.
    #[arg(long)]
    pub clean_container: bool,

    /// Delete images whose names match the configured ones.
    #[arg(long)]
    pub clean_images: bool,

    /// Remove the cached juju environment state.
    #[arg(long)]
    pub clean_environment: bool,

    /// All of the --clean-* flags.
    #[arg(long)]
    pub clean_all: bool,

    /// Seconds between image status checks.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: u64,

    /// Give up waiting for images after this many seconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_timeout: Option<u64>,

    /// Give up waiting for images after this many status checks.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub poll_max_attempts: Option<u32>,

    /// juju executable.
    #[arg(long, default_value = "juju")]
    pub juju: String,

    /// juju home directory [default: ~/.juju]
    #[arg(long, env = "JUJU_HOME")]
    pub juju_home: Option<PathBuf>,
}

impl Args {
    pub fn cleanup(&self) -> CleanupFlags {
        CleanupFlags::from_flags(
            self.clean_container,
            self.clean_images,
            self.clean_environment,
            self.clean_all,
        )
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            cleanup: self.cleanup(),
            skip_bootstrap: self.skip_bootstrap,
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        let mut policy = PollPolicy::default().with_interval(Duration::from_secs(self.poll_interval));
        if let Some(secs) = self.poll_timeout {
            policy = policy.with_timeout(Duration::from_secs(secs));
        }
        if let Some(attempts) = self.poll_max_attempts {
            policy = policy.with_max_attempts(attempts);
        }
        policy
    }

    pub fn logger_config(&self) -> LoggerConfig {
        let mut cfg = LoggerConfig::for_verbosity(self.verbose);
        cfg.format = self.log_format;
        if let Some(level) = &self.log_level {
            cfg.level = level.clone();
        }
        cfg
    }

    /// `--juju-home`, `$JUJU_HOME`, then `~/.juju`.
    pub fn juju_home(&self) -> Option<PathBuf> {
        self.juju_home
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".juju")))
    }
}
