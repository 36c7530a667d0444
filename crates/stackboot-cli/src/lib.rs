//! Command line front end of the bootstrap workflow.

mod args;
pub use args::Args;

mod config;
pub use config::{ConfigError, load_config};

mod app;
pub use app::run;
