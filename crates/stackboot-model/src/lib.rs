//! Data model shared by every stackboot crate.
//!
//! Describes the desired cloud state (images per series, the metadata container)
//! and the resolved state observed from the cloud.

mod domain;
pub use domain::*;

mod config;
pub use config::{BootstrapConfig, CloudConfig};

mod error;
pub use error::ModelError;
