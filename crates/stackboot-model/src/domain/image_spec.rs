use serde::{Deserialize, Serialize};

use crate::ModelError;

pub const DEFAULT_DISK_FORMAT: &str = "qcow2";
pub const DEFAULT_CONTAINER_FORMAT: &str = "bare";
pub const DEFAULT_MIN_DISK_GB: u32 = 8;
pub const DEFAULT_MIN_RAM_MB: u32 = 256;

/// Desired image as declared in configuration.
///
/// `name` is the identity used to detect an existing image in the catalog;
/// the cloud copies the image bytes from `source_url` out of band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ImageSpec {
    pub name: String,
    #[serde(alias = "url")]
    pub source_url: String,
    #[serde(default = "default_disk_format")]
    pub disk_format: String,
    #[serde(default = "default_container_format")]
    pub container_format: String,
    #[serde(default = "default_min_disk", alias = "min-disk-gb")]
    pub min_disk: u32,
    #[serde(default = "default_min_ram", alias = "min-ram-mb")]
    pub min_ram: u32,
}

impl ImageSpec {
    /// Spec with every optional field at its default.
    pub fn new(name: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_url: source_url.into(),
            disk_format: default_disk_format(),
            container_format: default_container_format(),
            min_disk: DEFAULT_MIN_DISK_GB,
            min_ram: DEFAULT_MIN_RAM_MB,
        }
    }

    pub fn validate(&self, series: &str) -> Result<(), ModelError> {
        let invalid = |reason: &str| ModelError::InvalidImage {
            series: series.to_string(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("image name is empty"));
        }
        if self.source_url.trim().is_empty() {
            return Err(invalid("image url is empty"));
        }
        if self.disk_format.trim().is_empty() {
            return Err(invalid("disk format is empty"));
        }
        if self.container_format.trim().is_empty() {
            return Err(invalid("container format is empty"));
        }
        Ok(())
    }
}

fn default_disk_format() -> String {
    DEFAULT_DISK_FORMAT.to_string()
}

fn default_container_format() -> String {
    DEFAULT_CONTAINER_FORMAT.to_string()
}

fn default_min_disk() -> u32 {
    DEFAULT_MIN_DISK_GB
}

fn default_min_ram() -> u32 {
    DEFAULT_MIN_RAM_MB
}
