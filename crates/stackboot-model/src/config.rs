use serde::{Deserialize, Serialize};

use crate::{ContainerTarget, DesiredImageSet, ModelError};

/// Identity service credentials and connection options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CloudConfig {
    pub auth_url: String,
    pub tenant_name: String,
    pub username: String,
    pub password: String,
    /// Selects catalog endpoints; the first endpoint is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub use_floating_ip: bool,
}

/// Top-level bootstrap configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BootstrapConfig {
    #[serde(flatten)]
    pub cloud: CloudConfig,
    #[serde(alias = "control-bucket", alias = "image-metadata-container")]
    pub container_name: String,
    pub series: DesiredImageSet,
}

impl BootstrapConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        let required = [
            ("auth-url", &self.cloud.auth_url),
            ("tenant-name", &self.cloud.tenant_name),
            ("username", &self.cloud.username),
            ("password", &self.cloud.password),
            ("container-name", &self.container_name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ModelError::MissingField(field));
            }
        }
        self.series.validate()
    }

    pub fn container_target(&self) -> ContainerTarget {
        ContainerTarget::public_read(self.container_name.clone())
    }
}
