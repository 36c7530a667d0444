//! The orchestration tool's environment definition and cached state.

use std::path::{Path, PathBuf};

use serde::Serialize;
use stackboot_model::CloudConfig;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use crate::error::CoreError;

const ENVIRONMENT_NAME: &str = "openstack";
const CONFIG_FILE: &str = "environments.yaml";
const STATE_DIR: &str = "environments";

/// Values the environment definition is rendered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSettings {
    pub cloud: CloudConfig,
    /// Public URL of the published image metadata.
    pub image_metadata_url: String,
    /// Container the tool keeps its own state in.
    pub control_bucket: String,
}

#[derive(Serialize)]
struct EnvironmentsFile<'a> {
    default: &'static str,
    environments: Environments<'a>,
}

#[derive(Serialize)]
struct Environments<'a> {
    openstack: OpenStackEnvironment<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct OpenStackEnvironment<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    use_floating_ip: bool,
    image_metadata_url: &'a str,
    control_bucket: &'a str,
    auth_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<&'a str>,
    tenant_name: &'a str,
    auth_mode: &'static str,
    username: &'a str,
    password: &'a str,
}

impl<'a> From<&'a EnvironmentSettings> for EnvironmentsFile<'a> {
    fn from(s: &'a EnvironmentSettings) -> Self {
        Self {
            default: ENVIRONMENT_NAME,
            environments: Environments {
                openstack: OpenStackEnvironment {
                    kind: "openstack",
                    use_floating_ip: s.cloud.use_floating_ip,
                    image_metadata_url: &s.image_metadata_url,
                    control_bucket: &s.control_bucket,
                    auth_url: &s.cloud.auth_url,
                    region: s.cloud.region.as_deref(),
                    tenant_name: &s.cloud.tenant_name,
                    auth_mode: "userpass",
                    username: &s.cloud.username,
                    password: &s.cloud.password,
                },
            },
        }
    }
}

/// Writes and cleans the environment files under the tool's home directory.
#[derive(Debug, Clone)]
pub struct EnvironmentConfigWriter {
    home: PathBuf,
}

impl EnvironmentConfigWriter {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join(CONFIG_FILE)
    }

    /// Cached state of a previously bootstrapped environment.
    pub fn state_path(&self) -> PathBuf {
        self.home
            .join(STATE_DIR)
            .join(format!("{ENVIRONMENT_NAME}.jenv"))
    }

    /// Remove the cached environment state. Returns whether a file was removed.
    #[instrument(level = "debug", skip_all, fields(home = %self.home.display()))]
    pub async fn clean(&self) -> Result<bool, CoreError> {
        let path = self.state_path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "removed environment state");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no environment state to remove");
                Ok(false)
            }
            Err(source) => Err(CoreError::Environment { path, source }),
        }
    }

    /// Overwrite the environment definition and return its path.
    #[instrument(level = "debug", skip_all, fields(home = %self.home.display()))]
    pub async fn write(&self, settings: &EnvironmentSettings) -> Result<PathBuf, CoreError> {
        tokio::fs::create_dir_all(&self.home)
            .await
            .map_err(|source| CoreError::Environment {
                path: self.home.clone(),
                source,
            })?;

        let body = render(settings)?;
        let path = self.config_path();
        write_private(&path, body.as_bytes())
            .await
            .map_err(|source| CoreError::Environment {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), "environment config written");
        Ok(path)
    }
}

/// YAML document of the environment definition.
pub fn render(settings: &EnvironmentSettings) -> Result<String, CoreError> {
    Ok(serde_yaml::to_string(&EnvironmentsFile::from(settings))?)
}

// The file carries the cloud password.
async fn write_private(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    // An existing file keeps its old mode on open.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await?;
    }
    file.write_all(body).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(region: Option<&str>) -> EnvironmentSettings {
        EnvironmentSettings {
            cloud: CloudConfig {
                auth_url: "https://keystone.example:5000/v2.0".into(),
                tenant_name: "demo".into(),
                username: "admin".into(),
                password: "secret".into(),
                region: region.map(Into::into),
                use_floating_ip: true,
            },
            image_metadata_url: "https://swift.example/v1/AUTH_demo/bucket/images".into(),
            control_bucket: "bucket".into(),
        }
    }

    #[test]
    fn renders_openstack_environment() {
        let yaml = render(&settings(Some("RegionOne"))).unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(doc["default"].as_str(), Some("openstack"));
        let env = &doc["environments"]["openstack"];
        assert_eq!(env["type"].as_str(), Some("openstack"));
        assert_eq!(env["use-floating-ip"].as_bool(), Some(true));
        assert_eq!(
            env["image-metadata-url"].as_str(),
            Some("https://swift.example/v1/AUTH_demo/bucket/images")
        );
        assert_eq!(env["control-bucket"].as_str(), Some("bucket"));
        assert_eq!(env["region"].as_str(), Some("RegionOne"));
        assert_eq!(env["auth-mode"].as_str(), Some("userpass"));
        assert_eq!(env["password"].as_str(), Some("secret"));
    }

    #[test]
    fn omits_unset_region() {
        let yaml = render(&settings(None)).unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert!(doc["environments"]["openstack"].get("region").is_none());
    }

    #[tokio::test]
    async fn write_creates_home_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = EnvironmentConfigWriter::new(tmp.path().join("juju"));

        let path = writer.write(&settings(None)).await.unwrap();
        assert_eq!(path, tmp.path().join("juju/environments.yaml"));

        std::fs::write(&path, "stale: true\n").unwrap();
        writer.write(&settings(None)).await.unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(!body.contains("stale"));
        assert!(body.contains("tenant-name: demo"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn write_tightens_existing_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let writer = EnvironmentConfigWriter::new(tmp.path());
        let path = writer.config_path();
        std::fs::write(&path, "old: true\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        writer.write(&settings(None)).await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!std::fs::read_to_string(&path).unwrap().contains("old"));
    }

    #[tokio::test]
    async fn clean_removes_state_file_once() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = EnvironmentConfigWriter::new(tmp.path());
        let state = writer.state_path();
        std::fs::create_dir_all(state.parent().unwrap()).unwrap();
        std::fs::write(&state, "cached").unwrap();

        assert!(writer.clean().await.unwrap());
        assert!(!state.exists());
        assert!(!writer.clean().await.unwrap());
    }
}
