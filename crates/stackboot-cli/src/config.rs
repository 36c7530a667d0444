use std::path::{Path, PathBuf};

use stackboot_model::{BootstrapConfig, ModelError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{}: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: ModelError,
    },
}

/// Read, parse and validate the bootstrap configuration.
pub fn load_config(path: &Path) -> Result<BootstrapConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: BootstrapConfig = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate().map_err(|source| ConfigError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("config.yml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_control_bucket_variant() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            r#"
auth-url: https://keystone.example:5000/v2.0
tenant-name: demo
username: admin
password: secret
control-bucket: bucket
series:
  trusty:
    name: trusty-image
    url: http://example/trusty.img
"#,
        );

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.container_name, "bucket");
        assert_eq!(cfg.series.get("trusty").unwrap().disk_format, "qcow2");
    }

    #[test]
    fn missing_file_names_path() {
        let err = load_config(Path::new("/nonexistent/stackboot.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/stackboot.yml"));
    }

    #[test]
    fn empty_series_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            r#"
auth-url: https://keystone.example:5000/v2.0
tenant-name: demo
username: admin
password: secret
container-name: bucket
series: {}
"#,
        );
        assert!(matches!(
            load_config(&path).unwrap_err(),
            ConfigError::Invalid { source: ModelError::EmptySeries, .. }
        ));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "series: [unterminated");
        assert!(matches!(load_config(&path).unwrap_err(), ConfigError::Parse { .. }));
    }
}
