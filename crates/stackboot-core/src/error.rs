use std::path::PathBuf;

use stackboot_model::{ImageStatus, ModelError, Series};
use thiserror::Error;

/// Failure reported by a cloud service client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CloudError {
    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("authentication failed: {0}")]
    Auth(String),
}

impl CloudError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        CloudError::NotFound {
            resource: resource.into(),
        }
    }

    /// Absence of the addressed resource; cleanup treats it as success.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound { .. })
    }
}

/// External command failure; the exit status is the only signal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{tool} failed: {reason}")]
pub struct ToolError {
    pub tool: String,
    pub reason: String,
}

impl ToolError {
    pub fn new(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ModelError),

    #[error("image catalog request failed: {0}")]
    Catalog(#[source] CloudError),

    #[error("provisioning image for series '{series}' failed: {source}")]
    Provision {
        series: Series,
        #[source]
        source: CloudError,
    },

    #[error("image '{name}' for series '{series}' reached terminal status '{status}'")]
    ImageFailed {
        series: Series,
        name: String,
        status: ImageStatus,
    },

    #[error("timed out waiting for images to become active: {}", .pending.join(", "))]
    PollTimeout { pending: Vec<Series> },

    #[error("images still not active after {attempts} status checks: {}", .pending.join(", "))]
    PollExhausted { attempts: u32, pending: Vec<Series> },

    #[error("cancelled")]
    Cancelled,

    #[error("image for series '{series}' is not active (status '{status}')")]
    ImageNotActive { series: Series, status: ImageStatus },

    #[error("preparing container '{name}' failed: {source}")]
    Container {
        name: String,
        #[source]
        source: CloudError,
    },

    #[error("generating metadata for series '{series}' failed: {source}")]
    Generate {
        series: Series,
        #[source]
        source: ToolError,
    },

    #[error("uploading object '{object}' failed: {source}")]
    Upload {
        object: String,
        #[source]
        source: CloudError,
    },

    #[error("metadata workspace error: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("environment config '{}' failed: {source}", .path.display())]
    Environment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serializing environment config failed: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("image metadata validation failed: {0}")]
    Validate(#[source] ToolError),

    #[error("bootstrap failed: {0}")]
    Bootstrap(#[source] ToolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinguished() {
        assert!(CloudError::not_found("container bucket").is_not_found());
        assert!(
            !CloudError::Rejected {
                status: 403,
                message: "forbidden".into()
            }
            .is_not_found()
        );
        assert!(!CloudError::Transport("reset".into()).is_not_found());
    }

    #[test]
    fn messages_name_the_failing_series() {
        let err = CoreError::Provision {
            series: "trusty".into(),
            source: CloudError::Rejected {
                status: 413,
                message: "quota exceeded".into(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("trusty"));
        assert!(msg.contains("quota exceeded"));

        let err = CoreError::PollTimeout {
            pending: vec!["precise".into(), "trusty".into()],
        };
        assert!(err.to_string().ends_with("precise, trusty"));
    }
}
