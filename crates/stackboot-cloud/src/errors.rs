use stackboot_core::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenStackError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{resource}: service answered {status}: {body}")]
    Status {
        resource: String,
        status: u16,
        body: String,
    },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("no '{service}' endpoint{}", region_suffix(.region))]
    MissingEndpoint {
        service: String,
        region: Option<String>,
    },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

fn region_suffix(region: &Option<String>) -> String {
    match region {
        Some(r) => format!(" in region '{r}'"),
        None => String::new(),
    }
}

impl From<OpenStackError> for CloudError {
    fn from(e: OpenStackError) -> Self {
        match e {
            OpenStackError::Status {
                resource,
                status: 404,
                ..
            } => CloudError::NotFound { resource },
            OpenStackError::Status {
                status: 401, body, ..
            } => CloudError::Auth(body),
            OpenStackError::Status { status, body, .. } => CloudError::Rejected {
                status,
                message: body,
            },
            OpenStackError::Http(e) => CloudError::Transport(e.to_string()),
            OpenStackError::Auth(msg) => CloudError::Auth(msg),
            e @ OpenStackError::MissingEndpoint { .. } => CloudError::InvalidResponse(e.to_string()),
            OpenStackError::InvalidResponse(msg) => CloudError::InvalidResponse(msg),
        }
    }
}
