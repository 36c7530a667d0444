use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("series '{series}': {reason}")]
    InvalidImage { series: String, reason: String },
    #[error("image name '{name}' is used by both '{first}' and '{second}'")]
    DuplicateImageName {
        name: String,
        first: String,
        second: String,
    },
    #[error("no series configured")]
    EmptySeries,
}
