use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrganizerError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("source unavailable at '{path}': {message}")]
    SourceUnavailable { path: PathBuf, message: String },

    #[error("inference backend failed: {0}")]
    Inference(String),

    #[error("inference backend returned nothing usable")]
    EmptyResponse,

    #[error("inference backend returned an empty ordering")]
    EmptyOrdering,

    #[error("inference response does not match the expected shape: {0}")]
    MalformedResponse(String),

    #[error("publication metadata does not match the expected shape: {0}")]
    MalformedMetadata(String),

    #[error("destination write failed at '{path}': {message}")]
    DestinationWrite { path: PathBuf, message: String },

    #[error("run was cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for OrganizerError {
    fn from(err: anyhow::Error) -> Self {
        OrganizerError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OrganizerError>;
