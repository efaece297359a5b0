//! Pipeline error types.

use scout_data::DatasetError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the detection pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("checkpoint not found: {0}")]
    CheckpointNotFound(PathBuf),

    #[error("missing required config: {0}")]
    MissingConfig(&'static str),

    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
