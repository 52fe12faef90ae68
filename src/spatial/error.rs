use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("spatial query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("spatial store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("failed to load seed file {path}: {reason}")]
    SeedLoadFailed { path: PathBuf, reason: String },
}

pub type SpatialResult<T> = Result<T, SpatialError>;
