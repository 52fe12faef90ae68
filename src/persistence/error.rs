use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("refusing to persist invalid record: {reason}")]
    InvalidRecord { reason: String },

    #[error("persistence backend unavailable: {reason}")]
    Unavailable { reason: String },
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
