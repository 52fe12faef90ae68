use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("embedding service returned {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("malformed embedding response: {reason}")]
    MalformedResponse { reason: String },

    #[error("cannot embed empty text")]
    EmptyInput,

    #[error("invalid embedding configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        EmbeddingError::RequestFailed {
            reason: err.to_string(),
        }
    }
}
