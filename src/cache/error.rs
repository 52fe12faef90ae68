use thiserror::Error;

/// Cache construction errors.
///
/// Lookups never fail: a broken or inconsistent entry is reported as a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

pub type CacheResult<T> = Result<T, CacheError>;
