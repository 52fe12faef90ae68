//! Request validation, applied before any cache or upstream I/O.

use thiserror::Error;

use crate::constants::MAX_RADIUS_KM;
use crate::geo::CoordinateError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(#[from] CoordinateError),

    #[error("radius must be within (0, {max}] km, got {radius_km}")]
    InvalidRadius { radius_km: f64, max: f64 },

    #[error("semantic weight must be within [0, 1], got {weight}")]
    SemanticWeightOutOfRange { weight: f64 },

    #[error("query text must not be empty")]
    EmptyQuery,

    #[error("point of interest name must not be empty")]
    EmptyName,

    #[error("result limit must be greater than zero")]
    ZeroLimit,
}

pub fn validate_radius_km(radius_km: f64) -> Result<f64, ValidationError> {
    if !radius_km.is_finite() || radius_km <= 0.0 || radius_km > MAX_RADIUS_KM {
        return Err(ValidationError::InvalidRadius {
            radius_km,
            max: MAX_RADIUS_KM,
        });
    }
    Ok(radius_km)
}

/// Out-of-range weights are rejected, never clamped.
pub fn validate_semantic_weight(weight: f64) -> Result<f64, ValidationError> {
    if !(0.0..=1.0).contains(&weight) {
        return Err(ValidationError::SemanticWeightOutOfRange { weight });
    }
    Ok(weight)
}

pub fn validate_query_text(text: &str) -> Result<&str, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyQuery);
    }
    Ok(trimmed)
}
