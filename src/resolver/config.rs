use std::time::Duration;

use super::error::ResolverConfigError;
use crate::constants::{DEFAULT_DEDUP_RADIUS_M, DEFAULT_FALLBACK_TIMEOUT_SECS};

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Upper bound on waiting for the generative fallback.
    pub fallback_timeout: Duration,
    /// Coalesce concurrent fallbacks for identical requests.
    pub single_flight: bool,
    pub dedup_radius_m: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fallback_timeout: Duration::from_secs(DEFAULT_FALLBACK_TIMEOUT_SECS),
            single_flight: true,
            dedup_radius_m: DEFAULT_DEDUP_RADIUS_M,
        }
    }
}

impl ResolverConfig {
    pub fn fallback_timeout(mut self, timeout: Duration) -> Self {
        self.fallback_timeout = timeout;
        self
    }

    pub fn single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    pub fn dedup_radius_m(mut self, radius_m: f64) -> Self {
        self.dedup_radius_m = radius_m;
        self
    }

    pub fn validate(&self) -> Result<(), ResolverConfigError> {
        if self.fallback_timeout.is_zero() {
            return Err(ResolverConfigError::Invalid {
                reason: "fallback_timeout must be > 0".to_string(),
            });
        }
        if !self.dedup_radius_m.is_finite() || self.dedup_radius_m < 0.0 {
            return Err(ResolverConfigError::Invalid {
                reason: format!("dedup_radius_m must be >= 0, got {}", self.dedup_radius_m),
            });
        }
        Ok(())
    }
}
