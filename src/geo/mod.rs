//! Geographic primitives: validated coordinates and great-circle distance.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius (IUGG), kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Decimal places kept when deriving a geo cell (~1.1 km at the equator).
const GEO_CELL_DECIMALS: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("coordinate components must be finite")]
    NotFinite,
}

/// A WGS84 point. Construct with [`Coordinate::new`] to enforce range invariants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        let coordinate = Self {
            latitude,
            longitude,
        };
        coordinate.check()?;
        Ok(coordinate)
    }

    /// Validates the range invariants of an already-constructed value
    /// (e.g. one that came through deserialization).
    pub fn check(&self) -> Result<(), CoordinateError> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(CoordinateError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }

    #[inline]
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine_km(self, other)
    }

    #[inline]
    pub fn distance_m(&self, other: &Coordinate) -> f64 {
        haversine_km(self, other) * 1000.0
    }

    /// Coarse cell label used as the scope of coordinate requests that carry no city id.
    pub fn geo_cell(&self) -> String {
        let factor = 10f64.powi(GEO_CELL_DECIMALS);
        let lat = (self.latitude * factor).round() / factor;
        let lon = (self.longitude * factor).round() / factor;
        format!("cell:{:.2},{:.2}", lat, lon)
    }

    /// Fixed-point representation (1e-5 degrees, ~1 m) used when hashing cache keys.
    pub fn quantized(&self) -> (i64, i64) {
        (
            (self.latitude * 1e5).round() as i64,
            (self.longitude * 1e5).round() as i64,
        )
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Great-circle distance in kilometers.
pub fn haversine_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}
