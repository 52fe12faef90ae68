use crate::geo::Coordinate;
use crate::hashing::normalize_query;

/// Non-text parameters that qualify a cache entry.
///
/// Two entries are comparable for semantic lookup only when their scopes are
/// equal. Radius and weight are stored quantized so equality is exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CacheScope {
    /// City identifier, or a geo cell label for coordinate requests.
    pub city_id: Option<String>,
    pub category: Option<String>,
    /// Search radius in whole meters.
    pub radius_m: Option<u32>,
    /// Semantic weight in thousandths.
    pub semantic_weight_milli: Option<u16>,
}

impl CacheScope {
    pub fn for_location(center: &Coordinate, radius_km: f64, category: Option<&str>) -> Self {
        Self {
            city_id: Some(center.geo_cell()),
            category: category.map(normalize_query).filter(|c| !c.is_empty()),
            radius_m: Some(quantize_radius(radius_km)),
            semantic_weight_milli: None,
        }
    }

    pub fn for_semantic(city_id: Option<&str>) -> Self {
        Self {
            city_id: city_id.map(normalize_query).filter(|c| !c.is_empty()),
            ..Default::default()
        }
    }

    pub fn for_hybrid(center: &Coordinate, radius_km: f64, semantic_weight: f64) -> Self {
        Self {
            city_id: Some(center.geo_cell()),
            category: None,
            radius_m: Some(quantize_radius(radius_km)),
            semantic_weight_milli: Some(quantize_weight(semantic_weight)),
        }
    }

    #[inline]
    pub fn is_comparable(&self, other: &CacheScope) -> bool {
        self == other
    }
}

fn quantize_radius(radius_km: f64) -> u32 {
    (radius_km * 1000.0).round().clamp(0.0, u32::MAX as f64) as u32
}

fn quantize_weight(weight: f64) -> u16 {
    (weight * 1000.0).round().clamp(0.0, 1000.0) as u16
}
