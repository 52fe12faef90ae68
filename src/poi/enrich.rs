//! Turns generated candidates into [`Poi`] records.
//!
//! Each candidate gets a fresh id and `source = generated`. Its coordinate is
//! validated and repaired where possible. Candidates that share a normalized
//! name and lie within the dedup radius collapse into the first one seen.

use tracing::debug;
use uuid::Uuid;

use super::candidate::CandidatePoi;
use super::model::{Poi, PoiSource};
use crate::constants::DEFAULT_DEDUP_RADIUS_M;
use crate::geo::Coordinate;
use crate::hashing::normalize_query;

const DEFAULT_CATEGORY: &str = "attraction";

/// Outcome of [`Enricher::enrich`].
#[derive(Debug, Clone, Default)]
pub struct EnrichmentReport {
    pub pois: Vec<Poi>,
    /// Candidates rejected for a missing name or unrepairable coordinate.
    pub rejected: usize,
    /// Candidates merged into an earlier duplicate.
    pub merged: usize,
    /// Candidates whose latitude/longitude were swapped back.
    pub repaired: usize,
}

#[derive(Debug, Clone)]
pub struct Enricher {
    dedup_radius_m: f64,
}

impl Default for Enricher {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_RADIUS_M)
    }
}

impl Enricher {
    pub fn new(dedup_radius_m: f64) -> Self {
        Self { dedup_radius_m }
    }

    pub fn dedup_radius_m(&self) -> f64 {
        self.dedup_radius_m
    }

    pub fn enrich(&self, candidates: Vec<CandidatePoi>) -> EnrichmentReport {
        let mut report = EnrichmentReport::default();

        for candidate in candidates {
            let name = candidate.name.trim().to_string();
            if name.is_empty() {
                report.rejected += 1;
                continue;
            }

            let (coordinate, was_repaired) =
                match repair_coordinate(candidate.latitude, candidate.longitude) {
                    Some(repair) => repair,
                    None => {
                        debug!(name = %name, "Dropping candidate with unusable coordinate");
                        report.rejected += 1;
                        continue;
                    }
                };
            if was_repaired {
                report.repaired += 1;
            }

            let attributes = candidate.attributes();
            let description = candidate
                .description
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string();

            if let Some(existing) = report
                .pois
                .iter_mut()
                .find(|p| self.is_duplicate(p, &name, &coordinate))
            {
                if existing.description.is_empty() {
                    existing.description = description;
                }
                existing.attributes.absorb(attributes);
                report.merged += 1;
                continue;
            }

            let category = candidate
                .category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(DEFAULT_CATEGORY)
                .to_lowercase();

            report.pois.push(Poi {
                id: Uuid::new_v4(),
                name,
                category,
                coordinate,
                description,
                attributes,
                source: PoiSource::Generated,
                rank_score: None,
                embedding: None,
            });
        }

        report
    }

    fn is_duplicate(&self, existing: &Poi, name: &str, coordinate: &Coordinate) -> bool {
        normalize_query(&existing.name) == normalize_query(name)
            && existing.coordinate.distance_m(coordinate) <= self.dedup_radius_m
    }
}

/// Returns a valid coordinate and whether it had to be repaired.
///
/// Non-finite or missing components are unusable. A latitude outside
/// [-90, 90] whose swap yields a valid point is treated as transposed.
pub fn repair_coordinate(latitude: Option<f64>, longitude: Option<f64>) -> Option<(Coordinate, bool)> {
    let (lat, lon) = (latitude?, longitude?);
    if let Ok(c) = Coordinate::new(lat, lon) {
        return Some((c, false));
    }
    Coordinate::new(lon, lat).ok().map(|c| (c, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, lat: f64, lon: f64) -> CandidatePoi {
        CandidatePoi {
            name: name.to_string(),
            category: Some("Museum".into()),
            latitude: Some(lat),
            longitude: Some(lon),
            description: Some("desc".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_enrich_marks_generated_and_assigns_ids() {
        let report = Enricher::default().enrich(vec![
            candidate("Louvre", 48.8606, 2.3376),
            candidate("Orsay", 48.8600, 2.3266),
        ]);
        assert_eq!(report.pois.len(), 2);
        assert!(report.pois.iter().all(|p| p.source == PoiSource::Generated));
        assert_ne!(report.pois[0].id, report.pois[1].id);
        assert_eq!(report.pois[0].category, "museum");
    }

    #[test]
    fn test_same_name_within_radius_collapses() {
        let mut second = candidate("  louvre ", 48.8610, 2.3378);
        second.description = None;
        second.address = Some("Rue de Rivoli".into());

        let report = Enricher::default().enrich(vec![candidate("Louvre", 48.8606, 2.3376), second]);

        assert_eq!(report.pois.len(), 1);
        assert_eq!(report.merged, 1);
        assert_eq!(
            report.pois[0].attributes.address.as_deref(),
            Some("Rue de Rivoli")
        );
    }

    #[test]
    fn test_same_name_far_apart_kept() {
        let report = Enricher::default().enrich(vec![
            candidate("Starbucks", 48.8606, 2.3376),
            candidate("Starbucks", 48.8700, 2.3376),
        ]);
        assert_eq!(report.pois.len(), 2);
        assert_eq!(report.merged, 0);
    }

    #[test]
    fn test_different_names_close_together_kept() {
        let report = Enricher::default().enrich(vec![
            candidate("Cafe A", 48.8606, 2.3376),
            candidate("Cafe B", 48.8606, 2.3376),
        ]);
        assert_eq!(report.pois.len(), 2);
    }

    #[test]
    fn test_swapped_coordinates_repaired() {
        let report = Enricher::default().enrich(vec![candidate("Tower", 116.39, 39.90)]);
        assert_eq!(report.repaired, 1);
        assert_eq!(report.pois[0].coordinate.latitude, 39.90);
        assert_eq!(report.pois[0].coordinate.longitude, 116.39);
    }

    #[test]
    fn test_unusable_candidates_rejected() {
        let mut missing = candidate("Nowhere", 0.0, 0.0);
        missing.latitude = None;
        let report = Enricher::default().enrich(vec![
            missing,
            candidate("", 10.0, 10.0),
            candidate("Nan", f64::NAN, 1.0),
            candidate("Far", 200.0, 200.0),
        ]);
        assert!(report.pois.is_empty());
        assert_eq!(report.rejected, 4);
    }

    #[test]
    fn test_output_always_in_range() {
        let report = Enricher::default().enrich(vec![
            candidate("A", 95.0, 10.0),
            candidate("B", -45.0, 181.0),
            candidate("C", 12.0, 34.0),
        ]);
        assert!(report.pois.iter().all(|p| p.validate().is_ok()));
    }
}
