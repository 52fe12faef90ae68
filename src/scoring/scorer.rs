use serde::Serialize;
use tracing::debug;

use crate::embedding::cosine_similarity;
use crate::geo::Coordinate;
use crate::poi::Poi;
use crate::validation::{ValidationError, validate_semantic_weight};

/// Bounded in (0, 1], strictly decreasing in distance.
#[inline]
pub fn proximity_score(distance_km: f64) -> f64 {
    1.0 / (1.0 + distance_km.max(0.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub distance_km: f64,
    pub proximity: f64,
    /// `None` when the POI has no embedding or dimensions differ.
    pub similarity: Option<f32>,
    pub hybrid: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridScorer {
    semantic_weight: f64,
}

impl HybridScorer {
    pub fn new(semantic_weight: f64) -> Result<Self, ValidationError> {
        Ok(Self {
            semantic_weight: validate_semantic_weight(semantic_weight)?,
        })
    }

    #[inline]
    pub fn semantic_weight(&self) -> f64 {
        self.semantic_weight
    }

    pub fn score(&self, distance_km: f64, similarity: Option<f32>) -> f64 {
        let w = self.semantic_weight;
        let proximity = (1.0 - w) * proximity_score(distance_km);
        match similarity {
            Some(s) => proximity + w * f64::from(s),
            None => proximity,
        }
    }

    pub fn breakdown(
        &self,
        center: &Coordinate,
        query_embedding: Option<&[f32]>,
        poi: &Poi,
    ) -> ScoreBreakdown {
        let distance_km = center.distance_km(&poi.coordinate);
        let similarity = match (query_embedding, poi.embedding.as_deref()) {
            (Some(q), Some(p)) => cosine_similarity(q, p),
            _ => None,
        };
        ScoreBreakdown {
            distance_km,
            proximity: proximity_score(distance_km),
            similarity,
            hybrid: self.score(distance_km, similarity),
        }
    }

    /// Sorts by hybrid score descending and writes it to `rank_score`.
    ///
    /// Equal scores fall back to distance, then name, so output is stable.
    pub fn rank(
        &self,
        center: &Coordinate,
        query_embedding: Option<&[f32]>,
        pois: Vec<Poi>,
    ) -> Vec<Poi> {
        let mut scored: Vec<(ScoreBreakdown, Poi)> = pois
            .into_iter()
            .map(|poi| (self.breakdown(center, query_embedding, &poi), poi))
            .collect();

        scored.sort_by(|(a, pa), (b, pb)| {
            b.hybrid
                .total_cmp(&a.hybrid)
                .then_with(|| a.distance_km.total_cmp(&b.distance_km))
                .then_with(|| pa.name.cmp(&pb.name))
        });

        debug!(
            weight = self.semantic_weight,
            count = scored.len(),
            with_similarity = scored.iter().filter(|(s, _)| s.similarity.is_some()).count(),
            "Hybrid ranking complete"
        );

        scored
            .into_iter()
            .map(|(score, mut poi)| {
                poi.rank_score = Some(score.hybrid);
                poi
            })
            .collect()
    }
}

/// Ascending distance from `center`; `rank_score` becomes the distance in km.
///
/// Equal distances break on name, as in [`HybridScorer::rank`].
pub(crate) fn sort_by_distance(center: &Coordinate, pois: Vec<Poi>) -> Vec<Poi> {
    let mut with_distance: Vec<(f64, Poi)> = pois
        .into_iter()
        .map(|p| (center.distance_km(&p.coordinate), p))
        .collect();
    with_distance.sort_by(|(da, pa), (db, pb)| da.total_cmp(db).then_with(|| pa.name.cmp(&pb.name)));
    with_distance
        .into_iter()
        .map(|(d, mut p)| {
            p.rank_score = Some(d);
            p
        })
        .collect()
}
