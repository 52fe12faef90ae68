use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use super::error::{SpatialError, SpatialResult};
use super::SpatialQueryPort;
use crate::geo::Coordinate;
use crate::poi::{Poi, PoiSource};

/// Linear-scan spatial store.
///
/// Adequate for seed datasets of a few thousand rows; a PostGIS-backed port
/// slots in behind the same trait.
#[derive(Default)]
pub struct InMemorySpatialStore {
    pois: RwLock<Vec<Poi>>,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl InMemorySpatialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from `pois`, dropping rows that fail validation.
    pub fn with_pois(pois: impl IntoIterator<Item = Poi>) -> Self {
        let store = Self::new();
        store.insert_many(pois);
        store
    }

    /// Loads a JSON array of POIs. Invalid rows are skipped with a warning.
    pub async fn load_seed_file(path: &Path) -> SpatialResult<Self> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| SpatialError::SeedLoadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let pois: Vec<Poi> =
            serde_json::from_slice(&raw).map_err(|e| SpatialError::SeedLoadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let total = pois.len();
        let store = Self::new();
        let accepted = store.insert_many(pois);
        info!(path = %path.display(), total, accepted, "Spatial seed loaded");
        Ok(store)
    }

    /// Returns how many rows were accepted.
    pub fn insert_many(&self, pois: impl IntoIterator<Item = Poi>) -> usize {
        let mut guard = self.pois.write();
        let before = guard.len();
        for mut poi in pois {
            if let Err(e) = poi.validate() {
                warn!(name = %poi.name, error = %e, "Skipping invalid spatial row");
                continue;
            }
            poi.source = PoiSource::SpatialStore;
            poi.rank_score = None;
            guard.push(poi);
        }
        guard.len() - before
    }

    pub fn insert(&self, poi: Poi) -> bool {
        self.insert_many(std::iter::once(poi)) == 1
    }

    pub fn len(&self) -> usize {
        self.pois.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pois.read().is_empty()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[cfg(any(test, feature = "mock"))]
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SpatialQueryPort for InMemorySpatialStore {
    #[instrument(skip(self), fields(lat = center.latitude, lon = center.longitude))]
    async fn find_near(
        &self,
        center: Coordinate,
        radius_m: f64,
        category: Option<&str>,
    ) -> SpatialResult<Vec<Poi>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SpatialError::Unavailable {
                reason: "spatial store offline".to_string(),
            });
        }
        if !radius_m.is_finite() || radius_m < 0.0 {
            return Err(SpatialError::QueryFailed {
                reason: format!("invalid radius {radius_m}"),
            });
        }

        let category = category.map(str::trim).filter(|c| !c.is_empty());
        let mut hits: Vec<(f64, Poi)> = self
            .pois
            .read()
            .iter()
            .filter(|p| category.is_none_or(|c| p.category.eq_ignore_ascii_case(c)))
            .filter_map(|p| {
                let d = center.distance_m(&p.coordinate);
                (d <= radius_m).then(|| (d, p.clone()))
            })
            .collect();

        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        debug!(matched = hits.len(), radius_m, "Spatial scan complete");

        Ok(hits
            .into_iter()
            .map(|(d, mut poi)| {
                poi.rank_score = Some(d / 1000.0);
                poi
            })
            .collect())
    }

    async fn is_ready(&self) -> bool {
        !self.fail.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for InMemorySpatialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySpatialStore")
            .field("pois", &self.len())
            .finish()
    }
}
