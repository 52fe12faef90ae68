use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::config::ResolverConfig;
use super::error::{ResolveError, ResolverConfigError};
use super::flight::FlightGroup;
use super::request::{HybridQuery, LocationQuery, Resolution, ResolutionStage, SemanticQuery};
use crate::cache::{CacheScope, CacheService, ResolutionSource, VectorCacheEntry};
use crate::embedding::EmbeddingService;
use crate::generation::{FallbackSubject, GenerationInteraction, GenerativeFallbackWorker};
use crate::geo::Coordinate;
use crate::hashing::{CacheKey, cache_key, normalize_query};
use crate::persistence::{PersistenceJob, PersistenceQueue};
use crate::poi::{Enricher, Poi};
use crate::scoring::HybridScorer;
use crate::scoring::scorer::sort_by_distance;
use crate::spatial::SpatialQueryPort;
use crate::validation::{ValidationError, validate_query_text, validate_radius_km};

const KIND_LOCATION: &str = "location";
const KIND_SEMANTIC: &str = "semantic";
const KIND_HYBRID: &str = "hybrid";

/// What gets cached alongside a freshly computed result set.
struct CacheTarget {
    key: CacheKey,
    query_text: String,
    embedding: Option<Vec<f32>>,
    scope: CacheScope,
}

/// Orchestrates exact cache → semantic cache → spatial store → generative
/// fallback for the three resolve operations.
///
/// Validation runs before any I/O. The vector cache is written only after a
/// result is known, so a failed fallback never leaves an entry behind.
pub struct Resolver {
    caches: Arc<CacheService>,
    spatial: Arc<dyn SpatialQueryPort>,
    embedder: Arc<dyn EmbeddingService>,
    worker: GenerativeFallbackWorker,
    persistence: Arc<PersistenceQueue>,
    enricher: Enricher,
    flights: FlightGroup,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(
        caches: Arc<CacheService>,
        spatial: Arc<dyn SpatialQueryPort>,
        embedder: Arc<dyn EmbeddingService>,
        worker: GenerativeFallbackWorker,
        persistence: Arc<PersistenceQueue>,
        config: ResolverConfig,
    ) -> Result<Self, ResolverConfigError> {
        config.validate()?;
        Ok(Self {
            caches,
            spatial,
            embedder,
            worker,
            persistence,
            enricher: Enricher::new(config.dedup_radius_m),
            flights: FlightGroup::new(),
            config,
        })
    }

    pub fn caches(&self) -> &Arc<CacheService> {
        &self.caches
    }

    pub fn persistence(&self) -> &Arc<PersistenceQueue> {
        &self.persistence
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub async fn is_ready(&self) -> bool {
        self.spatial.is_ready().await
    }

    #[instrument(skip(self, query), fields(lat = query.latitude, lon = query.longitude, radius_km = query.radius_km))]
    pub async fn resolve_by_location(
        &self,
        query: &LocationQuery,
    ) -> Result<Resolution, ResolveError> {
        let center = Coordinate::new(query.latitude, query.longitude)
            .map_err(ValidationError::from)?;
        let radius_km = validate_radius_km(query.radius_km)?;
        let category = query
            .category
            .as_deref()
            .map(normalize_query)
            .filter(|c| !c.is_empty());

        let scope = CacheScope::for_location(&center, radius_km, category.as_deref());
        let key = cache_key(KIND_LOCATION, None, Some(&center), &scope);

        if let Some(hit) = self.exact_lookup(&key) {
            return Ok(hit);
        }

        let pois = self
            .spatial_lookup(center, radius_km, category.as_deref())
            .await?;
        let target = CacheTarget {
            key,
            query_text: String::new(),
            embedding: None,
            scope,
        };
        if !pois.is_empty() {
            let ranked = sort_by_distance(&center, pois);
            return Ok(self.respond_from_database(target, ranked));
        }

        let subject = FallbackSubject::Area {
            center,
            radius_km,
            category,
        };
        self.resolve_with_fallback(target, subject, query.user_id.as_deref(), |pois| {
            sort_by_distance(&center, pois)
        })
        .await
    }

    #[instrument(skip(self, query), fields(limit = query.limit, city = ?query.city_id))]
    pub async fn resolve_by_semantic_query(
        &self,
        query: &SemanticQuery,
    ) -> Result<Resolution, ResolveError> {
        let text = normalize_query(validate_query_text(&query.text)?);
        if query.limit == 0 {
            return Err(ValidationError::ZeroLimit.into());
        }
        let limit = query.limit;

        let scope = CacheScope::for_semantic(query.city_id.as_deref());
        let key = cache_key(KIND_SEMANTIC, Some(&text), None, &scope);

        if let Some(hit) = self.exact_lookup(&key) {
            return Ok(hit.truncated(limit));
        }

        let embedding = self.resolve_embedding(&text).await?;
        if let Some(hit) = self.semantic_lookup(&embedding, &scope) {
            return Ok(hit.truncated(limit));
        }

        // Text-only requests have no coordinate to give the spatial store.
        let subject = FallbackSubject::Query {
            text: text.clone(),
            city_id: scope.city_id.clone(),
        };
        let target = CacheTarget {
            key,
            query_text: text,
            embedding: Some(embedding),
            scope,
        };
        let resolution = self
            .resolve_with_fallback(target, subject, query.user_id.as_deref(), |pois| pois)
            .await?;
        Ok(resolution.truncated(limit))
    }

    #[instrument(skip(self, query), fields(lat = query.latitude, lon = query.longitude, weight = query.semantic_weight))]
    pub async fn resolve_hybrid(&self, query: &HybridQuery) -> Result<Resolution, ResolveError> {
        let scorer = HybridScorer::new(query.semantic_weight)?;
        let center = Coordinate::new(query.latitude, query.longitude)
            .map_err(ValidationError::from)?;
        let radius_km = validate_radius_km(query.radius_km)?;
        let text = normalize_query(validate_query_text(&query.text)?);

        let scope = CacheScope::for_hybrid(&center, radius_km, scorer.semantic_weight());
        let key = cache_key(KIND_HYBRID, Some(&text), Some(&center), &scope);

        if let Some(hit) = self.exact_lookup(&key) {
            return Ok(hit);
        }

        let embedding = self.resolve_embedding(&text).await?;
        if let Some(mut hit) = self.semantic_lookup(&embedding, &scope) {
            // The hit was ranked for another center in the same cell.
            let in_radius: Vec<Poi> = std::mem::take(&mut hit.pois)
                .into_iter()
                .filter(|p| center.distance_km(&p.coordinate) <= radius_km)
                .collect();
            if !in_radius.is_empty() {
                hit.pois = scorer.rank(&center, Some(&embedding), in_radius);
                return Ok(hit);
            }
            debug!("Semantic hit has nothing within radius of this center");
        }

        let pois = self.spatial_lookup(center, radius_km, None).await?;
        let target = CacheTarget {
            key,
            query_text: text.clone(),
            embedding: Some(embedding.clone()),
            scope,
        };
        if !pois.is_empty() {
            let ranked = scorer.rank(&center, Some(&embedding), pois);
            return Ok(self.respond_from_database(target, ranked));
        }

        let subject = FallbackSubject::Hybrid {
            center,
            radius_km,
            text,
        };
        self.resolve_with_fallback(target, subject, query.user_id.as_deref(), |pois| {
            scorer.rank(&center, Some(&embedding), pois)
        })
        .await
    }

    fn exact_lookup(&self, key: &CacheKey) -> Option<Resolution> {
        trace_stage(ResolutionStage::CacheLookup);
        let entry = self.caches.vector().get(key)?;
        debug!(key = %key, origin = %entry.origin, "Exact cache hit");
        trace_stage(ResolutionStage::Respond);
        Some(Resolution::new(
            ResolutionSource::ExactCacheHit,
            entry.results.clone(),
        ))
    }

    fn semantic_lookup(&self, embedding: &[f32], scope: &CacheScope) -> Option<Resolution> {
        trace_stage(ResolutionStage::SemanticLookup);
        let hit = self.caches.vector().get_similar(embedding, scope)?;
        debug!(
            similarity = hit.similarity,
            matched = %hit.entry.query_text,
            "Semantic cache hit"
        );
        trace_stage(ResolutionStage::Respond);
        let mut resolution = Resolution::new(
            ResolutionSource::SemanticCacheHit,
            hit.entry.results.clone(),
        );
        resolution.similarity = Some(hit.similarity);
        Some(resolution)
    }

    /// Embedding-cache hit, else the embedding service (and populate the cache).
    async fn resolve_embedding(&self, text: &str) -> Result<Vec<f32>, ResolveError> {
        trace_stage(ResolutionStage::EmbeddingResolve);
        if let Some(cached) = self.caches.embeddings().get(text) {
            debug!(label = %cached.label, "Embedding cache hit");
            return Ok(cached.vector.clone());
        }

        let vector = self.embedder.embed(text).await?;
        self.caches
            .embeddings()
            .set(text, vector.clone(), self.embedder.model_name());
        Ok(vector)
    }

    async fn spatial_lookup(
        &self,
        center: Coordinate,
        radius_km: f64,
        category: Option<&str>,
    ) -> Result<Vec<Poi>, ResolveError> {
        trace_stage(ResolutionStage::SpatialQuery);
        let pois = self
            .spatial
            .find_near(center, radius_km * 1000.0, category)
            .await
            .inspect_err(|e| warn!(error = %e, "Spatial query failed"))?;

        let total = pois.len();
        let valid: Vec<Poi> = pois
            .into_iter()
            .filter(|p| p.coordinate.is_valid())
            .collect();
        if valid.len() != total {
            warn!(
                dropped = total - valid.len(),
                "Spatial store returned out-of-range coordinates"
            );
        }
        Ok(valid)
    }

    fn respond_from_database(&self, target: CacheTarget, ranked: Vec<Poi>) -> Resolution {
        debug!(count = ranked.len(), "Spatial store hit");
        self.store(target, ranked.clone(), ResolutionSource::Database);
        trace_stage(ResolutionStage::Respond);
        Resolution::new(ResolutionSource::Database, ranked)
    }

    fn store(&self, target: CacheTarget, pois: Vec<Poi>, origin: ResolutionSource) {
        self.caches.vector().set(
            target.key,
            VectorCacheEntry::new(target.query_text, target.embedding, pois, target.scope, origin),
        );
    }

    /// Full miss: run the fallback, enrich, persist in the background, cache.
    ///
    /// With single-flight on, concurrent identical misses queue on the key and
    /// re-check the exact cache once they get their turn.
    async fn resolve_with_fallback<F>(
        &self,
        target: CacheTarget,
        subject: FallbackSubject,
        user_id: Option<&str>,
        rank: F,
    ) -> Result<Resolution, ResolveError>
    where
        F: FnOnce(Vec<Poi>) -> Vec<Poi>,
    {
        let _flight = if self.config.single_flight {
            let guard = self.flights.acquire(target.key).await;
            if let Some(entry) = self.caches.vector().get(&target.key) {
                debug!(key = %target.key, "Coalesced with concurrent fallback");
                return Ok(Resolution::new(
                    ResolutionSource::ExactCacheHit,
                    entry.results.clone(),
                ));
            }
            Some(guard)
        } else {
            None
        };

        trace_stage(ResolutionStage::GenerativeFallback);
        let handle = self.worker.spawn(subject);
        let outcome = match handle.wait(self.config.fallback_timeout).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let err = ResolveError::from(&e);
                self.persist(user_id, e.into_interaction(), Vec::new());
                return Err(err);
            }
        };

        let interaction = outcome.interaction;
        let candidates = match outcome.result {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, interaction_id = %interaction.id(), "Fallback failed");
                self.persist(user_id, interaction, Vec::new());
                return Err(e.into());
            }
        };

        trace_stage(ResolutionStage::EnrichPersist);
        let report = self.enricher.enrich(candidates);
        debug!(
            kept = report.pois.len(),
            rejected = report.rejected,
            merged = report.merged,
            repaired = report.repaired,
            "Enriched fallback candidates"
        );

        let interaction_id = interaction.id();
        let pois = rank(report.pois);
        self.persist(user_id, interaction, pois.clone());
        self.store(target, pois.clone(), ResolutionSource::Generated);

        info!(%interaction_id, count = pois.len(), "Resolved via generative fallback");
        trace_stage(ResolutionStage::Respond);
        Ok(Resolution {
            source: ResolutionSource::Generated,
            pois,
            similarity: None,
            interaction_id: Some(interaction_id),
        })
    }

    fn persist(
        &self,
        user_id: Option<&str>,
        interaction: GenerationInteraction,
        pois: Vec<Poi>,
    ) {
        self.persistence.enqueue(PersistenceJob {
            user_id: user_id.map(str::to_string),
            interaction,
            pois,
        });
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("caches", &self.caches)
            .field("worker", &self.worker)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[inline]
fn trace_stage(stage: ResolutionStage) {
    debug!(stage = stage.as_str(), "Resolution stage");
}
