use serde::{Deserialize, Serialize};

use crate::cache::ResolutionSource;
use crate::generation::InteractionId;
use crate::poi::Poi;

const DEFAULT_SEMANTIC_LIMIT: usize = 10;

fn default_limit() -> usize {
    DEFAULT_SEMANTIC_LIMIT
}

/// POIs within a radius of a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationQuery {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    pub longitude: f64,
    pub radius_km: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl LocationQuery {
    pub fn new(latitude: f64, longitude: f64, radius_km: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius_km,
            category: None,
            user_id: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Free-text search, optionally scoped to a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticQuery {
    pub text: String,
    #[serde(default, alias = "city")]
    pub city_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl SemanticQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            city_id: None,
            limit: DEFAULT_SEMANTIC_LIMIT,
            user_id: None,
        }
    }

    pub fn in_city(mut self, city_id: impl Into<String>) -> Self {
        self.city_id = Some(city_id.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Location plus text, blended by `semantic_weight`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridQuery {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    pub longitude: f64,
    pub radius_km: f64,
    pub text: String,
    pub semantic_weight: f64,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl HybridQuery {
    pub fn new(
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        text: impl Into<String>,
        semantic_weight: f64,
    ) -> Self {
        Self {
            latitude,
            longitude,
            radius_km,
            text: text.into(),
            semantic_weight,
            user_id: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Ranked POIs plus the layer that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub source: ResolutionSource,
    pub pois: Vec<Poi>,
    /// Similarity of the matched entry on a semantic cache hit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    /// Set when this call ran the generative fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_id: Option<InteractionId>,
}

impl Resolution {
    pub(crate) fn new(source: ResolutionSource, pois: Vec<Poi>) -> Self {
        Self {
            source,
            pois,
            similarity: None,
            interaction_id: None,
        }
    }

    pub(crate) fn truncated(mut self, limit: usize) -> Self {
        self.pois.truncate(limit);
        self
    }
}

/// Pipeline stages, emitted on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStage {
    CacheLookup,
    EmbeddingResolve,
    SemanticLookup,
    SpatialQuery,
    GenerativeFallback,
    EnrichPersist,
    Respond,
}

impl ResolutionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStage::CacheLookup => "cache_lookup",
            ResolutionStage::EmbeddingResolve => "embedding_resolve",
            ResolutionStage::SemanticLookup => "semantic_lookup",
            ResolutionStage::SpatialQuery => "spatial_query",
            ResolutionStage::GenerativeFallback => "generative_fallback",
            ResolutionStage::EnrichPersist => "enrich_persist",
            ResolutionStage::Respond => "respond",
        }
    }
}

impl std::fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
