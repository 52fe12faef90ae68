//! Mocked resolver stacks and canned fallback payloads.

use std::sync::Arc;
use std::time::Duration;

use atlas::cache::CacheService;
use atlas::embedding::MockEmbeddingService;
use atlas::generation::{GenerativeFallbackWorker, MockCompletionService};
use atlas::geo::Coordinate;
use atlas::persistence::{InMemoryPersistence, PersistencePort, PersistenceQueue};
use atlas::poi::Poi;
use atlas::resolver::{Resolver, ResolverConfig};
use atlas::spatial::InMemorySpatialStore;

/// Hôtel de Ville, Paris.
pub const PARIS: (f64, f64) = (48.8566, 2.3522);

pub fn paris_landmarks() -> Vec<Poi> {
    vec![
        Poi::new("Louvre", "museum", coord(48.8606, 2.3376)),
        Poi::new("Notre-Dame", "landmark", coord(48.8530, 2.3499)),
        Poi::new("Centre Pompidou", "museum", coord(48.8626, 2.3522)),
        Poi::new("Place des Vosges", "park", coord(48.8556, 2.3655)),
    ]
}

pub fn coord(latitude: f64, longitude: f64) -> Coordinate {
    Coordinate::new(latitude, longitude).unwrap()
}

/// A fenced JSON reply in the shape completion models return.
pub fn generated_payload(places: &[(&str, f64, f64)]) -> String {
    let items: Vec<_> = places
        .iter()
        .map(|(name, lat, lon)| {
            serde_json::json!({
                "name": name,
                "category": "Landmark",
                "description": format!("{name} is worth a visit."),
                "lat": lat,
                "lng": lon,
            })
        })
        .collect();
    format!(
        "```json\n{}\n```",
        serde_json::json!({ "points_of_interest": items })
    )
}

pub fn paris_payload() -> String {
    generated_payload(&[
        ("Musée d'Orsay", 48.8600, 2.3266),
        ("Sainte-Chapelle", 48.8554, 2.3450),
        ("Panthéon", 48.8462, 2.3464),
        ("Jardin du Luxembourg", 48.8462, 2.3372),
    ])
}

pub struct Stack {
    pub resolver: Arc<Resolver>,
    pub spatial: Arc<InMemorySpatialStore>,
    pub embedder: Arc<MockEmbeddingService>,
    pub completion: Arc<MockCompletionService>,
    pub backend: Arc<InMemoryPersistence>,
}

impl Stack {
    pub async fn flush(&self) {
        self.resolver.persistence().flush().await;
    }
}

pub struct StackBuilder {
    pois: Vec<Poi>,
    reply: String,
    completion_delay: Option<Duration>,
    embedder: MockEmbeddingService,
    config: ResolverConfig,
    port: Option<Arc<dyn PersistencePort>>,
}

impl Default for StackBuilder {
    fn default() -> Self {
        Self {
            pois: Vec::new(),
            reply: paris_payload(),
            completion_delay: None,
            embedder: MockEmbeddingService::default(),
            config: ResolverConfig::default(),
            port: None,
        }
    }
}

impl StackBuilder {
    pub fn with_pois(mut self, pois: Vec<Poi>) -> Self {
        self.pois = pois;
        self
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = reply.into();
        self
    }

    pub fn with_completion_delay(mut self, delay: Duration) -> Self {
        self.completion_delay = Some(delay);
        self
    }

    pub fn with_embedder(mut self, embedder: MockEmbeddingService) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the in-memory backend behind the persistence queue.
    pub fn with_persistence(mut self, port: Arc<dyn PersistencePort>) -> Self {
        self.port = Some(port);
        self
    }

    /// Must be called inside a Tokio runtime (the persistence queue spawns).
    pub fn build(self) -> Stack {
        let spatial = Arc::new(InMemorySpatialStore::with_pois(self.pois));
        let embedder = Arc::new(self.embedder);
        let mut completion = MockCompletionService::new(self.reply);
        if let Some(delay) = self.completion_delay {
            completion = completion.with_delay(delay);
        }
        let completion = Arc::new(completion);
        let backend = Arc::new(InMemoryPersistence::new());
        let port: Arc<dyn PersistencePort> = self.port.unwrap_or_else(|| backend.clone());

        let resolver = Resolver::new(
            Arc::new(CacheService::with_defaults().unwrap()),
            spatial.clone(),
            embedder.clone(),
            GenerativeFallbackWorker::new(completion.clone()),
            Arc::new(PersistenceQueue::start(port)),
            self.config,
        )
        .unwrap();

        Stack {
            resolver: Arc::new(resolver),
            spatial,
            embedder,
            completion,
            backend,
        }
    }
}
