//! End-to-end resolution scenarios and pipeline-wide properties.

mod common;

use std::sync::Arc;

use atlas::cache::{CacheScope, ResolutionSource, VectorCache, VectorCacheConfig, VectorCacheEntry};
use atlas::embedding::{MockEmbeddingService, cosine_similarity};
use atlas::geo::Coordinate;
use atlas::hashing::cache_key;
use atlas::persistence::FilePersistence;
use atlas::poi::{Poi, PoiSource};
use atlas::resolver::{HybridQuery, LocationQuery, ResolveError, SemanticQuery};
use atlas::scoring::HybridScorer;
use atlas::validation::ValidationError;

use common::fixtures::{PARIS, StackBuilder, generated_payload, paris_landmarks};

#[tokio::test]
async fn test_scenario_a_populated_store_sorted_by_distance() {
    let stack = StackBuilder::default()
        .with_pois(paris_landmarks())
        .build();
    let center = Coordinate::new(PARIS.0, PARIS.1).unwrap();

    let resolution = stack
        .resolver
        .resolve_by_location(&LocationQuery::new(PARIS.0, PARIS.1, 2.0))
        .await
        .unwrap();

    assert_eq!(resolution.source, ResolutionSource::Database);
    assert_eq!(resolution.pois.len(), 4);
    assert!(
        resolution
            .pois
            .iter()
            .all(|p| p.source == PoiSource::SpatialStore)
    );
    let distances: Vec<f64> = resolution
        .pois
        .iter()
        .map(|p| center.distance_km(&p.coordinate))
        .collect();
    assert!(
        distances.windows(2).all(|w| w[0] <= w[1]),
        "not ascending: {distances:?}"
    );
    assert_eq!(stack.completion.call_count(), 0);
}

#[tokio::test]
async fn test_scenario_b_empty_store_generates_once() {
    let stack = StackBuilder::default().build();
    let query = LocationQuery::new(PARIS.0, PARIS.1, 2.0);

    let first = stack.resolver.resolve_by_location(&query).await.unwrap();
    assert_eq!(first.source, ResolutionSource::Generated);
    assert!(!first.pois.is_empty());
    assert!(first.pois.iter().all(|p| p.source == PoiSource::Generated));

    let second = stack.resolver.resolve_by_location(&query).await.unwrap();
    assert_eq!(second.source, ResolutionSource::ExactCacheHit);
    assert_eq!(second.pois, first.pois);
    assert_eq!(stack.completion.call_count(), 1);
}

#[tokio::test]
async fn test_scenario_c_zero_weight_hybrid_matches_distance_sort() {
    let stack = StackBuilder::default()
        .with_pois(paris_landmarks())
        .build();

    let hybrid = stack
        .resolver
        .resolve_hybrid(&HybridQuery::new(PARIS.0, PARIS.1, 2.0, "art museums", 0.0))
        .await
        .unwrap();
    let spatial = stack
        .resolver
        .resolve_by_location(&LocationQuery::new(PARIS.0, PARIS.1, 2.0))
        .await
        .unwrap();

    let ids = |pois: &[Poi]| pois.iter().map(|p| p.id).collect::<Vec<_>>();
    assert_eq!(ids(&hybrid.pois), ids(&spatial.pois));
}

#[tokio::test]
async fn test_scenario_d_out_of_range_weight_is_rejected_without_io() {
    let stack = StackBuilder::default()
        .with_pois(paris_landmarks())
        .build();

    let err = stack
        .resolver
        .resolve_hybrid(&HybridQuery::new(PARIS.0, PARIS.1, 2.0, "art museums", 1.5))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ResolveError::Validation(ValidationError::SemanticWeightOutOfRange { .. })
    ));
    assert_eq!(stack.spatial.call_count(), 0);
    assert_eq!(stack.embedder.call_count(), 0);
    assert_eq!(stack.completion.call_count(), 0);
    stack.resolver.caches().vector().run_pending_tasks();
    assert!(stack.resolver.caches().vector().is_empty());
}

#[tokio::test]
async fn test_generated_coordinates_are_always_in_range() {
    let stack = StackBuilder::default()
        .with_reply(generated_payload(&[
            ("Valid", 48.8600, 2.3266),
            ("Transposed", 116.3972, 39.9163),
            ("Pole", 90.0, 180.0),
            ("Broken", 200.0, 400.0),
            ("Also broken", -91.0, -181.0),
        ]))
        .build();

    for (lat, lon) in [(PARIS.0, PARIS.1), (-33.8688, 151.2093), (64.1466, -21.9426)] {
        let resolution = stack
            .resolver
            .resolve_by_location(&LocationQuery::new(lat, lon, 5.0))
            .await
            .unwrap();
        assert_eq!(resolution.pois.len(), 3);
        for poi in &resolution.pois {
            assert!((-90.0..=90.0).contains(&poi.coordinate.latitude), "{poi:?}");
            assert!((-180.0..=180.0).contains(&poi.coordinate.longitude), "{poi:?}");
        }
    }
}

#[tokio::test]
async fn test_repeated_semantic_query_hits_both_caches() {
    let stack = StackBuilder::default().build();
    let query = SemanticQuery::new("Quiet cafés to read in").in_city("paris");

    stack
        .resolver
        .resolve_by_semantic_query(&query)
        .await
        .unwrap();
    for _ in 0..3 {
        let again = stack
            .resolver
            .resolve_by_semantic_query(&query)
            .await
            .unwrap();
        assert!(again.source.is_cache_hit());
    }

    assert_eq!(stack.embedder.call_count(), 1);
    assert_eq!(stack.completion.call_count(), 1);
}

#[tokio::test]
async fn test_hybrid_query_reuses_cached_embedding() {
    let stack = StackBuilder::default()
        .with_pois(paris_landmarks())
        .build();

    // Different radii mean different exact keys but the same query text.
    for radius_km in [1.0, 2.0, 3.0] {
        stack
            .resolver
            .resolve_hybrid(&HybridQuery::new(PARIS.0, PARIS.1, radius_km, "museums", 0.5))
            .await
            .unwrap();
    }
    assert_eq!(stack.embedder.call_count(), 1);
}

#[test]
fn test_semantic_hits_never_fall_below_threshold() {
    let embedder = MockEmbeddingService::new(8);
    let cache = VectorCache::new(VectorCacheConfig::default().similarity_threshold(0.8)).unwrap();
    let scope = CacheScope::for_semantic(Some("paris"));

    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let embed = |text: &str| {
        rt.block_on(atlas::embedding::EmbeddingService::embed(&embedder, text))
            .unwrap()
    };

    let stored: Vec<String> = (0..40).map(|i| format!("stored query {i}")).collect();
    for text in &stored {
        let key = cache_key("semantic", Some(text), None, &scope);
        cache.set(
            key,
            VectorCacheEntry::new(
                text.clone(),
                Some(embed(text)),
                Vec::new(),
                scope.clone(),
                ResolutionSource::Generated,
            ),
        );
    }

    for i in 0..40 {
        let probe = embed(&format!("probe {i}"));
        if let Some(hit) = cache.get_similar(&probe, &scope) {
            let stored = hit.entry.embedding.as_deref().unwrap();
            let actual = cosine_similarity(&probe, stored).unwrap();
            assert!(actual >= 0.8);
            assert!((actual - hit.similarity).abs() < 1e-6);
        }
    }
}

#[test]
fn test_hybrid_score_is_monotonic_in_distance() {
    for weight in [0.0, 0.25, 0.5, 0.75, 1.0] {
        let scorer = HybridScorer::new(weight).unwrap();
        for similarity in [None, Some(0.0), Some(0.5), Some(1.0)] {
            let mut previous = f64::INFINITY;
            for step in 0..50 {
                let score = scorer.score(step as f64 * 0.2, similarity);
                assert!(score <= previous, "weight={weight} step={step}");
                previous = score;
            }
        }
    }
}

#[tokio::test]
async fn test_malformed_payload_writes_no_cache_entry() {
    for reply in ["", "   ", "not json at all", "{\"points_of_interest\": []}", "[1, 2, 3]"] {
        let stack = StackBuilder::default().with_reply(reply).build();

        let err = stack
            .resolver
            .resolve_by_semantic_query(&SemanticQuery::new("jazz clubs"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Parse { .. }), "{reply:?}: {err:?}");

        stack.resolver.caches().vector().run_pending_tasks();
        assert!(stack.resolver.caches().vector().is_empty(), "{reply:?}");
    }
}

#[tokio::test]
async fn test_near_duplicates_persist_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FilePersistence::open(dir.path()).await.unwrap());
    let stack = StackBuilder::default()
        .with_reply(generated_payload(&[
            ("Shakespeare and Company", 48.85260, 2.34710),
            ("Shakespeare & Company", 48.85260, 2.34710),
            ("shakespeare and company", 48.85290, 2.34730),
            ("Shakespeare and Company", 48.86500, 2.34710),
        ]))
        .with_persistence(store.clone())
        .build();

    let resolution = stack
        .resolver
        .resolve_by_location(
            &LocationQuery::new(PARIS.0, PARIS.1, 3.0)
                .with_category("bookshop")
                .with_user("reader-1"),
        )
        .await
        .unwrap();
    stack.resolver.persistence().shutdown().await;

    let rows = store.load_pois().await.unwrap();
    assert_eq!(rows.len(), resolution.pois.len());
    // Same normalized name within 100 m collapses; a different spelling and
    // the far-away namesake survive.
    assert_eq!(rows.len(), 3);
    assert!(
        rows.iter()
            .all(|r| Some(r.interaction_id) == resolution.interaction_id)
    );
    assert!(rows.iter().all(|r| r.user_id.as_deref() == Some("reader-1")));

    let interactions = store.load_interactions().await.unwrap();
    assert_eq!(interactions.len(), 1);
    assert!(interactions[0].is_success());
    assert!(interactions[0].estimated_cost_usd() > 0.0);
}
