//! Router-level tests for the resolve endpoints, health and readiness.

use axum::{Router, body::Body, http::Request, http::StatusCode, response::IntoResponse};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use crate::cache::{CacheService, RESOLUTION_HEADER};
use crate::embedding::MockEmbeddingService;
use crate::gateway::create_router_with_state;
use crate::gateway::error::GatewayError;
use crate::gateway::state::HandlerState;
use crate::generation::{GenerativeFallbackWorker, MockCompletionService};
use crate::geo::Coordinate;
use crate::persistence::{InMemoryPersistence, PersistenceQueue};
use crate::poi::Poi;
use crate::resolver::{ResolveError, Resolver, ResolverConfig, Upstream};
use crate::spatial::InMemorySpatialStore;
use crate::validation::ValidationError;

const GENERATED_PAYLOAD: &str = r#"```json
{"points_of_interest": [
  {"name": "Sagrada Família", "category": "Church", "latitude": 41.4036, "longitude": 2.1744},
  {"name": "Casa Batlló", "category": "Landmark", "latitude": 41.3917, "longitude": 2.1650}
]}
```"#;

struct TestApp {
    router: Router,
    spatial: Arc<InMemorySpatialStore>,
    completion: Arc<MockCompletionService>,
}

fn setup_test_app(completion: MockCompletionService, config: ResolverConfig) -> TestApp {
    let spatial = Arc::new(InMemorySpatialStore::with_pois([Poi::new(
        "Park Güell",
        "park",
        Coordinate::new(41.4145, 2.1527).unwrap(),
    )]));
    let completion = Arc::new(completion);
    let resolver = Resolver::new(
        Arc::new(CacheService::with_defaults().unwrap()),
        spatial.clone(),
        Arc::new(MockEmbeddingService::default()),
        GenerativeFallbackWorker::new(completion.clone()),
        Arc::new(PersistenceQueue::start(Arc::new(InMemoryPersistence::new()))),
        config,
    )
    .unwrap();

    TestApp {
        router: create_router_with_state(HandlerState::new(Arc::new(resolver))),
        spatial,
        completion,
    }
}

fn default_app() -> TestApp {
    setup_test_app(
        MockCompletionService::new(GENERATED_PAYLOAD),
        ResolverConfig::default(),
    )
}

async fn post_json(router: &Router, uri: &str, body: serde_json::Value) -> axum::response::Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();

    router.clone().oneshot(request).await.unwrap()
}

fn resolution_header(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(RESOLUTION_HEADER)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

mod gateway_error_tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                GatewayError::InvalidRequest("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                GatewayError::from(ResolveError::from(ValidationError::EmptyQuery)),
                StatusCode::BAD_REQUEST,
            ),
            (
                GatewayError::from(ResolveError::UpstreamUnavailable {
                    service: Upstream::SpatialStore,
                    reason: "down".into(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                GatewayError::from(ResolveError::Parse {
                    reason: "not json".into(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                GatewayError::from(ResolveError::FallbackTimedOut {
                    waited: Duration::from_secs(90),
                }),
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err}");
        }
    }

    #[tokio::test]
    async fn test_error_body_and_header() {
        let response = GatewayError::from(ResolveError::FallbackTimedOut {
            waited: Duration::from_secs(1),
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(resolution_header(&response), "fallback_timeout");

        let json = body_json(response).await;
        assert_eq!(json["code"], 504);
        assert_eq!(json["kind"], "fallback_timeout");
        assert_eq!(json["retryable"], true);
    }
}

mod resolve_endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn test_nearby_database_then_exact_hit() {
        let app = default_app();
        let body = serde_json::json!({"lat": 41.4140, "lng": 2.1520, "radius_km": 1.0});

        let first = post_json(&app.router, "/v1/pois/nearby", body.clone()).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(resolution_header(&first), "DATABASE");
        let json = body_json(first).await;
        assert_eq!(json["source"], "DATABASE");
        assert_eq!(json["pois"][0]["name"], "Park Güell");

        let second = post_json(&app.router, "/v1/pois/nearby", body).await;
        assert_eq!(resolution_header(&second), "EXACT_CACHE_HIT");
        assert_eq!(app.spatial.call_count(), 1);
    }

    #[tokio::test]
    async fn test_nearby_miss_generates() {
        let app = default_app();
        let response = post_json(
            &app.router,
            "/v1/pois/nearby",
            serde_json::json!({"latitude": 41.3980, "longitude": 2.1700, "radius_km": 0.5}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(resolution_header(&response), "GENERATED");
        let json = body_json(response).await;
        assert_eq!(json["pois"].as_array().unwrap().len(), 2);
        assert!(json["interaction_id"].is_string());
        assert!(
            json["pois"]
                .as_array()
                .unwrap()
                .iter()
                .all(|p| p["source"] == "generated")
        );
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let app = default_app();
        let response = post_json(
            &app.router,
            "/v1/pois/search",
            serde_json::json!({"text": "Gaudí architecture", "city": "barcelona", "limit": 1}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["pois"].as_array().unwrap().len(), 1);
        assert_eq!(app.spatial.call_count(), 0);
    }

    #[tokio::test]
    async fn test_hybrid_database_hit() {
        let app = default_app();
        let response = post_json(
            &app.router,
            "/v1/pois/hybrid",
            serde_json::json!({
                "lat": 41.4140, "lon": 2.1520, "radius_km": 1.0,
                "text": "green spaces", "semantic_weight": 0.3
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(resolution_header(&response), "DATABASE");
        let json = body_json(response).await;
        assert!(json["pois"][0]["rank_score"].is_number());
    }

    #[tokio::test]
    async fn test_invalid_schema_is_bad_request() {
        let app = default_app();
        let response = post_json(
            &app.router,
            "/v1/pois/nearby",
            serde_json::json!({"lat": 41.4}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resolution_header(&response), "invalid_request");
        let json = body_json(response).await;
        assert!(
            json["error"]
                .as_str()
                .unwrap()
                .contains("Invalid request schema")
        );
    }

    #[tokio::test]
    async fn test_out_of_range_values_are_bad_request() {
        let app = default_app();
        let response = post_json(
            &app.router,
            "/v1/pois/hybrid",
            serde_json::json!({
                "lat": 41.4, "lon": 2.15, "radius_km": 1.0,
                "text": "parks", "semantic_weight": 1.2
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resolution_header(&response), "validation_error");
        assert_eq!(app.completion.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_fallback_is_bad_gateway() {
        let app = setup_test_app(
            MockCompletionService::new("Sorry, I can't help with that."),
            ResolverConfig::default(),
        );
        let response = post_json(
            &app.router,
            "/v1/pois/search",
            serde_json::json!({"text": "hidden speakeasies"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(resolution_header(&response), "parse_error");
        let json = body_json(response).await;
        assert_eq!(json["retryable"], false);
    }

    #[tokio::test]
    async fn test_spatial_outage_is_bad_gateway() {
        let app = default_app();
        app.spatial.set_failing(true);
        let response = post_json(
            &app.router,
            "/v1/pois/nearby",
            serde_json::json!({"lat": 41.4140, "lng": 2.1520, "radius_km": 1.0}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(resolution_header(&response), "upstream_unavailable");
        assert_eq!(app.completion.call_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_fallback_is_gateway_timeout() {
        let app = setup_test_app(
            MockCompletionService::new(GENERATED_PAYLOAD).with_delay(Duration::from_secs(10)),
            ResolverConfig::default().fallback_timeout(Duration::from_millis(50)),
        );
        let response = post_json(
            &app.router,
            "/v1/pois/search",
            serde_json::json!({"text": "late night tapas"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = default_app();
        let request = Request::builder()
            .method("GET")
            .uri("/healthz")
            .body(Body::empty())
            .unwrap();

        let response = app.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(resolution_header(&response), "healthy");
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_ready_endpoint_reports_components_and_caches() {
        let app = default_app();
        let request = Request::builder()
            .method("GET")
            .uri("/ready")
            .body(Body::empty())
            .unwrap();

        let response = app.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ready");
        assert_eq!(json["components"]["spatial_store"], "ready");
        assert!(json["caches"]["vector"].get("hits").is_some());
        assert_eq!(json["caches"]["dropped_persistence_jobs"], 0);
    }
}
