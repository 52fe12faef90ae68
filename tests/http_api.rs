//! End-to-end HTTP tests against a served router.

mod common;

use std::time::Duration;

use atlas::RESOLUTION_HEADER;
use atlas::resolver::ResolverConfig;

use common::fixtures::{PARIS, StackBuilder, paris_landmarks};
use common::harness::spawn_test_server;

async fn post(url: &str, body: serde_json::Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .expect("request should complete")
}

fn resolution(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(RESOLUTION_HEADER)
        .expect("resolution header")
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let stack = StackBuilder::default().build();
    let server = spawn_test_server(stack.resolver.clone())
        .await
        .expect("Server should start");

    let response = reqwest::get(format!("{}/healthz", server.url()))
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_nearby_walks_database_then_cache() {
    let stack = StackBuilder::default()
        .with_pois(paris_landmarks())
        .build();
    let server = spawn_test_server(stack.resolver.clone()).await.unwrap();
    let url = format!("{}/v1/pois/nearby", server.url());
    let body = serde_json::json!({"lat": PARIS.0, "lng": PARIS.1, "radius_km": 2.0});

    let first = post(&url, body.clone()).await;
    assert_eq!(first.status(), 200);
    assert_eq!(resolution(&first), "DATABASE");

    let second = post(&url, body).await;
    assert_eq!(resolution(&second), "EXACT_CACHE_HIT");
    let json: serde_json::Value = second.json().await.unwrap();
    assert_eq!(json["pois"].as_array().unwrap().len(), 4);
    assert_eq!(stack.spatial.call_count(), 1);
}

#[tokio::test]
async fn test_search_generates_and_persists() {
    let stack = StackBuilder::default().build();
    let server = spawn_test_server(stack.resolver.clone()).await.unwrap();

    let response = post(
        &format!("{}/v1/pois/search", server.url()),
        serde_json::json!({"text": "left bank landmarks", "city_id": "paris", "user_id": "u-42"}),
    )
    .await;
    assert_eq!(response.status(), 200);
    assert_eq!(resolution(&response), "GENERATED");
    let json: serde_json::Value = response.json().await.unwrap();
    let interaction_id = json["interaction_id"].as_str().unwrap().to_string();

    stack.flush().await;
    let interactions = stack.backend.interactions();
    assert_eq!(interactions.len(), 1);
    assert_eq!(interactions[0].id().to_string(), interaction_id);
    assert!(
        stack
            .backend
            .pois()
            .iter()
            .all(|row| row.user_id.as_deref() == Some("u-42"))
    );
}

#[tokio::test]
async fn test_timeout_maps_to_gateway_timeout() {
    let stack = StackBuilder::default()
        .with_completion_delay(Duration::from_secs(10))
        .with_config(ResolverConfig::default().fallback_timeout(Duration::from_millis(100)))
        .build();
    let server = spawn_test_server(stack.resolver.clone()).await.unwrap();

    let response = post(
        &format!("{}/v1/pois/hybrid", server.url()),
        serde_json::json!({
            "lat": PARIS.0, "lon": PARIS.1, "radius_km": 1.0,
            "text": "rooftop views", "semantic_weight": 0.5
        }),
    )
    .await;

    assert_eq!(response.status(), 504);
    assert_eq!(resolution(&response), "fallback_timeout");
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["retryable"], true);
}

#[tokio::test]
async fn test_ready_reports_cache_stats() {
    let stack = StackBuilder::default()
        .with_pois(paris_landmarks())
        .build();
    let server = spawn_test_server(stack.resolver.clone()).await.unwrap();

    post(
        &format!("{}/v1/pois/nearby", server.url()),
        serde_json::json!({"lat": PARIS.0, "lng": PARIS.1, "radius_km": 2.0}),
    )
    .await;

    let response = reqwest::get(format!("{}/ready", server.url()))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["components"]["spatial_store"], "ready");
    assert_eq!(json["caches"]["vector"]["inserts"], 1);
}
