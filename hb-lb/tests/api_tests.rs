//! Integration tests for hb-lb API endpoints
//!
//! Tests cover:
//! - Health and build info
//! - Snapshot read endpoints (leaderboard, results, min laps, events, rounds)
//! - Settings read/update with validation
//! - Pilot image lookup and path confinement
//! - Manual reprocess trigger

mod helpers;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt; // for `collect`
use helpers::{settings_for, SourceFixture, EVENT_ID};
use hb_common::{EventBus, SettingsStore};
use hb_lb::engine::Engine;
use hb_lb::scheduler::{Scheduler, SchedulerConfig};
use hb_lb::snapshot::{build_snapshot, SnapshotPublisher};
use hb_lb::{build_router, AppState};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method
use uuid::Uuid;

/// Test helper: app over a fixture tree with its first snapshot published
async fn setup_app(fixture: &SourceFixture) -> axum::Router {
    let settings = settings_for(&fixture.root(), EVENT_ID);
    let store = SettingsStore::new(settings.clone(), fixture.dir.path().join("heatboard.toml"));

    let publisher = Arc::new(SnapshotPublisher::new());
    let snapshot = build_snapshot(&settings, Uuid::new_v4()).expect("Fixture should load");
    publisher.publish(Arc::new(snapshot)).await;

    let bus = EventBus::new(16);
    let engine = Arc::new(Engine::new(store.clone(), Arc::clone(&publisher)));
    let (scheduler, handle) = Scheduler::new(SchedulerConfig::from_settings(&settings), engine, bus.clone());
    scheduler.spawn();

    build_router(AppState::new(store, publisher, handle, bus, None))
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Health and build info
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = SourceFixture::two_pilot_event();
    let app = setup_app(&fixture).await;

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "hb-lb");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_build_info_endpoint() {
    let fixture = SourceFixture::two_pilot_event();
    let app = setup_app(&fixture).await;

    let response = app.oneshot(test_request("GET", "/api/buildinfo")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert!(body["git_hash"].is_string());
    assert!(body["build_profile"].is_string());
}

// =============================================================================
// Snapshot reads
// =============================================================================

#[tokio::test]
async fn test_leaderboard_endpoint() {
    let fixture = SourceFixture::two_pilot_event();
    let app = setup_app(&fixture).await;

    let response = app.oneshot(test_request("GET", "/api/leaderboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["eventName"], "Spring Cup");
    assert_eq!(body["roundName"], "All Rounds");
    assert_eq!(body["sortedBy"], "bestLap");
    assert_eq!(body["sortedByDisplayName"], "CONSECUTIVE 1 LAP (WITHOUT HS)");

    let ranking = body["ranking"].as_array().unwrap();
    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0]["pilotName"], "Alpha");
    assert_eq!(ranking[0]["time"], 27.0);
    assert_eq!(ranking[1]["pilotName"], "Bravo");

    assert_eq!(body["lastHeatName"], "Race 1-1");
    assert!(body["nextHeatName"].is_null());
    assert_eq!(body["lastHeatPilotIds"], serde_json::json!(["pa", "pb"]));
    assert!(body["generatedAt"].is_string());
}

#[tokio::test]
async fn test_results_endpoint() {
    let fixture = SourceFixture::two_pilot_event();
    let app = setup_app(&fixture).await;

    let response = app.oneshot(test_request("GET", "/api/results")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["lapsToDo"], 3);
    assert_eq!(body["header"][0], "Event");
    assert_eq!(body["rows"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_min_laps_endpoint() {
    let fixture = SourceFixture::two_pilot_event();
    let app = setup_app(&fixture).await;

    let response = app.oneshot(test_request("GET", "/api/min_laps")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let laps = body.as_array().unwrap();
    assert_eq!(laps.len(), 6);
    assert_eq!(laps[0]["time"], 27.0);
    assert_eq!(laps[0]["pilotName"], "Alpha");
}

#[tokio::test]
async fn test_events_and_rounds_endpoints() {
    let fixture = SourceFixture::two_pilot_event();
    let app = setup_app(&fixture).await;

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/events"))
        .await
        .unwrap();
    let events = extract_json(response.into_body()).await;
    assert_eq!(events[0]["id"], EVENT_ID);
    assert_eq!(events[0]["name"], "Spring Cup");

    let response = app.oneshot(test_request("GET", "/api/rounds")).await.unwrap();
    let rounds = extract_json(response.into_body()).await;
    let ids: Vec<&str> = rounds
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec!["all", "allRace", "allPractice", "allTimeTrial", "allEndurance", "round-1"]
    );
}

#[tokio::test]
async fn test_status_endpoint() {
    let fixture = SourceFixture::two_pilot_event();
    let app = setup_app(&fixture).await;

    let response = app.oneshot(test_request("GET", "/api/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert!(body["runId"].is_string());
    assert!(body["scheduler"]["state"].is_string());
    assert!(body["uptimeSeconds"].as_i64().unwrap() >= 0);
}

// =============================================================================
// Settings
// =============================================================================

#[tokio::test]
async fn test_get_config() {
    let fixture = SourceFixture::two_pilot_event();
    let app = setup_app(&fixture).await;

    let response = app.oneshot(test_request("GET", "/api/config")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["selected_event_id"], EVENT_ID);
    assert_eq!(body["sorted_by"], "bestLap");
}

#[tokio::test]
async fn test_update_config_persists() {
    let fixture = SourceFixture::two_pilot_event();
    let app = setup_app(&fixture).await;

    let response = app
        .clone()
        .oneshot(json_request("/api/config", r#"{"sorted_by": "raceTime"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["settings"]["sorted_by"], "raceTime");
    assert!(fixture.dir.path().join("heatboard.toml").exists());

    let response = app.oneshot(test_request("GET", "/api/config")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["sorted_by"], "raceTime");
}

#[tokio::test]
async fn test_update_config_rejects_unknown_category() {
    let fixture = SourceFixture::two_pilot_event();
    let app = setup_app(&fixture).await;

    let response = app
        .oneshot(json_request("/api/config", r#"{"sorted_by": "fastestEver"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(!fixture.dir.path().join("heatboard.toml").exists());
}

#[tokio::test]
async fn test_update_config_rejects_unknown_keys_and_bad_json() {
    let fixture = SourceFixture::two_pilot_event();
    let app = setup_app(&fixture).await;

    let response = app
        .clone()
        .oneshot(json_request("/api/config", r#"{"sortedBy": "raceTime"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(json_request("/api/config", "not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request("/api/config", r#"{"leaderboard_round": "  "}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_leaderboard_follows_configured_category() {
    let fixture = SourceFixture::two_pilot_event();
    let app = setup_app(&fixture).await;

    let response = app
        .clone()
        .oneshot(json_request("/api/config", r#"{"sorted_by": "raceTime"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(test_request("GET", "/api/leaderboard")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["sortedBy"], "raceTime");
    assert_eq!(body["sortedByDisplayName"], "Race Time");

    // Bravo never completed enough laps for a race time
    let ranking = body["ranking"].as_array().unwrap();
    assert_eq!(ranking.len(), 1);
    assert_eq!(ranking[0]["pilotId"], "pa");
    assert_eq!(ranking[0]["time"], 84.5);
}

// =============================================================================
// Pilot images
// =============================================================================

#[tokio::test]
async fn test_pilot_image_by_id() {
    let fixture = SourceFixture::two_pilot_event();
    let image = fixture.root().join("pilots").join("pa.jpg");
    std::fs::create_dir_all(image.parent().unwrap()).unwrap();
    std::fs::write(&image, [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
    let app = setup_app(&fixture).await;

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/pilot_image?id=pa"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes.as_ref(), &[0xFF, 0xD8, 0xFF, 0xE0]);

    // Bravo's photo reference points at a file that does not exist
    let response = app
        .oneshot(test_request("GET", "/api/pilot_image?id=pb"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_pilot_image_errors() {
    let fixture = SourceFixture::two_pilot_event();
    let app = setup_app(&fixture).await;

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/pilot_image?id=nobody"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/pilot_image"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(test_request("GET", "/api/pilot_image?path=../../etc/passwd"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

// =============================================================================
// Reprocess
// =============================================================================

#[tokio::test]
async fn test_reprocess_is_accepted() {
    let fixture = SourceFixture::two_pilot_event();
    let app = setup_app(&fixture).await;

    let response = app
        .oneshot(test_request("POST", "/api/reprocess"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["message"], "Reprocess requested");
}
