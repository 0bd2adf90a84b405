// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /analyze (response shape, empty-input rejection, gateway-failure
//   behavior of narration fields)

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::Request,
    Router,
};
use http::StatusCode;
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use fir_analyzer::api::{create_router, AppState};
use fir_analyzer::config::AnalyzerConfig;
use fir_analyzer::engine::Analyzer;
use fir_analyzer::gateway::{DisabledGateway, ERROR_MARKER};
use fir_analyzer::model::ModelArtifacts;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

/// Build the same Router the binary uses, with the repo's demo artifacts and
/// no LLM backend.
fn test_router() -> Router {
    let artifacts = ModelArtifacts::load(
        Path::new("models/tfidf_vectorizer.json"),
        Path::new("models/ipc_classifier.json"),
    )
    .expect("demo artifacts should load");
    let analyzer = Analyzer::new(
        Arc::new(artifacts),
        Arc::new(DisabledGateway),
        AnalyzerConfig::default(),
    );
    create_router(AppState {
        analyzer: Arc::new(analyzer),
    })
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body = String::from_utf8(bytes).expect("utf8");
    assert_eq!(body.trim(), "OK", "health body should be 'OK'");
}

#[tokio::test]
async fn api_analyze_returns_the_full_response_shape() {
    let app = test_router();

    let payload = json!({ "fir_text": "someone stole my bag near the bus station at 8 pm" });
    let req = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /analyze");

    let resp = app.oneshot(req).await.expect("oneshot /analyze");
    assert!(
        resp.status().is_success(),
        "POST /analyze should be 2xx, got {}",
        resp.status()
    );

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("parse analyze json");

    // Contract checks for UI consumers
    assert_eq!(v["status"], json!("success"));
    assert!(v.get("quality_score").is_some(), "missing 'quality_score'");
    assert!(v.get("warnings").is_some(), "missing 'warnings'");
    assert!(v.get("keywords").is_some(), "missing 'keywords'");
    assert!(v.get("severity").is_some(), "missing 'severity'");
    assert!(v.get("explanation").is_some(), "missing 'explanation'");
    assert!(v.get("punishment").is_some(), "missing 'punishment'");
    assert!(v.get("note").is_some(), "missing 'note'");

    // Strong theft signal: statistical path, no deferred label.
    let preds = v["ipc_predictions"]
        .as_array()
        .expect("statistical path should expose ipc_predictions");
    assert!(!preds.is_empty() && preds.len() <= 3);
    assert_eq!(preds[0]["section"], json!("379"));
    assert!(v.get("deferred_label").is_none());

    assert_eq!(v["quality_score"], json!(100));
    assert_eq!(v["warnings"].as_array().unwrap().len(), 0);
    assert_eq!(v["keywords"][0], json!("stolen"));
}

#[tokio::test]
async fn api_analyze_narration_fields_carry_the_error_marker_without_a_backend() {
    let app = test_router();

    let payload = json!({ "fir_text": "someone stole my bag near the bus station at 8 pm" });
    let req = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /analyze");

    let resp = app.oneshot(req).await.expect("oneshot /analyze");
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("parse analyze json");

    for field in ["severity", "explanation", "punishment"] {
        let text = v[field].as_str().unwrap_or_default();
        assert!(
            text.starts_with(ERROR_MARKER),
            "'{field}' should be error-marked without a backend, got {text:?}"
        );
    }

    // ML fields stay intact despite narration failures.
    assert_eq!(v["quality_score"], json!(100));
    assert!(v["ipc_predictions"].is_array());
}

#[tokio::test]
async fn api_analyze_rejects_malformed_json_with_the_error_shape() {
    let app = test_router();

    let req = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .expect("build POST /analyze");

    let resp = app.oneshot(req).await.expect("oneshot /analyze");
    assert!(
        resp.status().is_client_error(),
        "malformed JSON should be a 4xx, got {}",
        resp.status()
    );

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("error body must be JSON");
    assert_eq!(v["status"], json!("error"));
    assert!(v["message"].is_string());
}

#[tokio::test]
async fn api_analyze_rejects_empty_text_with_400() {
    let app = test_router();

    for payload in [
        json!({ "fir_text": "" }),
        json!({ "fir_text": "   \n" }),
        json!({}),
    ] {
        let req = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("build POST /analyze");

        let resp = app.clone().oneshot(req).await.expect("oneshot /analyze");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
            .await
            .expect("read json")
            .to_vec();
        let v: Json = serde_json::from_slice(&bytes).expect("parse error json");
        assert_eq!(v["status"], json!("error"));
        assert!(v["message"].as_str().unwrap().contains("required"));
    }
}
