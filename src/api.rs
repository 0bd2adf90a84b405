//! api.rs — HTTP surface for the analyzer.
//!
//! Thin marshalling only: text in, JSON out. All decision logic lives in
//! `engine`. Input validation errors map to 400, model faults to 500, and the
//! response body always carries a `status` discriminator for UI consumers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::engine::{AnalysisReport, AnalyzeError, Analyzer};

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    fir_text: String,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    status: &'static str,
    #[serde(flatten)]
    report: AnalysisReport,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: String,
}

fn error_response(code: StatusCode, message: String) -> Response {
    (
        code,
        Json(ErrorResponse {
            status: "error",
            message,
        }),
    )
        .into_response()
}

async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    // Malformed bodies get the same error shape as every other failure path.
    let Json(body) = match body {
        Ok(json) => json,
        Err(rejection) => {
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    match state.analyzer.analyze(&body.fir_text).await {
        Ok(report) => Json(AnalyzeResponse {
            status: "success",
            report,
        })
        .into_response(),
        Err(e @ AnalyzeError::EmptyInput) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        Err(AnalyzeError::Model(e)) => {
            error!(target: "fir", error = %e, "scoring path fault");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
