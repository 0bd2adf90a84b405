//! FIR Legal Intelligence Service — Binary Entrypoint
//! Boots the Axum HTTP server: loads config and model artifacts, wires the
//! analyzer, gateway, routes, and metrics.
//!
//! Artifact loading is all-or-nothing: the process refuses to serve without
//! both the classifier and the vectorizer.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fir_analyzer::api::{create_router, AppState};
use fir_analyzer::config::AnalyzerConfig;
use fir_analyzer::engine::Analyzer;
use fir_analyzer::gateway::{DisabledGateway, LlmGateway, OllamaCliGateway, OllamaHttpGateway};
use fir_analyzer::metrics::Metrics;
use fir_analyzer::model::ModelArtifacts;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fir=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn build_gateway(cfg: &AnalyzerConfig) -> Arc<dyn LlmGateway> {
    match cfg.gateway.provider.as_str() {
        "cli" => Arc::new(OllamaCliGateway::new(
            cfg.gateway.model.clone(),
            cfg.gateway.timeout(),
        )),
        "http" => Arc::new(OllamaHttpGateway::new(
            cfg.gateway.endpoint.clone(),
            cfg.gateway.model.clone(),
            cfg.gateway.timeout(),
        )),
        _ => Arc::new(DisabledGateway),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = AnalyzerConfig::from_env();
    info!(
        target: "fir",
        threshold = cfg.pipeline.confidence_threshold,
        provider = %cfg.gateway.provider,
        model = %cfg.gateway.model,
        "config loaded"
    );

    // Fatal if either artifact is missing or corrupt.
    let artifacts = Arc::new(ModelArtifacts::load(
        &cfg.artifacts.vectorizer_path,
        &cfg.artifacts.classifier_path,
    )?);
    info!(target: "fir", "model artifacts loaded");

    let metrics = Metrics::init(cfg.pipeline.confidence_threshold);

    let gateway = build_gateway(&cfg);
    let bind = cfg.server.bind.clone();
    let analyzer = Arc::new(Analyzer::new(artifacts, gateway, cfg));

    let router = create_router(AppState { analyzer }).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(target: "fir", %bind, "serving");
    axum::serve(listener, router).await?;
    Ok(())
}
