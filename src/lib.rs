// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod decision;
pub mod engine;
pub mod explain;
pub mod gateway;
pub mod metrics;
pub mod model;
pub mod preprocess;
pub mod prompts;
pub mod quality;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::engine::{AnalysisReport, Analyzer};
