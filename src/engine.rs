//! engine.rs — per-request orchestration of the FIR analysis pipeline.
//!
//! raw text → normalize → {quality, vectorize→classify, keywords} →
//! confidence gate → narration. Everything here is request-scoped except the
//! shared read-only model artifacts and the gateway handle.
//!
//! Ordering: ML scoring completes before any label-dependent LLM call, since
//! explanation and punishment need the final chosen label. The severity call
//! depends only on the text and runs concurrently with the deferred-labeling
//! call when the gate defers.

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::AnalyzerConfig;
use crate::decision::{gate, DecisionOutcome, Gate, LabelScore};
use crate::explain;
use crate::gateway::{flatten, LlmGateway};
use crate::model::{ModelArtifacts, ModelError, SectionClassifier, TextVectorizer};
use crate::preprocess::normalize;
use crate::prompts;
use crate::quality;

/// Disclaimer carried on every response surface.
pub const QUALITY_NOTE: &str =
    "Quality score is a heuristic completeness rating, not a legal-validity check.";

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("FIR text required")]
    EmptyInput,
    #[error("model fault: {0}")]
    Model(#[from] ModelError),
}

/// One ranked prediction as presented to consumers.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub section: String,
    pub probability: f32,
}

/// The full, consistently-shaped analysis response. Fields whose underlying
/// computation failed carry an error-marked string rather than being omitted;
/// only the labeling-path fields are conditional on the decision outcome.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipc_predictions: Option<Vec<Prediction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deferred_label: Option<String>,
    pub quality_score: u8,
    pub warnings: Vec<String>,
    pub keywords: Vec<String>,
    pub severity: String,
    pub explanation: String,
    pub punishment: String,
    pub note: &'static str,
}

/// Shared per-process analyzer: immutable artifacts + gateway + config.
pub struct Analyzer {
    artifacts: Arc<ModelArtifacts>,
    gateway: Arc<dyn LlmGateway>,
    cfg: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(
        artifacts: Arc<ModelArtifacts>,
        gateway: Arc<dyn LlmGateway>,
        cfg: AnalyzerConfig,
    ) -> Self {
        Self {
            artifacts,
            gateway,
            cfg,
        }
    }

    /// Best-effort narration: gateway failures flatten to the error marker.
    async fn narration(&self, prompt: String) -> String {
        let res = self.gateway.submit(&prompt).await;
        if res.is_err() {
            counter!("fir_gateway_failures_total").increment(1);
        }
        flatten(res)
    }

    /// Run the whole pipeline for one FIR submission.
    pub async fn analyze(&self, raw: &str) -> Result<AnalysisReport, AnalyzeError> {
        if raw.trim().is_empty() {
            return Err(AnalyzeError::EmptyInput);
        }
        counter!("fir_requests_total").increment(1);

        let normalized = normalize(raw);
        let report = quality::assess(&normalized);

        // ML scoring path. A dimension mismatch here is an internal fault,
        // not a user error.
        let features = self.artifacts.vectorizer.vectorize(&normalized);
        let dist = self.artifacts.classifier.distribution(&features)?;
        let scores: Vec<LabelScore> = self
            .artifacts
            .classifier
            .sections()
            .iter()
            .zip(&dist)
            .map(|(section, &probability)| LabelScore {
                section: section.clone(),
                probability,
            })
            .collect();
        let gated = gate(
            &scores,
            self.cfg.pipeline.confidence_threshold,
            self.cfg.pipeline.top_k,
        );

        // Explainability always reflects the raw classifier opinion, even
        // when the gate defers the presented label.
        let keywords = explain::extract(
            &self.artifacts.vectorizer,
            &self.artifacts.classifier,
            &normalized,
            self.cfg.pipeline.top_keywords,
        )?
        .into_messages();

        // Severity is grounded only in the text, so it can run concurrently
        // with the deferred-labeling call.
        let severity_fut = self.narration(prompts::severity_prompt(&normalized));
        let outcome_fut = async {
            match gated {
                Gate::Trust { primary, top_k } => DecisionOutcome::Statistical { primary, top_k },
                Gate::Defer { top_probability } => {
                    counter!("fir_deferred_total").increment(1);
                    info!(
                        target: "fir",
                        id = %anon_hash(&normalized),
                        top_probability,
                        "weak statistical signal; deferring labeling to LLM"
                    );
                    let llm_label = self
                        .narration(prompts::deferred_section_prompt(&normalized))
                        .await;
                    DecisionOutcome::Deferred { llm_label }
                }
            }
        };
        let (severity, outcome) = tokio::join!(severity_fut, outcome_fut);

        let final_label = match &outcome {
            DecisionOutcome::Statistical { primary, .. } => primary.clone(),
            DecisionOutcome::Deferred { llm_label } => llm_label.clone(),
        };

        // Label-dependent narration, issued only once the label is settled.
        let (explanation, punishment) = tokio::join!(
            self.narration(prompts::explanation_prompt(&normalized, &final_label)),
            self.narration(prompts::punishment_prompt(&final_label)),
        );

        let (ipc_predictions, deferred_label) = match outcome {
            DecisionOutcome::Statistical { top_k, .. } => (
                Some(
                    top_k
                        .into_iter()
                        .map(|s| Prediction {
                            section: s.section,
                            probability: s.probability,
                        })
                        .collect(),
                ),
                None,
            ),
            DecisionOutcome::Deferred { llm_label } => (None, Some(llm_label)),
        };

        info!(
            target: "fir",
            id = %anon_hash(&normalized),
            quality = report.score,
            deferred = deferred_label.is_some(),
            backend = self.gateway.backend_name(),
            "analysis complete"
        );

        Ok(AnalysisReport {
            ipc_predictions,
            deferred_label,
            quality_score: report.score,
            warnings: report.warnings,
            keywords,
            severity,
            explanation,
            punishment,
            note: QUALITY_NOTE,
        })
    }
}

/// Short digest identifying a request in logs. FIR text is sensitive and is
/// never logged raw.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
