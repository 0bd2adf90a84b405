//! decision.rs — confidence-gated decision between the statistical classifier
//! and LLM-based legal reasoning.
//!
//! Policy: when the classifier's top probability is below the threshold, the
//! system refuses to present a numeric-confidence answer and defers the
//! labeling to the LLM instead. Narration (severity, explanation, punishment)
//! is produced on both paths; only the *labeling* authority switches.

use serde::{Deserialize, Serialize};

/// Default minimum top-class probability required to trust the classifier.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.30;

/// How many ranked predictions are retained for presentation.
pub const TOP_K: usize = 3;

/// One candidate IPC section with its probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub section: String,
    pub probability: f32,
}

/// Pure gating verdict, before any LLM involvement.
#[derive(Debug, Clone, PartialEq)]
pub enum Gate {
    /// Signal is strong enough; present the ranked top-k.
    Trust {
        primary: String,
        top_k: Vec<LabelScore>,
    },
    /// Signal is weak; the caller must obtain a label from the LLM.
    Defer { top_probability: f32 },
}

/// Final labeling outcome for one request. Chosen once, immutable.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionOutcome {
    Statistical {
        primary: String,
        top_k: Vec<LabelScore>,
    },
    Deferred {
        llm_label: String,
    },
}

/// Rank the full distribution and apply the confidence threshold.
///
/// Sorting is descending by probability and stable, so ties keep the
/// classifier's original label order and the output stays deterministic.
pub fn gate(scores: &[LabelScore], threshold: f32, k: usize) -> Gate {
    let mut ranked: Vec<LabelScore> = scores.to_vec();
    ranked.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    match ranked.first() {
        Some(top) if top.probability >= threshold => {
            let primary = top.section.clone();
            ranked.truncate(k);
            Gate::Trust {
                primary,
                top_k: ranked,
            }
        }
        Some(top) => Gate::Defer {
            top_probability: top.probability,
        },
        None => Gate::Defer {
            top_probability: 0.0,
        },
    }
}
