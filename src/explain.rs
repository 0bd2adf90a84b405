//! explain.rs — surfaces the input terms that drove the classifier's decision.
//!
//! Attribution is per-feature `value * class_weight`, which is well-defined
//! for the linear model behind `SectionClassifier::weights`. The class used
//! here is always the classifier's raw argmax — it can diverge from the
//! threshold-gated label the decision engine presents. That divergence is
//! intentional: keyword extraction is a diagnostic view of the raw model
//! opinion, independent of the presentation policy.

use crate::model::{ModelError, SectionClassifier, TextVectorizer};

pub const INSUFFICIENT_TEXT_MESSAGE: &str = "Insufficient textual information";
pub const LOW_CONFIDENCE_MESSAGE: &str = "Low confidence keywords";

/// Default number of keyword candidates considered before positivity
/// filtering.
pub const DEFAULT_TOP_N: usize = 5;

/// Outcome of keyword extraction. The two sentinel cases are distinct even
/// though the reference surface renders them both as a single message:
/// `InsufficientText` means no vocabulary term was present at all, while
/// `LowConfidence` means terms were present but none supported the predicted
/// class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordExtraction {
    Keywords(Vec<String>),
    InsufficientText,
    LowConfidence,
}

impl KeywordExtraction {
    /// Flatten to the textual form consumers display. Always non-empty.
    pub fn into_messages(self) -> Vec<String> {
        match self {
            KeywordExtraction::Keywords(v) => v,
            KeywordExtraction::InsufficientText => vec![INSUFFICIENT_TEXT_MESSAGE.to_string()],
            KeywordExtraction::LowConfidence => vec![LOW_CONFIDENCE_MESSAGE.to_string()],
        }
    }
}

/// Extract up to `top_n` keywords with strictly positive contribution to the
/// predicted class.
///
/// Negative or zero contributions are never "supporting evidence" and are
/// dropped even when they rank high by magnitude.
pub fn extract(
    vectorizer: &dyn TextVectorizer,
    classifier: &dyn SectionClassifier,
    normalized: &str,
    top_n: usize,
) -> Result<KeywordExtraction, ModelError> {
    let features = vectorizer.vectorize(normalized);
    if features.nnz() == 0 {
        return Ok(KeywordExtraction::InsufficientText);
    }

    let class = classifier.predict(&features)?;
    let weights = classifier.weights(class);

    let mut contributions: Vec<(usize, f32)> = features
        .entries()
        .iter()
        .map(|&(i, v)| (i, v * weights.get(i).copied().unwrap_or(0.0)))
        .collect();
    // Descending by contribution; feature-index tiebreak keeps output stable.
    contributions.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    let keywords: Vec<String> = contributions
        .into_iter()
        .take(top_n)
        .filter(|&(_, c)| c > 0.0)
        .filter_map(|(i, _)| vectorizer.term(i).map(str::to_string))
        .collect();

    if keywords.is_empty() {
        Ok(KeywordExtraction::LowConfidence)
    } else {
        Ok(KeywordExtraction::Keywords(keywords))
    }
}
