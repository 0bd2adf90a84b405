//! model.rs — read-only model artifacts: TF-IDF vectorizer + linear classifier.
//!
//! The two artifacts are produced offline by the training job and loaded once
//! at process start. They are immutable afterwards; every request shares them
//! behind an `Arc` with no locking. Loading is all-or-nothing: a missing or
//! corrupt artifact must keep the process from serving at all.
//!
//! The capability traits below formalize the shape the pipeline relies on
//! (`vectorize`, probability distribution, per-class weight vector) so tests
//! can substitute small hand-built artifacts for the real ones. Per-feature
//! attribution in `explain.rs` assumes a linear model; that assumption is part
//! of the `SectionClassifier` contract.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Faults inside the scoring path. These are server-side errors (artifact
/// inconsistencies), never user mistakes.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("feature vector has {got} features but classifier expects {expected}")]
    DimensionMismatch { got: usize, expected: usize },
    #[error("classifier has no classes")]
    NoClasses,
}

/// Sparse feature vector over the vectorizer's vocabulary. Entries are
/// (feature index, weight), sorted by index, all weights non-zero.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    entries: Vec<(usize, f32)>,
    dim: usize,
}

impl FeatureVector {
    pub fn new(mut entries: Vec<(usize, f32)>, dim: usize) -> Self {
        entries.retain(|&(_, v)| v != 0.0);
        entries.sort_by_key(|&(i, _)| i);
        Self { entries, dim }
    }

    /// Number of non-zero entries. Zero means the text shares no term with
    /// the training vocabulary.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn entries(&self) -> &[(usize, f32)] {
        &self.entries
    }

    /// Dot product against a dense weight row.
    pub fn dot(&self, weights: &[f32]) -> f32 {
        self.entries
            .iter()
            .map(|&(i, v)| v * weights.get(i).copied().unwrap_or(0.0))
            .sum()
    }
}

/// Maps normalized text to a fixed-length sparse feature vector.
pub trait TextVectorizer: Send + Sync {
    fn vectorize(&self, text: &str) -> FeatureVector;
    /// Reverse vocabulary lookup for explainability output.
    fn term(&self, feature: usize) -> Option<&str>;
    fn num_features(&self) -> usize;
}

/// Maps a feature vector to a probability distribution over IPC sections.
/// The `weights` accessor exposes the learned per-class linear weight row;
/// it is what makes per-feature attribution well-defined.
pub trait SectionClassifier: Send + Sync {
    /// Probabilities aligned with `sections()` order (not sorted).
    fn distribution(&self, features: &FeatureVector) -> Result<Vec<f32>, ModelError>;
    /// Index of the single best class for this vector (raw argmax).
    fn predict(&self, features: &FeatureVector) -> Result<usize, ModelError>;
    fn sections(&self) -> &[String];
    fn weights(&self, class: usize) -> &[f32];
}

// Same token pattern the training-time vectorizer used: runs of two or more
// word characters.
static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("token regex"));

/// Pre-fitted TF-IDF vectorizer. Only the transform direction exists here;
/// fitting happens in the offline training job. Stop words were removed at
/// fit time, so the vocabulary already excludes them.
#[derive(Debug, Clone, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let v: TfidfVectorizer = serde_json::from_str(raw)?;
        if v.vocabulary.len() != v.idf.len() {
            anyhow::bail!(
                "vectorizer artifact inconsistent: {} vocabulary terms vs {} idf weights",
                v.vocabulary.len(),
                v.idf.len()
            );
        }
        let mut seen = vec![false; v.idf.len()];
        for (term, &idx) in &v.vocabulary {
            if idx >= v.idf.len() {
                anyhow::bail!("vectorizer artifact inconsistent: term `{term}` maps to index {idx} out of range");
            }
            if seen[idx] {
                anyhow::bail!("vectorizer artifact inconsistent: feature index {idx} is mapped by more than one term");
            }
            seen[idx] = true;
        }
        Ok(v)
    }

    #[cfg(test)]
    pub fn from_parts(vocabulary: HashMap<String, usize>, idf: Vec<f32>) -> Self {
        Self { vocabulary, idf }
    }
}

impl TextVectorizer for TfidfVectorizer {
    fn vectorize(&self, text: &str) -> FeatureVector {
        // Raw term counts over vocabulary hits.
        let mut counts: HashMap<usize, f32> = HashMap::new();
        for tok in TOKEN_PATTERN.find_iter(text) {
            if let Some(&idx) = self.vocabulary.get(tok.as_str()) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        // tf * idf, then L2 normalization (the fitted scheme).
        let mut entries: Vec<(usize, f32)> = counts
            .into_iter()
            .map(|(i, tf)| (i, tf * self.idf[i]))
            .collect();
        let norm = entries.iter().map(|&(_, v)| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for e in entries.iter_mut() {
                e.1 /= norm;
            }
        }
        FeatureVector::new(entries, self.idf.len())
    }

    fn term(&self, feature: usize) -> Option<&str> {
        self.vocabulary
            .iter()
            .find(|&(_, &idx)| idx == feature)
            .map(|(t, _)| t.as_str())
    }

    fn num_features(&self) -> usize {
        self.idf.len()
    }
}

/// Multinomial logistic regression over IPC sections: one dense weight row
/// and one intercept per class, softmax over the linear scores.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearClassifier {
    classes: Vec<String>,
    coef: Vec<Vec<f32>>,
    intercept: Vec<f32>,
}

impl LinearClassifier {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let c: LinearClassifier = serde_json::from_str(raw)?;
        if c.classes.is_empty() {
            anyhow::bail!("classifier artifact has no classes");
        }
        if c.coef.len() != c.classes.len() || c.intercept.len() != c.classes.len() {
            anyhow::bail!(
                "classifier artifact inconsistent: {} classes, {} weight rows, {} intercepts",
                c.classes.len(),
                c.coef.len(),
                c.intercept.len()
            );
        }
        let width = c.coef[0].len();
        if c.coef.iter().any(|row| row.len() != width) {
            anyhow::bail!("classifier artifact has ragged weight rows");
        }
        Ok(c)
    }

    #[cfg(test)]
    pub fn from_parts(classes: Vec<String>, coef: Vec<Vec<f32>>, intercept: Vec<f32>) -> Self {
        Self {
            classes,
            coef,
            intercept,
        }
    }

    fn scores(&self, features: &FeatureVector) -> Result<Vec<f32>, ModelError> {
        if self.classes.is_empty() {
            return Err(ModelError::NoClasses);
        }
        let expected = self.coef[0].len();
        if features.dim() != expected {
            return Err(ModelError::DimensionMismatch {
                got: features.dim(),
                expected,
            });
        }
        Ok(self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| features.dot(row) + b)
            .collect())
    }
}

impl SectionClassifier for LinearClassifier {
    fn distribution(&self, features: &FeatureVector) -> Result<Vec<f32>, ModelError> {
        let scores = self.scores(features)?;
        // Softmax with max-shift for numeric stability.
        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
        let sum: f32 = exps.iter().sum();
        Ok(exps.into_iter().map(|e| e / sum).collect())
    }

    fn predict(&self, features: &FeatureVector) -> Result<usize, ModelError> {
        let scores = self.scores(features)?;
        let mut best = 0;
        for (i, s) in scores.iter().enumerate() {
            if *s > scores[best] {
                best = i;
            }
        }
        Ok(best)
    }

    fn sections(&self) -> &[String] {
        &self.classes
    }

    fn weights(&self, class: usize) -> &[f32] {
        &self.coef[class]
    }
}

/// The pair of process-lifetime artifacts every request shares read-only.
pub struct ModelArtifacts {
    pub vectorizer: TfidfVectorizer,
    pub classifier: LinearClassifier,
}

impl ModelArtifacts {
    /// Load both artifacts from disk. Any failure here is fatal for the
    /// process; there is no degraded mode without a model.
    pub fn load(vectorizer_path: &Path, classifier_path: &Path) -> anyhow::Result<Self> {
        let vraw = fs::read_to_string(vectorizer_path).map_err(|e| {
            anyhow::anyhow!(
                "failed to read vectorizer artifact at {}: {}",
                vectorizer_path.display(),
                e
            )
        })?;
        let craw = fs::read_to_string(classifier_path).map_err(|e| {
            anyhow::anyhow!(
                "failed to read classifier artifact at {}: {}",
                classifier_path.display(),
                e
            )
        })?;
        let vectorizer = TfidfVectorizer::from_json(&vraw)?;
        let classifier = LinearClassifier::from_json(&craw)?;
        if classifier.coef[0].len() != vectorizer.num_features() {
            anyhow::bail!(
                "artifact mismatch: classifier expects {} features, vectorizer produces {}",
                classifier.coef[0].len(),
                vectorizer.num_features()
            );
        }
        Ok(Self {
            vectorizer,
            classifier,
        })
    }
}

#[cfg(test)]
pub mod test_support {
    //! Tiny hand-built artifacts shared by unit and integration tests.

    use super::*;

    /// Three-section toy model over a six-term vocabulary. Weights are laid
    /// out so "stolen"/"thief" pull towards 379, "robbery" towards 392, and
    /// "assault"/"attack" towards 351.
    pub fn toy_artifacts() -> ModelArtifacts {
        let vocabulary: HashMap<String, usize> = [
            ("stolen", 0),
            ("thief", 1),
            ("robbery", 2),
            ("assault", 3),
            ("attack", 4),
            ("station", 5),
        ]
        .into_iter()
        .map(|(t, i)| (t.to_string(), i))
        .collect();
        let idf = vec![1.2, 1.5, 1.8, 1.6, 1.4, 1.1];
        let vectorizer = TfidfVectorizer::from_parts(vocabulary, idf);

        let classes = vec!["379".to_string(), "392".to_string(), "351".to_string()];
        let coef = vec![
            vec![2.0, 1.8, -0.4, -0.6, -0.5, 0.1],
            vec![-0.3, -0.2, 2.2, -0.4, -0.3, 0.2],
            vec![-0.5, -0.4, -0.3, 2.1, 1.9, 0.0],
        ];
        let intercept = vec![0.1, 0.0, -0.1];
        let classifier = LinearClassifier::from_parts(classes, coef, intercept);

        ModelArtifacts {
            vectorizer,
            classifier,
        }
    }
}
