//! config.rs — analyzer configuration: TOML file with env overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config/analyzer.toml";
pub const ENV_CONFIG_PATH: &str = "FIR_ANALYZER_CONFIG";
pub const ENV_CONFIDENCE_THRESHOLD: &str = "FIR_CONFIDENCE_THRESHOLD";

fn default_threshold() -> f32 {
    crate::decision::DEFAULT_CONFIDENCE_THRESHOLD
}
fn default_top_k() -> usize {
    crate::decision::TOP_K
}
fn default_top_keywords() -> usize {
    crate::explain::DEFAULT_TOP_N
}
fn default_provider() -> String {
    "cli".to_string()
}
fn default_model() -> String {
    "llama3".to_string()
}
fn default_timeout_secs() -> u64 {
    crate::gateway::DEFAULT_TIMEOUT_SECS
}
fn default_endpoint() -> String {
    "http://127.0.0.1:11434".to_string()
}
fn default_classifier_path() -> PathBuf {
    PathBuf::from("models/ipc_classifier.json")
}
fn default_vectorizer_path() -> PathBuf {
    PathBuf::from("models/tfidf_vectorizer.json")
}
fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub confidence_threshold: f32,
    pub top_k: usize,
    pub top_keywords: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_threshold(),
            top_k: default_top_k(),
            top_keywords: default_top_keywords(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// "cli" | "http" | "disabled"
    pub provider: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Only used by the http provider.
    pub endpoint: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            endpoint: default_endpoint(),
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub classifier_path: PathBuf,
    pub vectorizer_path: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            classifier_path: default_classifier_path(),
            vectorizer_path: default_vectorizer_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub pipeline: PipelineConfig,
    pub gateway: GatewayConfig,
    pub artifacts: ArtifactConfig,
    pub server: ServerConfig,
}

// parse optional float env and clamp to 0.0..=1.0
fn parse_threshold_env(raw: Option<String>) -> Option<f32> {
    raw.and_then(|s| s.trim().parse::<f32>().ok())
        .map(|v| v.clamp(0.0, 1.0))
}

impl AnalyzerConfig {
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let mut cfg: AnalyzerConfig = toml::from_str(raw)?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("failed to read analyzer config at {}: {}", path.display(), e)
        })?;
        Self::from_toml_str(&raw)
    }

    /// Resolve the config path from the environment, fall back to defaults if
    /// the file is absent, then apply env overrides. Artifact-path problems
    /// surface later, at artifact load, where they are fatal.
    pub fn from_env() -> Self {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut cfg = Self::load_from_file(&path).unwrap_or_default();

        if let Some(t) = parse_threshold_env(std::env::var(ENV_CONFIDENCE_THRESHOLD).ok()) {
            cfg.pipeline.confidence_threshold = t;
        }
        cfg.sanitize();
        cfg
    }

    fn sanitize(&mut self) {
        if !self.pipeline.confidence_threshold.is_finite() {
            self.pipeline.confidence_threshold = default_threshold();
        }
        self.pipeline.confidence_threshold = self.pipeline.confidence_threshold.clamp(0.0, 1.0);
        if self.pipeline.top_k == 0 {
            self.pipeline.top_k = default_top_k();
        }
        if self.pipeline.top_keywords == 0 {
            self.pipeline.top_keywords = default_top_keywords();
        }
        self.gateway.provider = self.gateway.provider.to_lowercase();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_pipeline() {
        let cfg = AnalyzerConfig::default();
        assert!((cfg.pipeline.confidence_threshold - 0.30).abs() < 1e-6);
        assert_eq!(cfg.pipeline.top_k, 3);
        assert_eq!(cfg.pipeline.top_keywords, 5);
        assert_eq!(cfg.gateway.model, "llama3");
        assert_eq!(cfg.gateway.timeout_secs, 180);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg = AnalyzerConfig::from_toml_str(
            r#"
            [pipeline]
            confidence_threshold = 0.45

            [gateway]
            provider = "HTTP"
            "#,
        )
        .unwrap();
        assert!((cfg.pipeline.confidence_threshold - 0.45).abs() < 1e-6);
        assert_eq!(cfg.gateway.provider, "http");
        assert_eq!(cfg.pipeline.top_k, 3);
    }

    #[test]
    fn threshold_is_clamped_into_unit_interval() {
        let cfg = AnalyzerConfig::from_toml_str(
            r#"
            [pipeline]
            confidence_threshold = 7.5
            "#,
        )
        .unwrap();
        assert!((cfg.pipeline.confidence_threshold - 1.0).abs() < 1e-6);
    }

    #[test]
    fn threshold_env_parsing_clamps_and_rejects_garbage() {
        assert_eq!(parse_threshold_env(Some("0.4".into())), Some(0.4));
        assert_eq!(parse_threshold_env(Some("-3".into())), Some(0.0));
        assert_eq!(parse_threshold_env(Some("abc".into())), None);
        assert_eq!(parse_threshold_env(None), None);
    }
}
