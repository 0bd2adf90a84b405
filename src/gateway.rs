//! gateway.rs — LLM gateway: provider abstraction over a local Ollama backend.
//!
//! The pipeline only needs "submit a prompt, receive a completion, or receive
//! a typed error". Failures are typed internally and flattened to a
//! marker-prefixed string (`"Ollama Error: ..."`) at the engine boundary,
//! because narration is best-effort commentary: one failed sub-call must not
//! invalidate the quality score, keywords, or ML predictions. No retries at
//! this layer.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Prefix every flattened failure string carries. Consumers treat such
/// strings as opaque narration text and pass them through.
pub const ERROR_MARKER: &str = "Ollama Error:";

/// Default per-call timeout. Local model inference is slow; the original
/// system waited up to three minutes per call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("ollama backend not found")]
    BackendMissing,
    #[error("ollama exited with {status}: {stderr}")]
    NonZeroExit { status: i32, stderr: String },
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("http failure: {0}")]
    Http(#[from] reqwest::Error),
    #[error("response decoding failed: {0}")]
    Decode(String),
}

/// Synchronous text-in/text-out capability with failure signaling.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn submit(&self, prompt: &str) -> Result<String, GatewayError>;
    /// Backend name for diagnostics.
    fn backend_name(&self) -> &'static str;
}

/// Flatten a gateway result into the narration string the response carries.
pub fn flatten(result: Result<String, GatewayError>) -> String {
    match result {
        Ok(text) => text,
        Err(e) => format!("{ERROR_MARKER} {e}"),
    }
}

/// True if a narration field carries a flattened failure.
pub fn is_error_marked(text: &str) -> bool {
    text.starts_with(ERROR_MARKER)
}

// ------------------------------------------------------------
// CLI provider (default): `ollama run <model>` as a child process
// ------------------------------------------------------------

/// Runs the local `ollama` CLI per call. The prompt goes in over stdin to
/// keep arbitrarily long FIR text off the argv.
pub struct OllamaCliGateway {
    model: String,
    timeout: Duration,
}

impl OllamaCliGateway {
    pub fn new(model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            model: model.into(),
            timeout,
        }
    }
}

#[async_trait]
impl LlmGateway for OllamaCliGateway {
    async fn submit(&self, prompt: &str) -> Result<String, GatewayError> {
        let mut child = Command::new("ollama")
            .arg("run")
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GatewayError::BackendMissing
                } else {
                    GatewayError::Io(e)
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes()).await?;
            // Close stdin so the CLI knows the prompt is complete.
            drop(stdin);
        }

        let secs = self.timeout.as_secs();
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| GatewayError::Timeout { secs })??;

        if !output.status.success() {
            return Err(GatewayError::NonZeroExit {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn backend_name(&self) -> &'static str {
        "ollama-cli"
    }
}

// ------------------------------------------------------------
// HTTP provider: Ollama REST API (/api/generate)
// ------------------------------------------------------------

pub struct OllamaHttpGateway {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaHttpGateway {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Self {
            http,
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl LlmGateway for OllamaHttpGateway {
    async fn submit(&self, prompt: &str) -> Result<String, GatewayError> {
        let url = format!("{}/api/generate", self.endpoint.trim_end_matches('/'));
        let resp = self
            .http
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(GatewayError::Decode(format!(
                "backend returned {}",
                resp.status()
            )));
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(body.response.trim().to_string())
    }

    fn backend_name(&self) -> &'static str {
        "ollama-http"
    }
}

// ------------------------------------------------------------
// Disabled + test doubles
// ------------------------------------------------------------

/// Always fails with `BackendMissing`; used when no LLM backend is
/// configured. Narration fields then carry the error marker.
pub struct DisabledGateway;

#[async_trait]
impl LlmGateway for DisabledGateway {
    async fn submit(&self, _prompt: &str) -> Result<String, GatewayError> {
        Err(GatewayError::BackendMissing)
    }

    fn backend_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic gateway for tests: echoes a fixed reply.
pub struct FixedGateway {
    pub reply: String,
}

#[async_trait]
impl LlmGateway for FixedGateway {
    async fn submit(&self, _prompt: &str) -> Result<String, GatewayError> {
        Ok(self.reply.clone())
    }

    fn backend_name(&self) -> &'static str {
        "fixed"
    }
}

/// Always-failing gateway for failure-injection tests.
pub struct FailingGateway;

#[async_trait]
impl LlmGateway for FailingGateway {
    async fn submit(&self, _prompt: &str) -> Result<String, GatewayError> {
        Err(GatewayError::Timeout {
            secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_passes_successful_text_through() {
        assert_eq!(flatten(Ok("IPC 379 applies.".to_string())), "IPC 379 applies.");
    }

    #[test]
    fn flatten_prefixes_failures_with_the_marker() {
        let s = flatten(Err(GatewayError::Timeout { secs: 180 }));
        assert!(s.starts_with(ERROR_MARKER));
        assert!(is_error_marked(&s));
        assert!(s.contains("180"));
    }

    #[tokio::test]
    async fn disabled_gateway_reports_backend_missing() {
        let g = DisabledGateway;
        let err = g.submit("anything").await.unwrap_err();
        assert!(matches!(err, GatewayError::BackendMissing));
        assert!(flatten(Err(err)).contains("not found"));
    }

    #[tokio::test]
    async fn fixed_gateway_is_deterministic() {
        let g = FixedGateway {
            reply: "Severity: Low".to_string(),
        };
        assert_eq!(g.submit("p").await.unwrap(), "Severity: Low");
        assert_eq!(g.submit("q").await.unwrap(), "Severity: Low");
    }
}
