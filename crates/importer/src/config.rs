//! Pipeline configuration.
//!
//! Everything heuristic about dedup (window, similarity threshold,
//! confidence floor) lives here rather than in constants, and the extraction
//! provider is selected by configuration, not by code.

use serde::Deserialize;

use crate::fingerprint::MatchPolicy;

/// Which extraction provider to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    RemoteLlm,
    LocalLlm,
    /// No-external-dependency fallback; lowest confidence.
    #[default]
    Ocr,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RemoteLlm => "remote-llm",
            Self::LocalLlm => "local-llm",
            Self::Ocr => "ocr",
        }
    }
}

impl TryFrom<&str> for ProviderKind {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "remote-llm" => Ok(Self::RemoteLlm),
            "local-llm" => Ok(Self::LocalLlm),
            "ocr" => Ok(Self::Ocr),
            other => Err(format!("invalid provider kind: {other}")),
        }
    }
}

/// Provider selection and transport parameters.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// API key for the remote provider.
    pub api_key: Option<String>,
    /// Base URL override (remote) or model-server URL (local).
    pub endpoint: Option<String>,
    pub model: Option<String>,
    /// Whether the local model accepts direct image input.
    pub multimodal: bool,
    /// Per-call timeout; one retry on transient failure, none on malformed
    /// output.
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    #[must_use]
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(Self::DEFAULT_TIMEOUT_SECS)
    }
}

/// Full pipeline configuration for one import run.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub provider: ProviderConfig,
    pub policy: MatchPolicy,
    /// Candidates below this confidence are recorded as errors, never
    /// imported.
    pub min_confidence: f64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            policy: MatchPolicy::default(),
            min_confidence: 0.2,
        }
    }
}
