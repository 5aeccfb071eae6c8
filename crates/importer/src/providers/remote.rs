//! Hosted-LLM extraction over the Anthropic messages API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    candidate::CandidateTransaction,
    config::ProviderConfig,
    error::ProviderError,
    source::{RawPayload, RawUnit},
};

use super::{
    ExtractionProvider, extraction_prompt, ocr, parse_candidates, strict_extraction_prompt,
};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Applied when the model does not score its own records.
const DEFAULT_CONFIDENCE: f64 = 0.85;

pub struct RemoteLlmProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl RemoteLlmProvider {
    /// The HTTP client is scoped to this provider instance (one coordinator
    /// invocation), not shared process-wide.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::Unavailable("remote-llm requires an api key".to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs()))
            .build()
            .map_err(|err| ProviderError::Unavailable(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: 2048,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!(
                "{}/v1/messages",
                self.base_url.trim_end_matches('/')
            ))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|err| ProviderError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Unavailable(format!(
                "{status}: {}",
                body.trim()
            )));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Unavailable(format!("unexpected response body: {err}")))?;
        Ok(body
            .content
            .into_iter()
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Text of the unit; image units go through OCR first, the model then
    /// extracts from the recognized text.
    async fn unit_text(&self, unit: &RawUnit) -> Result<String, ProviderError> {
        match &unit.payload {
            RawPayload::Text(text) => Ok(text.clone()),
            RawPayload::Image(bytes) => ocr::tesseract_text(bytes).await,
        }
    }
}

#[async_trait]
impl ExtractionProvider for RemoteLlmProvider {
    fn name(&self) -> &'static str {
        "remote-llm"
    }

    async fn extract(&self, unit: &RawUnit) -> Result<Vec<CandidateTransaction>, ProviderError> {
        let text = self.unit_text(unit).await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let response = self.complete(&extraction_prompt(&text, unit.kind)).await?;
        match parse_candidates(&response, unit, self.name(), DEFAULT_CONFIDENCE) {
            Ok(candidates) => Ok(candidates),
            Err(ProviderError::Malformed(first)) => {
                tracing::warn!(origin = %unit.origin, error = %first, "retrying with stricter prompt");
                let response = self
                    .complete(&strict_extraction_prompt(&text, unit.kind))
                    .await?;
                parse_candidates(&response, unit, self.name(), DEFAULT_CONFIDENCE)
            }
            Err(err) => Err(err),
        }
    }
}
