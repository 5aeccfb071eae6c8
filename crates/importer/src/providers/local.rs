//! Locally hosted LLM extraction over an OpenAI-compatible API
//! (LM Studio and friends).

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::{
    candidate::CandidateTransaction,
    config::ProviderConfig,
    error::ProviderError,
    source::{RawPayload, RawUnit},
};

use super::{
    ExtractionProvider, extraction_prompt, image_extraction_prompt, ocr, parse_candidates,
    strict_extraction_prompt,
};

const DEFAULT_BASE_URL: &str = "http://localhost:1234/v1";
const DEFAULT_MODEL: &str = "local-model";
/// Local models score a bit below the hosted provider by default.
const DEFAULT_CONFIDENCE: f64 = 0.75;

pub struct LocalLlmProvider {
    client: Client,
    base_url: String,
    model: String,
    multimodal: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

impl LocalLlmProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
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
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            multimodal: config.multimodal,
        })
    }

    async fn complete(&self, content: serde_json::Value) -> Result<String, ProviderError> {
        let request = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": content}],
            // Low temperature for consistent extraction.
            "temperature": 0.1,
            "max_tokens": 2048,
        });

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.base_url.trim_end_matches('/')
            ))
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                ProviderError::Unavailable(format!(
                    "model server unreachable at {}: {err}",
                    self.base_url
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Unavailable(format!(
                "{status}: {}",
                body.trim()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Unavailable(format!("unexpected response body: {err}")))?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default())
    }

    fn image_content(prompt: &str, png: &[u8]) -> serde_json::Value {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png);
        json!([
            {"type": "text", "text": prompt},
            {"type": "image_url", "image_url": {"url": format!("data:image/png;base64,{encoded}")}},
        ])
    }
}

#[async_trait]
impl ExtractionProvider for LocalLlmProvider {
    fn name(&self) -> &'static str {
        "local-llm"
    }

    fn multimodal(&self) -> bool {
        self.multimodal
    }

    async fn extract(&self, unit: &RawUnit) -> Result<Vec<CandidateTransaction>, ProviderError> {
        // Multimodal models take the image directly; otherwise images fall
        // back to OCR text like every other unit.
        let (content, strict_content) = match &unit.payload {
            RawPayload::Image(bytes) if self.multimodal => {
                let prompt = image_extraction_prompt();
                (
                    Self::image_content(&prompt, bytes),
                    Self::image_content(&prompt, bytes),
                )
            }
            payload => {
                let text = match payload {
                    RawPayload::Text(text) => text.clone(),
                    RawPayload::Image(bytes) => ocr::tesseract_text(bytes).await?,
                };
                if text.trim().is_empty() {
                    return Ok(Vec::new());
                }
                (
                    json!(extraction_prompt(&text, unit.kind)),
                    json!(strict_extraction_prompt(&text, unit.kind)),
                )
            }
        };

        let response = self.complete(content).await?;
        match parse_candidates(&response, unit, self.name(), DEFAULT_CONFIDENCE) {
            Ok(candidates) => Ok(candidates),
            Err(ProviderError::Malformed(first)) => {
                tracing::warn!(origin = %unit.origin, error = %first, "retrying with stricter prompt");
                let response = self.complete(strict_content).await?;
                parse_candidates(&response, unit, self.name(), DEFAULT_CONFIDENCE)
            }
            Err(err) => Err(err),
        }
    }
}
