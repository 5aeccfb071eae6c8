//! Polymorphic extraction providers.
//!
//! One interface, one method: [`ExtractionProvider::extract`] turns a
//! [`RawUnit`] into candidate transactions. Implementations are selected by
//! configuration, never by inheritance. "No transactions found" is an empty
//! list, not an error; errors mean the provider itself failed.

mod local;
mod ocr;
mod remote;

use async_trait::async_trait;
use serde::Deserialize;

pub use local::LocalLlmProvider;
pub use ocr::OcrProvider;
pub use remote::RemoteLlmProvider;

use crate::{
    candidate::{CandidateTransaction, PaymentKind, Provenance},
    config::{ProviderConfig, ProviderKind},
    error::ProviderError,
    source::{RawUnit, SourceKind},
};

#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// True when the provider consumes image payloads directly; the image
    /// reader letterboxes to the model resolution only in that case.
    fn multimodal(&self) -> bool {
        false
    }

    /// Extracts candidates from one unit. Fails only on provider
    /// unavailability or non-conforming output, never on "nothing found".
    async fn extract(&self, unit: &RawUnit) -> Result<Vec<CandidateTransaction>, ProviderError>;
}

/// Builds the provider the configuration selects.
pub fn build(config: &ProviderConfig) -> Result<Box<dyn ExtractionProvider>, ProviderError> {
    Ok(match config.kind {
        ProviderKind::RemoteLlm => Box::new(RemoteLlmProvider::new(config)?),
        ProviderKind::LocalLlm => Box::new(LocalLlmProvider::new(config)?),
        ProviderKind::Ocr => Box::new(OcrProvider::new()),
    })
}

fn source_context(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Pdf => "bank or card statement",
        SourceKind::Image => "receipt",
        SourceKind::Email => "transaction notification email",
    }
}

/// The structured-output request both LLM providers send.
pub(crate) fn extraction_prompt(text: &str, kind: SourceKind) -> String {
    format!(
        r#"Extract all financial transactions from the following {context}.

For each transaction provide:
- description: brief description of the transaction
- amount: transaction amount (positive number)
- date: transaction date (YYYY-MM-DD, or as printed)
- type: "card" or "cash"
- card: card name or last 4 digits if mentioned (optional)
- category: e.g. "Food", "Transport", "Entertainment" (optional)
- confidence: your confidence in this record, 0.0 to 1.0 (optional)

Return ONLY a JSON array of transactions, no additional text. Example:
[
  {{"description": "Coffee at Starbucks", "amount": 5.50, "date": "2025-10-11", "type": "card", "card": "Visa", "category": "Food"}}
]

Text to analyze:
{text}

Return the JSON array:"#,
        context = source_context(kind)
    )
}

/// Retry prompt after non-conforming output: same request, harder framing.
pub(crate) fn strict_extraction_prompt(text: &str, kind: SourceKind) -> String {
    format!(
        "{}\n\nIMPORTANT: your previous answer was not a valid JSON array. \
         Respond with a syntactically valid JSON array and nothing else: \
         no markdown, no explanations, no trailing text.",
        extraction_prompt(text, kind)
    )
}

/// Prompt for direct multimodal image analysis.
pub(crate) fn image_extraction_prompt() -> String {
    r#"Analyze this receipt or statement image and extract all financial transactions.

For each transaction provide:
- description: brief description of the transaction
- amount: transaction amount (positive number)
- date: transaction date (YYYY-MM-DD, or as printed)
- type: "card" or "cash"
- card: card name or last 4 digits if mentioned (optional)
- category: e.g. "Food", "Transport", "Entertainment" (optional)
- confidence: your confidence in this record, 0.0 to 1.0 (optional)

IMPORTANT: return ONLY a valid JSON array. No explanations, no markdown.

JSON array:"#
        .to_string()
}

/// One record as LLM providers emit it.
#[derive(Debug, Deserialize)]
struct WireCandidate {
    description: String,
    amount: serde_json::Value,
    #[serde(default)]
    date: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    card: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Parses a model response into candidates.
///
/// Tolerates prose around the array (everything outside the outermost
/// `[...]` is ignored, as models love to narrate); anything else
/// non-conforming is [`ProviderError::Malformed`].
pub(crate) fn parse_candidates(
    response: &str,
    unit: &RawUnit,
    provider: &'static str,
    default_confidence: f64,
) -> Result<Vec<CandidateTransaction>, ProviderError> {
    let start = response
        .find('[')
        .ok_or_else(|| ProviderError::Malformed("no JSON array in response".to_string()))?;
    let end = response
        .rfind(']')
        .filter(|end| *end > start)
        .ok_or_else(|| ProviderError::Malformed("unterminated JSON array".to_string()))?;

    let records: Vec<WireCandidate> = serde_json::from_str(&response[start..=end])
        .map_err(|err| ProviderError::Malformed(format!("response is not a candidate array: {err}")))?;

    Ok(records
        .into_iter()
        .map(|record| {
            let amount = match record.amount {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            let kind = record
                .kind
                .as_deref()
                .and_then(|k| PaymentKind::try_from(k).ok())
                .unwrap_or_default();
            CandidateTransaction {
                description: record.description,
                amount,
                date: record.date,
                kind,
                card: record.card.filter(|c| !c.trim().is_empty()),
                category: record.category.filter(|c| !c.trim().is_empty()),
                provenance: Provenance::of(unit, provider),
                confidence: record
                    .confidence
                    .map_or(default_confidence, |c| c.clamp(0.0, 1.0)),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> RawUnit {
        RawUnit::text(SourceKind::Pdf, "statement.pdf#page=1", "irrelevant")
    }

    #[test]
    fn parses_array_surrounded_by_prose() {
        let response = r#"Here are the transactions:
[{"description": "Coffee", "amount": 5.5, "date": "2025-01-10", "type": "card"}]
Let me know if you need anything else."#;

        let candidates = parse_candidates(response, &unit(), "test", 0.8).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].description, "Coffee");
        assert_eq!(candidates[0].amount, "5.5");
        assert_eq!(candidates[0].kind, PaymentKind::Card);
        assert_eq!(candidates[0].confidence, 0.8);
    }

    #[test]
    fn string_amounts_and_explicit_confidence_survive() {
        let response =
            r#"[{"description": "Taxi", "amount": "12,50", "date": "11/01/2025", "confidence": 0.4}]"#;

        let candidates = parse_candidates(response, &unit(), "test", 0.8).unwrap();
        assert_eq!(candidates[0].amount, "12,50");
        assert_eq!(candidates[0].confidence, 0.4);
    }

    #[test]
    fn empty_array_means_no_transactions() {
        let candidates = parse_candidates("[]", &unit(), "test", 0.8).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn prose_without_array_is_malformed() {
        let err = parse_candidates("I could not find any transactions.", &unit(), "test", 0.8)
            .unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }
}
