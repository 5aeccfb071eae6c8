//! OCR + heuristic extraction: the no-external-dependency fallback.
//!
//! Optical recognition shells out to the `tesseract` executable; candidate
//! assembly is regex and line heuristics. Confidence is accordingly low.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use uuid::Uuid;

use crate::{
    candidate::{CandidateTransaction, PaymentKind, Provenance},
    error::ProviderError,
    money::MoneyCents,
    source::{RawPayload, RawUnit},
};

use super::ExtractionProvider;

/// Heuristic extraction never deserves much trust.
const DEFAULT_CONFIDENCE: f64 = 0.4;
/// A single-candidate receipt guess with no clear total marker gets less.
const WEAK_CONFIDENCE: f64 = 0.3;

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[$€£]?\s*\d{1,3}(?:[.,]\d{3})*[.,]\d{2}\b").expect("hardcoded regex")
    })
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)
            \b\d{4}[-/.]\d{1,2}[-/.]\d{1,2}\b
            | \b\d{1,2}[-/.]\d{1,2}[-/.]\d{2,4}\b
            | \b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+\d{1,2},?\s+\d{4}\b",
        )
        .expect("hardcoded regex")
    })
}

fn card_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)card\s+(?:ending\s+(?:in\s+)?)?[*x]*\s*(\d{4})").expect("hardcoded regex")
    })
}

fn total_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:total|amount\s+due|balance\s+due)\b").expect("hardcoded regex"))
}

pub struct OcrProvider;

impl OcrProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OcrProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExtractionProvider for OcrProvider {
    fn name(&self) -> &'static str {
        "ocr"
    }

    async fn extract(&self, unit: &RawUnit) -> Result<Vec<CandidateTransaction>, ProviderError> {
        let text = match &unit.payload {
            RawPayload::Text(text) => text.clone(),
            RawPayload::Image(bytes) => tesseract_text(bytes).await?,
        };
        Ok(heuristic_candidates(&text, unit, self.name()))
    }
}

/// Runs the `tesseract` binary over PNG bytes staged in a temp file.
///
/// A missing binary is provider unavailability; a failed run on a readable
/// image is malformed output for that unit.
pub(crate) async fn tesseract_text(png: &[u8]) -> Result<String, ProviderError> {
    let path = std::env::temp_dir().join(format!("ocr-{}.png", Uuid::new_v4()));
    tokio::fs::write(&path, png)
        .await
        .map_err(|err| ProviderError::Unavailable(format!("failed to stage ocr input: {err}")))?;

    let output = tokio::process::Command::new("tesseract")
        .arg(&path)
        .arg("stdout")
        .kill_on_drop(true)
        .output()
        .await;
    let _ = tokio::fs::remove_file(&path).await;

    let output = output.map_err(|err| {
        ProviderError::Unavailable(format!("tesseract is not runnable: {err}"))
    })?;
    if !output.status.success() {
        return Err(ProviderError::Malformed(format!(
            "tesseract failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Assembles candidates from recognized text.
///
/// Statement-shaped lines (date and amount on the same line) become one
/// candidate each. Failing that, the text is treated as a single receipt:
/// merchant line, total line, any date found.
fn heuristic_candidates(
    text: &str,
    unit: &RawUnit,
    provider: &'static str,
) -> Vec<CandidateTransaction> {
    let rows: Vec<CandidateTransaction> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| row_candidate(line, unit, provider))
        .collect();
    if !rows.is_empty() {
        return rows;
    }

    receipt_candidate(text, unit, provider).into_iter().collect()
}

/// A statement row: date and amount in one line, the rest is description.
fn row_candidate(
    line: &str,
    unit: &RawUnit,
    provider: &'static str,
) -> Option<CandidateTransaction> {
    let date = date_re().find(line)?;
    // The rightmost amount on the line is the transaction amount; earlier
    // ones tend to be unit prices or balances. Matches inside the date
    // itself (dotted dates look like amounts) don't count.
    let amount = amount_re()
        .find_iter(line)
        .filter(|m| m.start() >= date.end() || m.end() <= date.start())
        .last()?;

    let mut description = String::new();
    for (index, c) in line.char_indices() {
        if date.range().contains(&index) || amount.range().contains(&index) {
            continue;
        }
        description.push(c);
    }
    let description = description.trim_matches(|c: char| c.is_whitespace() || c == '-' || c == '|');
    if description.chars().filter(|c| c.is_alphabetic()).count() < 3 {
        return None;
    }

    Some(candidate(
        description,
        amount.as_str(),
        date.as_str(),
        line,
        unit,
        provider,
        DEFAULT_CONFIDENCE,
    ))
}

/// Receipt fallback: one candidate for the whole unit, if a plausible total
/// exists.
fn receipt_candidate(
    text: &str,
    unit: &RawUnit,
    provider: &'static str,
) -> Option<CandidateTransaction> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let total_line = lines
        .iter()
        .find(|line| total_marker_re().is_match(line) && amount_re().is_match(line));
    let (amount, confidence) = match total_line {
        Some(line) => {
            let m = amount_re().find_iter(line).last()?;
            (m.as_str().to_string(), DEFAULT_CONFIDENCE)
        }
        // No explicit total: take the largest amount on the receipt, with
        // even less conviction.
        None => {
            let amount = lines
                .iter()
                .flat_map(|line| amount_re().find_iter(line))
                .map(|m| m.as_str().to_string())
                .max_by_key(|raw| raw.parse::<MoneyCents>().map(|m| m.cents()).unwrap_or(0))?;
            (amount, WEAK_CONFIDENCE)
        }
    };

    let merchant = lines
        .iter()
        .find(|line| {
            line.chars().filter(|c| c.is_alphabetic()).count() >= 3
                && !total_marker_re().is_match(line)
                && !amount_re().is_match(line)
                && !date_re().is_match(line)
        })
        .copied()
        .unwrap_or("Unknown merchant");

    let date = date_re()
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    Some(candidate(
        merchant, &amount, &date, text, unit, provider, confidence,
    ))
}

fn candidate(
    description: &str,
    amount: &str,
    date: &str,
    context: &str,
    unit: &RawUnit,
    provider: &'static str,
    confidence: f64,
) -> CandidateTransaction {
    let lowered = context.to_lowercase();
    let kind = if lowered.contains("cash") {
        PaymentKind::Cash
    } else {
        PaymentKind::Card
    };
    let card = card_re()
        .captures(context)
        .map(|captures| format!("card {}", &captures[1]));

    CandidateTransaction {
        description: description.to_string(),
        amount: amount.to_string(),
        date: date.to_string(),
        kind,
        card,
        category: None,
        provenance: Provenance::of(unit, provider),
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceKind;

    fn unit(text: &str) -> RawUnit {
        RawUnit::text(SourceKind::Pdf, "statement.pdf#page=1", text)
    }

    #[test]
    fn statement_rows_become_one_candidate_each() {
        let text = "Date        Description          Amount\n\
                    2025-01-10  COFFEE SHOP LONDON   5.50\n\
                    2025-01-11  TESCO STORE 44       23.10\n";
        let candidates = heuristic_candidates(text, &unit(text), "ocr");

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].date, "2025-01-10");
        assert_eq!(candidates[0].amount, "5.50");
        assert!(candidates[0].description.contains("COFFEE SHOP"));
        assert_eq!(candidates[1].amount, "23.10");
    }

    #[test]
    fn receipt_prefers_the_total_line() {
        let text = "CORNER BAKERY\n\
                    2 x Croissant  3.80\n\
                    Espresso       1.70\n\
                    TOTAL          5.50\n\
                    2025-01-10 card ending 1234\n";
        let candidates = heuristic_candidates(text, &unit(text), "ocr");

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].amount, "5.50");
        assert_eq!(candidates[0].description, "CORNER BAKERY");
        assert_eq!(candidates[0].date, "2025-01-10");
        assert_eq!(candidates[0].card.as_deref(), Some("card 1234"));
        assert_eq!(candidates[0].confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn no_amounts_means_no_candidates() {
        let text = "Thank you for shopping with us!";
        assert!(heuristic_candidates(text, &unit(text), "ocr").is_empty());
    }
}
