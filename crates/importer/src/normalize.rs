//! Canonicalization of provider candidates.
//!
//! Two candidates describing the same real-world transaction must normalize
//! to equal or near-equal [`NormalizedTransaction`] values; everything the
//! dedup passes compare flows through here first.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::{
    candidate::{CandidateTransaction, PaymentKind},
    error::NormalizationError,
    money::MoneyCents,
};

/// Canonical form of a candidate: comparable, storable.
///
/// The description keeps its original casing for storage; comparison uses
/// [`NormalizedTransaction::folded_description`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    pub description: String,
    /// Expenses positive, to the cent.
    pub amount: MoneyCents,
    /// Calendar date only; statements rarely carry a time of day.
    pub date: NaiveDate,
    pub kind: PaymentKind,
    pub card: Option<String>,
    pub category: Option<String>,
}

impl NormalizedTransaction {
    /// Comparison form of the description: NFKC, lowercased, punctuation
    /// stripped, whitespace collapsed.
    #[must_use]
    pub fn folded_description(&self) -> String {
        fold(&self.description)
    }

    /// Comparison form of the card name (empty when no card).
    #[must_use]
    pub fn folded_card(&self) -> String {
        self.card.as_deref().map(fold).unwrap_or_default()
    }
}

/// Canonicalizes one candidate, or reports why it cannot be.
///
/// Relative dates are anchored to the candidate's capture time. Failures are
/// recorded by the caller in the batch result; nothing is guessed silently.
pub fn normalize(
    candidate: &CandidateTransaction,
) -> Result<NormalizedTransaction, NormalizationError> {
    let anchor = candidate.provenance.captured_at.date_naive();

    let amount: MoneyCents = candidate.amount.parse()?;
    if !amount.is_positive() {
        return Err(NormalizationError::UnparsableAmount(format!(
            "{} (amount must be > 0)",
            candidate.amount.trim()
        )));
    }

    let date = parse_date(&candidate.date, anchor)?;

    Ok(NormalizedTransaction {
        description: collapse_whitespace(&candidate.description),
        amount,
        date,
        kind: candidate.kind,
        card: non_empty(candidate.card.as_deref()),
        category: non_empty(candidate.category.as_deref()),
    })
}

/// Folds text for comparison: NFKC normalization, lowercase, punctuation
/// replaced by spaces, whitespace runs collapsed.
#[must_use]
pub fn fold(text: &str) -> String {
    let normalized: String = text.nfkc().collect();
    let mut out = String::with_capacity(normalized.len());
    for c in normalized.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else {
            out.push(' ');
        }
    }
    collapse_whitespace(&out)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

/// Date formats tried verbatim, in order, before the numeric day/month logic.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%Y",
];

/// Parses a raw date string as extractors produce them.
///
/// Accepts ISO dates, `Jan 5, 2025` style text, relative `today`/`yesterday`
/// (anchored to `anchor`), and numeric day/month forms. A numeric form whose
/// day/month and month/day readings are both valid fails as ambiguous when
/// the two readings are more than one calendar day apart.
pub fn parse_date(raw: &str, anchor: NaiveDate) -> Result<NaiveDate, NormalizationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NormalizationError::UnparsableDate(String::new()));
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "today" => return Ok(anchor),
        "yesterday" => {
            return anchor
                .checked_sub_days(Days::new(1))
                .ok_or_else(|| NormalizationError::UnparsableDate(trimmed.to_string()));
        }
        _ => {}
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }

    parse_numeric_date(trimmed)
}

/// Numeric `a<sep>b<sep>year` dates, where `a`/`b` may be day/month in either
/// order depending on locale.
fn parse_numeric_date(raw: &str) -> Result<NaiveDate, NormalizationError> {
    let unparsable = || NormalizationError::UnparsableDate(raw.to_string());

    let parts: Vec<&str> = raw.split(['/', '-', '.']).map(str::trim).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(unparsable());
    }
    let numbers: Vec<u32> = parts
        .iter()
        .map(|p| p.parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|_| unparsable())?;

    let (a, b, year) = (numbers[0], numbers[1], numbers[2]);
    let year = match parts[2].len() {
        4 => year as i32,
        2 => 2000 + year as i32,
        _ => return Err(unparsable()),
    };

    let day_month = NaiveDate::from_ymd_opt(year, b, a);
    let month_day = NaiveDate::from_ymd_opt(year, a, b);

    match (day_month, month_day) {
        (Some(dm), Some(md)) => {
            // Both readings plausible; only accept when they agree to within
            // one calendar day, otherwise surface the ambiguity.
            if (dm - md).num_days().abs() <= 1 {
                Ok(dm)
            } else {
                Err(NormalizationError::AmbiguousDate(raw.to_string()))
            }
        }
        (Some(dm), None) => Ok(dm),
        (None, Some(md)) => Ok(md),
        (None, None) => Err(unparsable()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::candidate::Provenance;

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
    }

    fn candidate(description: &str, amount: &str, date: &str) -> CandidateTransaction {
        CandidateTransaction {
            description: description.to_string(),
            amount: amount.to_string(),
            date: date.to_string(),
            kind: PaymentKind::Card,
            card: None,
            category: None,
            provenance: Provenance {
                origin: "test".to_string(),
                provider: "test".to_string(),
                captured_at: Utc::now(),
            },
            confidence: 0.9,
        }
    }

    #[test]
    fn parses_iso_and_textual_dates() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(parse_date("2025-01-05", anchor()).unwrap(), date);
        assert_eq!(parse_date("2025/1/5", anchor()).unwrap(), date);
        assert_eq!(parse_date("Jan 5, 2025", anchor()).unwrap(), date);
        assert_eq!(parse_date("5 January 2025", anchor()).unwrap(), date);
        assert_eq!(parse_date("05-Jan-2025", anchor()).unwrap(), date);
    }

    #[test]
    fn parses_relative_dates_against_anchor() {
        assert_eq!(parse_date("today", anchor()).unwrap(), anchor());
        assert_eq!(
            parse_date("Yesterday", anchor()).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
        );
    }

    #[test]
    fn unambiguous_numeric_dates_resolve() {
        // Day 25 cannot be a month, so only one reading is valid.
        assert_eq!(
            parse_date("25/02/2025", anchor()).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 25).unwrap()
        );
        assert_eq!(
            parse_date("02/25/25", anchor()).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 25).unwrap()
        );
        // Equal day and month agree under both readings.
        assert_eq!(
            parse_date("04/04/2025", anchor()).unwrap(),
            NaiveDate::from_ymd_opt(2025, 4, 4).unwrap()
        );
    }

    #[test]
    fn ambiguous_numeric_date_is_surfaced() {
        assert_eq!(
            parse_date("03/04/2025", anchor()),
            Err(NormalizationError::AmbiguousDate("03/04/2025".to_string()))
        );
    }

    #[test]
    fn garbage_dates_are_unparsable() {
        assert!(matches!(
            parse_date("soon", anchor()),
            Err(NormalizationError::UnparsableDate(_))
        ));
        assert!(matches!(
            parse_date("13/13/2025", anchor()),
            Err(NormalizationError::UnparsableDate(_))
        ));
        assert!(matches!(
            parse_date("", anchor()),
            Err(NormalizationError::UnparsableDate(_))
        ));
    }

    #[test]
    fn folding_collapses_case_punctuation_and_whitespace() {
        assert_eq!(fold("  Coffee   SHOP "), "coffee shop");
        assert_eq!(fold("TESCO-STORE #44"), "tesco store 44");
        assert_eq!(fold("Caffè  Nero"), "caffè nero");
    }

    #[test]
    fn normalize_keeps_original_casing_and_trims() {
        let normalized = normalize(&candidate("  Coffee   Shop ", "5.50", "2025-01-10")).unwrap();
        assert_eq!(normalized.description, "Coffee Shop");
        assert_eq!(normalized.folded_description(), "coffee shop");
        assert_eq!(normalized.amount, MoneyCents::new(550));
    }

    #[test]
    fn normalize_rejects_zero_and_negative_amounts() {
        assert!(matches!(
            normalize(&candidate("x", "0.00", "2025-01-10")),
            Err(NormalizationError::UnparsableAmount(_))
        ));
        assert!(matches!(
            normalize(&candidate("x", "-4.00", "2025-01-10")),
            Err(NormalizationError::UnparsableAmount(_))
        ));
    }
}
