//! Provider-proposed transactions, before normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::RawUnit;

/// How a transaction was paid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Cash,
    /// Statement sources overwhelmingly describe card transactions, so this
    /// is the default when a provider does not say.
    #[default]
    Card,
}

impl PaymentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
        }
    }
}

impl TryFrom<&str> for PaymentKind {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            other => Err(format!("invalid payment kind: {other}")),
        }
    }
}

/// Where a candidate came from: the source unit and the provider that
/// proposed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Provenance {
    pub origin: String,
    pub provider: String,
    /// When the source unit was captured; anchors relative dates like
    /// "yesterday" during normalization.
    pub captured_at: DateTime<Utc>,
}

impl Provenance {
    pub fn of(unit: &RawUnit, provider: impl Into<String>) -> Self {
        Self {
            origin: unit.origin.clone(),
            provider: provider.into(),
            captured_at: unit.captured_at,
        }
    }
}

/// An extraction provider's proposed transaction. Raw fields are kept as the
/// provider produced them; the normalizer is the only component that
/// interprets them.
#[derive(Clone, Debug)]
pub struct CandidateTransaction {
    pub description: String,
    pub amount: String,
    pub date: String,
    pub kind: PaymentKind,
    pub card: Option<String>,
    pub category: Option<String>,
    pub provenance: Provenance,
    /// Provider-defined confidence in `[0.0, 1.0]`. Never assumed to be 1.0.
    pub confidence: f64,
}
