//! Exact and near-duplicate keys for normalized transactions.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::normalize::NormalizedTransaction;

/// Deterministic exact-match dedup key.
///
/// Two [`NormalizedTransaction`] values produce the same fingerprint exactly
/// when `(date, amount, folded description, kind, folded card)` are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps a digest previously produced by [`fingerprint`], e.g. one read
    /// back from the ledger.
    #[must_use]
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the exact-duplicate key: a SHA-256 digest over the identity
/// fields, field-separated so adjacent values cannot collide.
#[must_use]
pub fn fingerprint(tx: &NormalizedTransaction) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(tx.date.format("%Y-%m-%d").to_string());
    hasher.update(b"|");
    hasher.update(tx.amount.cents().to_le_bytes());
    hasher.update(b"|");
    hasher.update(tx.folded_description());
    hasher.update(b"|");
    hasher.update(tx.kind.as_str());
    hasher.update(b"|");
    hasher.update(tx.folded_card());
    Fingerprint(hex::encode(hasher.finalize()))
}

/// Tunables for near-duplicate detection. The defaults are a reasonable
/// small window, not load-bearing constants.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    /// Maximum date distance, in days, for two records to be near-duplicates
    /// (also the ledger lookup window).
    pub date_window_days: i64,
    /// Minimum token-overlap ratio between folded descriptions.
    pub similarity_threshold: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            date_window_days: 1,
            similarity_threshold: 0.6,
        }
    }
}

/// Near-duplicate test: dates within the window, amounts equal to the cent,
/// folded descriptions overlapping above the threshold. Symmetric.
#[must_use]
pub fn similar(a: &NormalizedTransaction, b: &NormalizedTransaction, policy: &MatchPolicy) -> bool {
    (a.date - b.date).num_days().abs() <= policy.date_window_days
        && a.amount == b.amount
        && token_overlap(&a.folded_description(), &b.folded_description())
            >= policy.similarity_threshold
}

/// Jaccard overlap of the two token sets. Both-empty compares equal.
fn token_overlap(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<&str> = a.split_whitespace().collect();
    let tokens_b: HashSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }
    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    intersection as f64 / union as f64
}
