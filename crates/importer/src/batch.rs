//! The result surface of one import run.

use std::fmt;

use crate::{
    candidate::CandidateTransaction,
    error::NormalizationError,
    fingerprint::Fingerprint,
    ledger::LedgerTransaction,
};

/// What a rejected candidate matched against.
#[derive(Clone, Debug)]
pub enum MatchedEntry {
    /// An earlier candidate in the same batch (first-seen wins).
    Batch {
        origin: String,
        fingerprint: Fingerprint,
    },
    /// A record already persisted in the ledger.
    Ledger(LedgerTransaction),
}

impl fmt::Display for MatchedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Batch { origin, .. } => write!(f, "earlier candidate from {origin}"),
            Self::Ledger(tx) => {
                write!(f, "ledger entry {} ({} on {})", tx.id, tx.amount, tx.date)
            }
        }
    }
}

/// Why a candidate was not imported.
#[derive(Clone, Debug)]
pub enum RejectReason {
    /// Identical fingerprint. Always rejected.
    ExactDuplicate(MatchedEntry),
    /// Same amount, close date, similar description. Rejected by default but
    /// kept here for user review; may be a legitimate distinct transaction.
    NearDuplicate(MatchedEntry),
    Normalization(NormalizationError),
    /// Provider confidence below the configured floor; treated as malformed
    /// extraction output.
    LowConfidence { confidence: f64, floor: f64 },
    /// The ledger refused the insert (constraint, concurrent duplicate).
    LedgerRejected(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExactDuplicate(matched) => write!(f, "exact duplicate of {matched}"),
            Self::NearDuplicate(matched) => write!(f, "near duplicate of {matched}"),
            Self::Normalization(err) => write!(f, "{err}"),
            Self::LowConfidence { confidence, floor } => {
                write!(f, "confidence {confidence:.2} below floor {floor:.2}")
            }
            Self::LedgerRejected(message) => write!(f, "ledger rejected insert: {message}"),
        }
    }
}

/// A candidate that did not reach the ledger, with the reason, for review.
#[derive(Clone, Debug)]
pub struct RejectedCandidate {
    pub candidate: CandidateTransaction,
    pub reason: RejectReason,
}

/// A source unit that produced no candidates because reading or extraction
/// failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitError {
    pub origin: String,
    pub message: String,
}

/// Summary of one import run. Finalized when the batch ends, never mutated
/// afterward; every failure along the way is recorded here instead of being
/// thrown past the batch boundary.
#[derive(Clone, Debug, Default)]
pub struct ImportBatchResult {
    /// Candidates produced by extraction across all readable units.
    pub extracted: usize,
    pub normalized_ok: usize,
    pub normalization_failed: usize,
    /// Candidates committed to the ledger.
    pub imported: usize,
    /// Exact and near duplicates, intra-batch and against the ledger.
    pub duplicates: usize,
    /// Unit failures, low-confidence drops and refused inserts.
    pub errors: usize,
    /// Rejected candidates in pipeline order, with reasons.
    pub rejected: Vec<RejectedCandidate>,
    /// Units that were skipped outright.
    pub unit_errors: Vec<UnitError>,
    /// Batch-level conditions (e.g. provider went down mid-batch).
    pub warnings: Vec<String>,
}

impl ImportBatchResult {
    pub(crate) fn record_unit_error(&mut self, origin: impl Into<String>, message: impl Into<String>) {
        self.errors += 1;
        self.unit_errors.push(UnitError {
            origin: origin.into(),
            message: message.into(),
        });
    }

    pub(crate) fn record_rejection(&mut self, candidate: CandidateTransaction, reason: RejectReason) {
        match &reason {
            RejectReason::ExactDuplicate(_) | RejectReason::NearDuplicate(_) => {
                self.duplicates += 1;
            }
            RejectReason::Normalization(_) => self.normalization_failed += 1,
            RejectReason::LowConfidence { .. } | RejectReason::LedgerRejected(_) => {
                self.errors += 1;
            }
        }
        self.rejected.push(RejectedCandidate { candidate, reason });
    }
}

impl fmt::Display for ImportBatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "extracted {}, imported {}, duplicates {}, normalization failures {}, errors {}",
            self.extracted, self.imported, self.duplicates, self.normalization_failed, self.errors
        )
    }
}
