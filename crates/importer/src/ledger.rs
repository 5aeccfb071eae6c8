//! The ledger boundary.
//!
//! The ledger's CRUD engine is an external collaborator; the pipeline only
//! needs a date-window lookup for the dedup pass and an insert-only commit
//! path. Both sit behind [`LedgerStore`] so storage stays replaceable (and
//! mockable in tests).

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    candidate::{PaymentKind, Provenance},
    error::LedgerError,
    fingerprint::Fingerprint,
    money::MoneyCents,
    normalize::NormalizedTransaction,
};

/// A persisted ledger record, as seen by the dedup pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: Uuid,
    pub date: NaiveDate,
    pub amount: MoneyCents,
    pub description: String,
    pub kind: PaymentKind,
    pub card: Option<String>,
    pub fingerprint: Fingerprint,
}

impl LedgerTransaction {
    /// View of the record in the shape the similarity check compares.
    #[must_use]
    pub fn as_normalized(&self) -> NormalizedTransaction {
        NormalizedTransaction {
            description: self.description.clone(),
            amount: self.amount,
            date: self.date,
            kind: self.kind,
            card: self.card.clone(),
            category: None,
        }
    }
}

/// Narrow contract the pipeline holds against the ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Returns persisted records within `window_days` of `date` with exactly
    /// this amount, in a stable order.
    async fn lookup_near(
        &self,
        date: NaiveDate,
        amount: MoneyCents,
        window_days: i64,
    ) -> Result<Vec<LedgerTransaction>, LedgerError>;

    /// Persists one accepted candidate. Insert-only; a constraint violation
    /// (including a duplicate fingerprint from a concurrent import) is a
    /// [`LedgerError::Rejected`].
    async fn insert(
        &self,
        tx: &NormalizedTransaction,
        fingerprint: &Fingerprint,
        source: &Provenance,
    ) -> Result<LedgerTransaction, LedgerError>;
}
