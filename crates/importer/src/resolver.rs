//! Two-pass duplicate resolution.
//!
//! Pass 1 compares candidates within the batch, in stable source order, so
//! first-seen-wins is reproducible. Pass 2 compares each survivor against
//! the persisted ledger through a ±window lookup.

use crate::{
    batch::MatchedEntry,
    candidate::CandidateTransaction,
    error::LedgerError,
    fingerprint::{Fingerprint, MatchPolicy, similar},
    ledger::LedgerStore,
    normalize::NormalizedTransaction,
};

/// A candidate that passed normalization, ready for resolution.
#[derive(Clone, Debug)]
pub struct NormalizedCandidate {
    pub candidate: CandidateTransaction,
    pub normalized: NormalizedTransaction,
    pub fingerprint: Fingerprint,
}

/// Terminal state of one candidate.
#[derive(Clone, Debug)]
pub enum Resolution {
    New,
    ExactDuplicate(MatchedEntry),
    NearDuplicate(MatchedEntry),
}

impl Resolution {
    pub fn is_new(&self) -> bool {
        matches!(self, Self::New)
    }
}

pub struct DedupResolver {
    policy: MatchPolicy,
}

impl DedupResolver {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    /// Intra-batch pass. Returns one resolution per input, where `New` means
    /// "survives to the ledger pass". A later candidate is resolved against
    /// earlier *kept* candidates only, so a duplicate never becomes an
    /// anchor itself.
    pub fn intra_batch(&self, items: &[NormalizedCandidate]) -> Vec<Resolution> {
        let mut resolutions = Vec::with_capacity(items.len());
        let mut kept: Vec<usize> = Vec::new();

        for (index, item) in items.iter().enumerate() {
            let mut resolution = Resolution::New;
            for &earlier in &kept {
                let prior = &items[earlier];
                if prior.fingerprint == item.fingerprint {
                    resolution = Resolution::ExactDuplicate(batch_entry(prior));
                    break;
                }
                if similar(&prior.normalized, &item.normalized, &self.policy) {
                    resolution = Resolution::NearDuplicate(batch_entry(prior));
                    break;
                }
            }
            if resolution.is_new() {
                kept.push(index);
            }
            resolutions.push(resolution);
        }

        resolutions
    }

    /// Ledger pass for one intra-batch survivor: exact fingerprint match
    /// first, then similarity, over records within the lookup window.
    pub async fn against_ledger(
        &self,
        item: &NormalizedCandidate,
        ledger: &dyn LedgerStore,
    ) -> Result<Resolution, LedgerError> {
        let nearby = ledger
            .lookup_near(
                item.normalized.date,
                item.normalized.amount,
                self.policy.date_window_days,
            )
            .await?;

        if let Some(exact) = nearby.iter().find(|t| t.fingerprint == item.fingerprint) {
            return Ok(Resolution::ExactDuplicate(MatchedEntry::Ledger(
                exact.clone(),
            )));
        }
        if let Some(near) = nearby
            .iter()
            .find(|t| similar(&t.as_normalized(), &item.normalized, &self.policy))
        {
            return Ok(Resolution::NearDuplicate(MatchedEntry::Ledger(near.clone())));
        }
        Ok(Resolution::New)
    }
}

fn batch_entry(prior: &NormalizedCandidate) -> MatchedEntry {
    MatchedEntry::Batch {
        origin: prior.candidate.provenance.origin.clone(),
        fingerprint: prior.fingerprint.clone(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::{
        candidate::{PaymentKind, Provenance},
        fingerprint::fingerprint,
        money::MoneyCents,
    };

    fn item(description: &str, cents: i64, day: u32) -> NormalizedCandidate {
        let normalized = NormalizedTransaction {
            description: description.to_string(),
            amount: MoneyCents::new(cents),
            date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            kind: PaymentKind::Card,
            card: None,
            category: None,
        };
        NormalizedCandidate {
            candidate: CandidateTransaction {
                description: description.to_string(),
                amount: (cents as f64 / 100.0).to_string(),
                date: format!("2025-01-{day:02}"),
                kind: PaymentKind::Card,
                card: None,
                category: None,
                provenance: Provenance {
                    origin: format!("test#{description}"),
                    provider: "test".to_string(),
                    captured_at: Utc::now(),
                },
                confidence: 0.9,
            },
            fingerprint: fingerprint(&normalized),
            normalized,
        }
    }

    #[test]
    fn first_seen_wins_on_exact_match() {
        let resolver = DedupResolver::new(MatchPolicy::default());
        let items = vec![
            item("Coffee Shop", 550, 10),
            item("COFFEE SHOP ", 550, 10),
            item("Groceries", 2000, 10),
        ];

        let resolutions = resolver.intra_batch(&items);
        assert!(resolutions[0].is_new());
        assert!(matches!(resolutions[1], Resolution::ExactDuplicate(_)));
        assert!(resolutions[2].is_new());
    }

    #[test]
    fn near_duplicates_detected_within_batch() {
        let resolver = DedupResolver::new(MatchPolicy::default());
        let items = vec![
            item("Tesco Store #44", 2310, 10),
            item("Tesco Store", 2310, 11),
        ];

        let resolutions = resolver.intra_batch(&items);
        assert!(resolutions[0].is_new());
        assert!(matches!(resolutions[1], Resolution::NearDuplicate(_)));
    }

    #[test]
    fn a_duplicate_is_not_an_anchor_for_later_candidates() {
        let resolver = DedupResolver::new(MatchPolicy::default());
        // The middle candidate duplicates the first; the third sits one day
        // past the first but adjacent to the middle one. It must resolve
        // against the first (kept) candidate only.
        let items = vec![
            item("Gym Fee", 3000, 10),
            item("Gym Fee", 3000, 11),
            item("Gym Fee", 3000, 12),
        ];

        let resolutions = resolver.intra_batch(&items);
        assert!(resolutions[0].is_new());
        assert!(matches!(resolutions[1], Resolution::NearDuplicate(_)));
        assert!(resolutions[2].is_new());
    }
}
