//! The import coordinator: drives readers' output through extraction,
//! normalization, fingerprinting, dedup and commit, in a single pass per
//! batch.
//!
//! Nothing here throws past the batch boundary; every failure lands in the
//! [`ImportBatchResult`].

use std::time::Duration;

use tokio::time::timeout;

use crate::{
    batch::{ImportBatchResult, RejectReason},
    candidate::CandidateTransaction,
    config::ImportConfig,
    error::ProviderError,
    fingerprint::fingerprint,
    ledger::LedgerStore,
    normalize::normalize,
    providers::ExtractionProvider,
    resolver::{DedupResolver, NormalizedCandidate, Resolution},
    source::{RawUnit, ReadOutcome},
};

pub struct Importer<L> {
    provider: Box<dyn ExtractionProvider>,
    ledger: L,
    config: ImportConfig,
    resolver: DedupResolver,
}

impl<L: LedgerStore> Importer<L> {
    /// Builds a coordinator for one sequence of import runs. The provider
    /// (and its HTTP client) lives and dies with this value; nothing is
    /// shared process-wide.
    pub fn new(provider: Box<dyn ExtractionProvider>, ledger: L, config: ImportConfig) -> Self {
        let resolver = DedupResolver::new(config.policy);
        Self {
            provider,
            ledger,
            config,
            resolver,
        }
    }

    /// Runs one batch over the readers' output. Unit order is preserved all
    /// the way to the intra-batch dedup pass, so first-seen-wins is
    /// reproducible.
    pub async fn run(&self, units: Vec<ReadOutcome>) -> ImportBatchResult {
        let mut result = ImportBatchResult::default();

        let candidates = self.extract_all(units, &mut result).await;
        result.extracted = candidates.len();

        let normalized = self.normalize_all(candidates, &mut result);
        let resolutions = self.resolver.intra_batch(&normalized);
        self.commit(normalized, resolutions, &mut result).await;

        tracing::info!(provider = self.provider.name(), %result, "import batch finished");
        result
    }

    async fn extract_all(
        &self,
        units: Vec<ReadOutcome>,
        result: &mut ImportBatchResult,
    ) -> Vec<CandidateTransaction> {
        let mut candidates = Vec::new();
        let mut halted = false;

        for outcome in units {
            let unit = match outcome {
                Ok(unit) => unit,
                Err(err) => {
                    tracing::warn!(origin = %err.origin, error = %err.message, "skipping unreadable unit");
                    result.record_unit_error(err.origin, err.message);
                    continue;
                }
            };

            if halted {
                result.record_unit_error(&unit.origin, "skipped: provider unavailable");
                continue;
            }

            match self.extract_with_retry(&unit).await {
                Ok(found) => {
                    tracing::debug!(origin = %unit.origin, candidates = found.len(), "extracted unit");
                    candidates.extend(found);
                }
                Err(ProviderError::Unavailable(message)) => {
                    // Total unavailability: stop issuing work, keep what we
                    // have, and finalize the batch normally.
                    halted = true;
                    result.warnings.push(format!(
                        "provider {} unavailable, remaining units skipped: {message}",
                        self.provider.name()
                    ));
                    result
                        .record_unit_error(&unit.origin, format!("provider unavailable: {message}"));
                }
                Err(ProviderError::Malformed(message)) => {
                    result.record_unit_error(
                        &unit.origin,
                        format!("malformed extraction output: {message}"),
                    );
                }
            }
        }

        candidates
    }

    /// One bounded attempt plus one retry on transient failure. Malformed
    /// output is never retried here; the LLM providers already re-prompt
    /// once themselves.
    async fn extract_with_retry(
        &self,
        unit: &RawUnit,
    ) -> Result<Vec<CandidateTransaction>, ProviderError> {
        let budget = Duration::from_secs(self.config.provider.timeout_secs());
        match self.attempt(unit, budget).await {
            Err(ProviderError::Unavailable(first)) => {
                tracing::warn!(origin = %unit.origin, error = %first, "transient provider failure, retrying once");
                self.attempt(unit, budget).await
            }
            other => other,
        }
    }

    async fn attempt(
        &self,
        unit: &RawUnit,
        budget: Duration,
    ) -> Result<Vec<CandidateTransaction>, ProviderError> {
        match timeout(budget, self.provider.extract(unit)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Unavailable(format!(
                "timed out after {}s",
                budget.as_secs()
            ))),
        }
    }

    fn normalize_all(
        &self,
        candidates: Vec<CandidateTransaction>,
        result: &mut ImportBatchResult,
    ) -> Vec<NormalizedCandidate> {
        let mut normalized = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            if candidate.confidence < self.config.min_confidence {
                let reason = RejectReason::LowConfidence {
                    confidence: candidate.confidence,
                    floor: self.config.min_confidence,
                };
                result.record_rejection(candidate, reason);
                continue;
            }

            match normalize(&candidate) {
                Ok(tx) => {
                    result.normalized_ok += 1;
                    normalized.push(NormalizedCandidate {
                        fingerprint: fingerprint(&tx),
                        normalized: tx,
                        candidate,
                    });
                }
                Err(err) => {
                    tracing::debug!(origin = %candidate.provenance.origin, error = %err, "candidate failed normalization");
                    result.record_rejection(candidate, RejectReason::Normalization(err));
                }
            }
        }

        normalized
    }

    async fn commit(
        &self,
        items: Vec<NormalizedCandidate>,
        resolutions: Vec<Resolution>,
        result: &mut ImportBatchResult,
    ) {
        for (item, resolution) in items.into_iter().zip(resolutions) {
            match resolution {
                Resolution::ExactDuplicate(matched) => {
                    result.record_rejection(item.candidate, RejectReason::ExactDuplicate(matched));
                }
                Resolution::NearDuplicate(matched) => {
                    result.record_rejection(item.candidate, RejectReason::NearDuplicate(matched));
                }
                Resolution::New => self.commit_survivor(item, result).await,
            }
        }
    }

    /// Ledger pass and insert for one intra-batch survivor.
    async fn commit_survivor(&self, item: NormalizedCandidate, result: &mut ImportBatchResult) {
        let resolution = match self.resolver.against_ledger(&item, &self.ledger).await {
            Ok(resolution) => resolution,
            Err(err) => {
                tracing::warn!(error = %err, "ledger lookup failed");
                result.record_rejection(item.candidate, RejectReason::LedgerRejected(err.to_string()));
                return;
            }
        };

        match resolution {
            Resolution::ExactDuplicate(matched) => {
                result.record_rejection(item.candidate, RejectReason::ExactDuplicate(matched));
            }
            Resolution::NearDuplicate(matched) => {
                result.record_rejection(item.candidate, RejectReason::NearDuplicate(matched));
            }
            Resolution::New => {
                match self
                    .ledger
                    .insert(&item.normalized, &item.fingerprint, &item.candidate.provenance)
                    .await
                {
                    Ok(row) => {
                        result.imported += 1;
                        tracing::debug!(id = %row.id, amount = %row.amount, "imported transaction");
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "ledger refused insert");
                        result.record_rejection(
                            item.candidate,
                            RejectReason::LedgerRejected(err.to_string()),
                        );
                    }
                }
            }
        }
    }
}
