//! Transaction auto-import and deduplication pipeline.
//!
//! Extracts structured transactions from unstructured sources (statement
//! PDFs, receipt photos, notification emails) and merges them into an
//! existing ledger without creating duplicates:
//!
//! readers → extraction providers → normalizer → fingerprint engine →
//! dedup resolver → [`Importer`] → ledger.
//!
//! The ledger and the mail transport are external collaborators behind the
//! [`LedgerStore`] and [`readers::MailStore`] traits; extraction backends
//! sit behind [`ExtractionProvider`] and are selected by configuration.

pub use batch::{ImportBatchResult, MatchedEntry, RejectReason, RejectedCandidate, UnitError};
pub use candidate::{CandidateTransaction, PaymentKind, Provenance};
pub use config::{ImportConfig, ProviderConfig, ProviderKind};
pub use error::{LedgerError, MailError, NormalizationError, ProviderError, ReaderError};
pub use fingerprint::{Fingerprint, MatchPolicy, fingerprint, similar};
pub use ledger::{LedgerStore, LedgerTransaction};
pub use money::MoneyCents;
pub use normalize::{NormalizedTransaction, fold, normalize, parse_date};
pub use pipeline::Importer;
pub use providers::ExtractionProvider;
pub use resolver::{DedupResolver, NormalizedCandidate, Resolution};
pub use source::{RawPayload, RawUnit, ReadOutcome, SourceKind};

mod batch;
mod candidate;
mod config;
mod error;
mod fingerprint;
mod ledger;
mod money;
mod normalize;
mod pipeline;
pub mod providers;
pub mod readers;
mod resolver;
mod source;
