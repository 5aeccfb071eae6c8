//! The module contains the errors the import pipeline can produce.
//!
//! Every error here is accumulated into the batch result; none of them is
//! allowed to cross the batch boundary. The taxonomy is:
//!
//! - [`ReaderError`] a single source unit could not be read (skip unit).
//! - [`ProviderError`] an extraction provider call failed.
//! - [`NormalizationError`] a candidate could not be canonicalized (drop candidate).
//! - [`MailError`] the mail store could not be reached or scanned.
//! - [`LedgerError`] the ledger boundary refused a lookup or an insert.
use thiserror::Error;

/// A candidate failed canonicalization and is dropped from the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    /// Two plausible readings of the date disagree by more than one calendar
    /// day (e.g. `03/04` as March 4 vs April 3). Surfaced, never guessed.
    #[error("ambiguous date \"{0}\"")]
    AmbiguousDate(String),
    #[error("unparsable date \"{0}\"")]
    UnparsableDate(String),
    #[error("unparsable amount \"{0}\"")]
    UnparsableAmount(String),
}

/// An extraction provider call failed.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport-level failure: network down or model server unreachable.
    /// The coordinator retries once, then halts the remaining units.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    /// The provider answered but the output does not fit the schema.
    /// Never retried past the provider's own stricter-prompt attempt.
    #[error("malformed extraction output: {0}")]
    Malformed(String),
}

/// A single source unit (page, image, message) could not be read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{origin}: {message}")]
pub struct ReaderError {
    pub origin: String,
    pub message: String,
}

impl ReaderError {
    pub fn new(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            message: message.into(),
        }
    }
}

/// The mail store boundary failed.
#[derive(Error, Debug)]
pub enum MailError {
    #[error("mail authentication failed: {0}")]
    Auth(String),
    #[error("mail store error: {0}")]
    Store(String),
}

/// The ledger boundary refused an operation.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The ledger rejected the record itself (constraint violation, duplicate
    /// fingerprint from a concurrent import).
    #[error("insert rejected: {0}")]
    Rejected(String),
    /// The ledger could not be queried or written at all.
    #[error("ledger error: {0}")]
    Database(String),
}
