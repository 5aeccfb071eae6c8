//! Source units fed to extraction providers.
//!
//! A [`RawUnit`] is one indivisible piece of source content: one PDF page's
//! text, one decoded image, one email body. Units are created per import run
//! and discarded after extraction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReaderError;

/// Where a unit came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Pdf,
    Image,
    Email,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Email => "email",
        }
    }
}

impl TryFrom<&str> for SourceKind {
    type Error = ReaderError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pdf" => Ok(Self::Pdf),
            "image" => Ok(Self::Image),
            "email" => Ok(Self::Email),
            other => Err(ReaderError::new(
                other,
                format!("invalid source kind: {other}"),
            )),
        }
    }
}

/// The content of a unit: extracted text, or encoded image bytes (PNG).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawPayload {
    Text(String),
    Image(Vec<u8>),
}

/// One unit of source content handed to an extraction provider.
#[derive(Clone, Debug)]
pub struct RawUnit {
    pub kind: SourceKind,
    /// Stable origin identifier: `statement.pdf#page=3`, a message id, an
    /// image path.
    pub origin: String,
    pub payload: RawPayload,
    pub captured_at: DateTime<Utc>,
}

impl RawUnit {
    pub fn text(kind: SourceKind, origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            origin: origin.into(),
            payload: RawPayload::Text(text.into()),
            captured_at: Utc::now(),
        }
    }

    pub fn image(origin: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            kind: SourceKind::Image,
            origin: origin.into(),
            payload: RawPayload::Image(bytes),
            captured_at: Utc::now(),
        }
    }
}

/// The outcome of reading one unit: the unit, or the recorded reason it was
/// skipped. A failed unit never aborts the batch.
pub type ReadOutcome = Result<RawUnit, ReaderError>;
