//! Transaction-notification email reader.
//!
//! The mail transport is an external collaborator behind [`MailStore`];
//! the shipped [`EmlDirStore`] scans a directory of exported `.eml` files.
//! The reader itself owns the transaction-likely heuristic and the date
//! window, so any store implementation gets the same filtering.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mailparse::{MailHeaderMap, ParsedMail};

use crate::{
    error::{MailError, ReaderError},
    source::{RawUnit, ReadOutcome, SourceKind},
};

/// One scanned message, already decoded to text.
#[derive(Clone, Debug)]
pub struct MailMessage {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub date: DateTime<Utc>,
    pub body: String,
}

/// IMAP-like mail boundary: construction is `connect`, dropping the value is
/// `disconnect`.
#[async_trait]
pub trait MailStore: Send + Sync {
    /// Returns messages received on or after `since`, oldest first.
    async fn scan(&self, since: NaiveDate) -> Result<Vec<MailMessage>, MailError>;
}

/// Subject fragments that make a message worth extracting from.
const SUBJECT_KEYWORDS: &[&str] = &[
    "transaction",
    "payment",
    "purchase",
    "receipt",
    "charged",
    "debit",
    "withdrawal",
    "invoice",
    "order confirmation",
];

/// Sender fragments typical of bank/card notification addresses.
const SENDER_KEYWORDS: &[&str] = &["bank", "card", "alert", "billing", "pay", "noreply", "no-reply"];

/// True when the sender or subject looks like a transaction notification.
fn looks_transactional(message: &MailMessage) -> bool {
    let subject = message.subject.to_lowercase();
    let from = message.from.to_lowercase();
    SUBJECT_KEYWORDS.iter().any(|k| subject.contains(k))
        || SENDER_KEYWORDS.iter().any(|k| from.contains(k))
}

pub struct EmailReader<S> {
    store: S,
    since: NaiveDate,
}

impl<S: MailStore> EmailReader<S> {
    pub fn new(store: S, since: NaiveDate) -> Self {
        Self { store, since }
    }

    /// Yields one unit per transaction-likely message body. A store failure
    /// is reported as a single failed unit; an individual empty body is
    /// skipped as unreadable.
    pub async fn read(&self) -> Vec<ReadOutcome> {
        let messages = match self.store.scan(self.since).await {
            Ok(messages) => messages,
            Err(err) => {
                return vec![Err(ReaderError::new("mailbox", err.to_string()))];
            }
        };

        let total = messages.len();
        let outcomes: Vec<ReadOutcome> = messages
            .into_iter()
            .filter(looks_transactional)
            .map(|message| {
                if message.body.trim().is_empty() {
                    Err(ReaderError::new(&message.id, "message has no text body"))
                } else {
                    let mut unit = RawUnit::text(SourceKind::Email, &message.id, &message.body);
                    unit.captured_at = message.date;
                    Ok(unit)
                }
            })
            .collect();

        tracing::debug!(
            scanned = total,
            matched = outcomes.len(),
            since = %self.since,
            "scanned mailbox"
        );
        outcomes
    }
}

/// Mail store over a directory of `.eml` files (an exported mailbox).
pub struct EmlDirStore {
    dir: PathBuf,
}

impl EmlDirStore {
    /// The `connect` step of the boundary: verifies the directory exists.
    pub fn connect(dir: impl Into<PathBuf>) -> Result<Self, MailError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(MailError::Auth(format!(
                "not a mailbox directory: {}",
                dir.display()
            )));
        }
        Ok(Self { dir })
    }
}

#[async_trait]
impl MailStore for EmlDirStore {
    async fn scan(&self, since: NaiveDate) -> Result<Vec<MailMessage>, MailError> {
        let mut entries = std::fs::read_dir(&self.dir)
            .map_err(|err| MailError::Store(format!("{}: {err}", self.dir.display())))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("eml"))
            })
            .collect::<Vec<_>>();
        entries.sort();

        let mut messages = Vec::new();
        for path in entries {
            let raw = std::fs::read(&path)
                .map_err(|err| MailError::Store(format!("{}: {err}", path.display())))?;
            let parsed = mailparse::parse_mail(&raw)
                .map_err(|err| MailError::Store(format!("{}: {err}", path.display())))?;
            let message = to_message(&parsed, &path.display().to_string());
            if message.date.date_naive() >= since {
                messages.push(message);
            }
        }

        messages.sort_by(|a, b| (a.date, &a.id).cmp(&(b.date, &b.id)));
        Ok(messages)
    }
}

fn to_message(mail: &ParsedMail<'_>, fallback_id: &str) -> MailMessage {
    let headers = &mail.headers;
    let id = headers
        .get_first_value("Message-ID")
        .unwrap_or_else(|| fallback_id.to_string());
    let date = headers
        .get_first_value("Date")
        .and_then(|value| mailparse::dateparse(&value).ok())
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
        .unwrap_or_else(Utc::now);

    MailMessage {
        id,
        from: headers.get_first_value("From").unwrap_or_default(),
        subject: headers.get_first_value("Subject").unwrap_or_default(),
        date,
        body: text_body(mail).unwrap_or_default(),
    }
}

/// Finds the first `text/plain` part, falling back to any `text/*` part.
fn text_body(mail: &ParsedMail<'_>) -> Option<String> {
    fn find(mail: &ParsedMail<'_>, mimetype: &str) -> Option<String> {
        if mail.ctype.mimetype.starts_with(mimetype) {
            return mail.get_body().ok();
        }
        mail.subparts.iter().find_map(|part| find(part, mimetype))
    }

    find(mail, "text/plain").or_else(|| find(mail, "text/"))
}
