//! Format-specific raw-content readers.
//!
//! Each reader turns one origin (a file path, a mail store) into an ordered
//! sequence of [`ReadOutcome`](crate::source::ReadOutcome)s: one per page,
//! image or message. An unreadable unit becomes an `Err` entry that the
//! coordinator records and skips; it never aborts the batch.

mod email;
mod image;
mod pdf;

pub use email::{EmailReader, EmlDirStore, MailMessage, MailStore};
pub use image::{ImageReader, MULTIMODAL_EDGE};
pub use pdf::PdfReader;
