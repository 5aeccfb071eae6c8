//! PDF statement reader: one unit per page, page order preserved.

use std::path::{Path, PathBuf};

use crate::{
    error::ReaderError,
    source::{RawUnit, ReadOutcome, SourceKind},
};

pub struct PdfReader {
    path: PathBuf,
}

impl PdfReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Extracts text page by page. A page with no extractable text is
    /// recorded as a failed unit; downstream extractors deal with partial
    /// rows when a table straddles a page boundary.
    pub fn read(&self) -> Vec<ReadOutcome> {
        let pages = match pdf_extract::extract_text_by_pages(&self.path) {
            Ok(pages) => pages,
            Err(err) => {
                return vec![Err(ReaderError::new(
                    self.path.display().to_string(),
                    format!("failed to open pdf: {err}"),
                ))];
            }
        };

        tracing::debug!(path = %self.path.display(), pages = pages.len(), "read pdf");

        pages
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let origin = page_origin(&self.path, index + 1);
                if text.trim().is_empty() {
                    Err(ReaderError::new(origin, "page has no extractable text"))
                } else {
                    Ok(RawUnit::text(SourceKind::Pdf, origin, text))
                }
            })
            .collect()
    }
}

fn page_origin(path: &Path, page: usize) -> String {
    format!("{}#page={page}", path.display())
}
