//! Documents and the chunks cut from them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Byte range of one page inside a paginated document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpan {
    /// 1-based page number
    pub number: u32,
    pub start: usize,
    pub end: usize,
}

/// A loaded source file.
///
/// Immutable once loaded. `pages` is empty for formats without pagination.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub source: PathBuf,
    pub text: String,
    pub pages: Vec<PageSpan>,
}

impl Document {
    pub fn new(source: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            pages: Vec::new(),
        }
    }

    /// Build a document from per-page text, joining pages with a blank line.
    pub fn from_pages<S: AsRef<str>>(source: impl Into<PathBuf>, pages: &[S]) -> Self {
        let mut text = String::new();
        let mut spans = Vec::with_capacity(pages.len());

        for (i, page) in pages.iter().enumerate() {
            if i > 0 {
                text.push_str("\n\n");
            }
            let start = text.len();
            text.push_str(page.as_ref());
            spans.push(PageSpan {
                number: (i + 1) as u32,
                start,
                end: text.len(),
            });
        }

        Self {
            source: source.into(),
            text,
            pages: spans,
        }
    }

    /// Stable identifier stored with every chunk of this document.
    pub fn source_id(&self) -> String {
        source_id_for(&self.source)
    }

    /// Page containing byte `offset`, if the document is paginated.
    pub fn page_at(&self, offset: usize) -> Option<u32> {
        if self.pages.is_empty() {
            return None;
        }
        self.pages
            .iter()
            .find(|span| offset < span.end)
            .or(self.pages.last())
            .map(|span| span.number)
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Path rendered with forward slashes so artifacts read the same on every OS.
pub fn source_id_for(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// A contiguous span of a document's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_id: String,
    /// Ordinal within the source, starting at 0
    pub position: u32,
    /// Byte offset of the span in the document text
    pub start: usize,
    pub end: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl Chunk {
    /// Human-readable citation label, e.g. `docs/contract.pdf (p. 3)`.
    pub fn citation(&self) -> String {
        match self.page {
            Some(page) => format!("{} (p. {page})", self.source_id),
            None => self.source_id.clone(),
        }
    }
}
