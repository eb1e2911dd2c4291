//! Document discovery and loading.
//!
//! Discovery walks the source directory (top level only unless recursive),
//! skips hidden files and honours `.docentignore` files written in gitignore
//! syntax. Text formats are read as UTF-8; PDFs go through text extraction
//! and keep one page span per page.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::IngestConfig;
use crate::error::{RagError, RagResult};
use crate::types::Document;

/// Name of the optional ignore file honoured during discovery.
pub const IGNORE_FILE: &str = ".docentignore";

/// A file that was not turned into a document, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Documents loaded from a source directory plus everything skipped.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedFile>,
}

/// Extracts text for one format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    PlainText,
    Pdf,
}

impl Format {
    fn for_extension(ext: &str) -> Option<Self> {
        match ext {
            "txt" | "md" | "rst" => Some(Self::PlainText),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentLoader {
    extensions: Vec<String>,
    recursive: bool,
    parallel: bool,
}

impl DocumentLoader {
    pub fn new(extensions: Vec<String>, recursive: bool) -> Self {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            recursive,
            parallel: true,
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        let mut loader = Self::new(config.extensions.clone(), config.recursive);
        loader.parallel = config.parallel;
        loader
    }

    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Supported files under `root`, sorted, plus files skipped for their extension.
    pub fn discover(&self, root: &Path) -> RagResult<(Vec<PathBuf>, Vec<SkippedFile>)> {
        if !root.is_dir() {
            return Err(RagError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "source directory not found"),
            ));
        }

        let mut builder = WalkBuilder::new(root);
        builder
            .standard_filters(false)
            .hidden(true) // Skip hidden files and directories
            .follow_links(false)
            .max_depth(if self.recursive { None } else { Some(1) });
        builder.add_custom_ignore_filename(IGNORE_FILE);

        let mut files = Vec::new();
        let mut skipped = Vec::new();

        for entry in builder.build().filter_map(Result::ok) {
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            if path.file_name().and_then(|n| n.to_str()) == Some(IGNORE_FILE) {
                continue;
            }

            let extension = extension_of(path);
            if self.extensions.iter().any(|e| *e == extension) {
                files.push(path.to_path_buf());
            } else {
                skipped.push(SkippedFile {
                    path: path.to_path_buf(),
                    reason: if extension.is_empty() {
                        "no file extension".to_string()
                    } else {
                        format!("unsupported extension '.{extension}'")
                    },
                });
            }
        }

        files.sort();
        skipped.sort_by(|a, b| a.path.cmp(&b.path));
        Ok((files, skipped))
    }

    /// Loads every supported file under `root`; per-file failures are skipped.
    pub fn load_all(&self, root: &Path) -> RagResult<LoadOutcome> {
        let (files, mut skipped) = self.discover(root)?;

        let results: Vec<(PathBuf, RagResult<Document>)> = if self.parallel {
            files
                .into_par_iter()
                .map(|path| {
                    let result = load_file(&path);
                    (path, result)
                })
                .collect()
        } else {
            files
                .into_iter()
                .map(|path| {
                    let result = load_file(&path);
                    (path, result)
                })
                .collect()
        };

        let mut documents = Vec::with_capacity(results.len());
        for (path, result) in results {
            match result {
                Ok(doc) if doc.is_blank() => {
                    tracing::warn!("Skip file {}: no text content", path.display());
                    skipped.push(SkippedFile {
                        path,
                        reason: "no text content".to_string(),
                    });
                }
                Ok(doc) => documents.push(doc),
                Err(e) if e.is_per_file() => {
                    tracing::warn!("Skip file {}: {e}", path.display());
                    skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "loaded {} documents from {} ({} skipped)",
            documents.len(),
            root.display(),
            skipped.len()
        );
        Ok(LoadOutcome { documents, skipped })
    }
}

/// Loads one file according to its extension.
pub fn load_file(path: &Path) -> RagResult<Document> {
    let extension = extension_of(path);
    let format = Format::for_extension(&extension).ok_or_else(|| RagError::UnsupportedFormat {
        path: path.to_path_buf(),
        extension: extension.clone(),
    })?;

    match format {
        Format::PlainText => {
            let bytes = std::fs::read(path).map_err(|e| load_error(path, e))?;
            let text = String::from_utf8(bytes).map_err(|_| RagError::DocumentLoad {
                path: path.to_path_buf(),
                reason: "file is not valid UTF-8".to_string(),
            })?;
            Ok(Document::new(path, text))
        }
        Format::Pdf => {
            let pages = extract_pdf_pages(path)?;
            Ok(Document::from_pages(path, &pages))
        }
    }
}

/// Text of each PDF page, in page order.
///
/// The extractor panics on some malformed files; a panic is reported as a
/// load failure for this file only.
fn extract_pdf_pages(path: &Path) -> RagResult<Vec<String>> {
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_by_pages(path))) {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(load_error(path, e)),
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown cause".to_string());
            Err(load_error(path, format!("PDF extraction failed: {detail}")))
        }
    }
}

fn load_error(path: &Path, err: impl std::fmt::Display) -> RagError {
    RagError::DocumentLoad {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}
