//! Error types for the retrieval pipeline
//!
//! This module provides structured error types using thiserror. Every error
//! carries enough detail for the caller to tell "retry later" apart from
//! "fix configuration" and "re-run ingestion".

use crate::vector::VectorError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for ingestion and retrieval operations
#[derive(Error, Debug)]
pub enum RagError {
    /// Ingestion input contained nothing loadable
    #[error(
        "No supported documents found in '{path}'. Supported extensions: {extensions}"
    )]
    NoDocumentsFound { path: PathBuf, extensions: String },

    /// Per-file: the extension has no loader
    #[error("Unsupported document format '{extension}' for file '{path}'")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// Per-file: the loader failed to extract text
    #[error("Failed to load document '{path}': {reason}")]
    DocumentLoad { path: PathBuf, reason: String },

    /// Embedding or generation API error
    #[error("Remote {operation} call failed{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    RemoteCall {
        operation: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// Caller-imposed deadline exceeded on a remote call
    #[error("Remote {operation} call timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Vector length inconsistency between model, index and query
    #[error(
        "Embedding dimension mismatch: expected {expected}, got {actual}. The embedding model or its configuration changed since the index was built"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    /// No artifact at the configured path
    #[error("No index found at '{path}'. Run 'docent ingest' first")]
    IndexNotFound { path: PathBuf },

    /// Artifact exists but cannot be read back
    #[error("Index at '{path}' is corrupted: {reason}")]
    CorruptIndex { path: PathBuf, reason: String },

    /// Retrieval or generation asked with a blank question
    #[error("Query is empty")]
    EmptyQuery,

    /// Invalid or incomplete configuration
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    /// Filesystem failure outside of index reads
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What the caller should do about an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transient remote trouble; the same request may succeed later
    RetryLater,
    /// Settings or credentials need to change
    FixConfiguration,
    /// The index must be rebuilt with `docent ingest`
    Reingest,
    /// The input documents need attention
    FixInput,
    /// Local environment problem (disk, permissions)
    Environment,
}

impl ErrorCategory {
    /// Stable lowercase name used in JSON responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RetryLater => "retry_later",
            Self::FixConfiguration => "fix_configuration",
            Self::Reingest => "reingest",
            Self::FixInput => "fix_input",
            Self::Environment => "environment",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RagError {
    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::NoDocumentsFound { .. } => "NO_DOCUMENTS_FOUND",
            Self::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            Self::DocumentLoad { .. } => "DOCUMENT_LOAD_ERROR",
            Self::RemoteCall { .. } => "REMOTE_CALL_FAILURE",
            Self::Timeout { .. } => "TIMEOUT",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::IndexNotFound { .. } => "INDEX_NOT_FOUND",
            Self::CorruptIndex { .. } => "CORRUPT_INDEX",
            Self::EmptyQuery => "EMPTY_QUERY",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Io { .. } => "IO_ERROR",
        }
        .to_string()
    }

    /// Classify the error by the action it calls for.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RemoteCall { .. } | Self::Timeout { .. } => ErrorCategory::RetryLater,
            Self::DimensionMismatch { .. } | Self::Config { .. } => {
                ErrorCategory::FixConfiguration
            }
            Self::IndexNotFound { .. } | Self::CorruptIndex { .. } => ErrorCategory::Reingest,
            Self::NoDocumentsFound { .. }
            | Self::UnsupportedFormat { .. }
            | Self::DocumentLoad { .. }
            | Self::EmptyQuery => ErrorCategory::FixInput,
            Self::Io { .. } => ErrorCategory::Environment,
        }
    }

    /// Errors that only cost one file during ingestion.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat { .. } | Self::DocumentLoad { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::NoDocumentsFound { .. } => vec![
                "Check that the source directory contains .pdf, .txt, .md or .rst files",
                "Hidden files are skipped; set 'ingest.recursive = true' to include subdirectories",
            ],
            Self::RemoteCall { status: Some(401 | 403), .. } => vec![
                "Check the API key environment variable named by 'api_key_env'",
                "Verify the endpoint and deployment names in settings.toml",
            ],
            Self::RemoteCall { status: Some(429), .. } => vec![
                "Increase 'embedding.rate_limit_delay_ms' to stay under the provider quota",
                "Retry the operation later",
            ],
            Self::RemoteCall { .. } | Self::Timeout { .. } => vec![
                "Retry the operation later",
                "Increase the 'timeout_secs' setting if the provider is slow",
            ],
            Self::DimensionMismatch { .. } => vec![
                "Use the same embedding model for ingestion and queries",
                "Run 'docent ingest' again after changing the embedding model",
            ],
            Self::IndexNotFound { .. } => vec![
                "Run 'docent ingest' to build the index",
                "Check that 'index_path' points at the artifact you built",
            ],
            Self::CorruptIndex { .. } => vec![
                "Run 'docent ingest' to rebuild the index from scratch",
                "Check for disk errors or filesystem corruption",
            ],
            Self::Config { .. } => vec![
                "Run 'docent config' to inspect the effective settings",
                "Run 'docent init --force' to regenerate settings.toml",
            ],
            Self::Io { .. } => vec![
                "Check disk space and file permissions",
            ],
            _ => vec![],
        }
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Create a corrupt index error
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptIndex {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an I/O error tied to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<VectorError> for RagError {
    fn from(err: VectorError) -> Self {
        match err {
            VectorError::DimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
            VectorError::NonFinite { context } => Self::RemoteCall {
                operation: "embedding",
                status: None,
                message: format!("model returned a non-finite value ({context})"),
            },
            VectorError::InvalidDimension { .. } | VectorError::ClusteringFailed(_) => {
                Self::Config {
                    reason: err.to_string(),
                }
            }
        }
    }
}

/// Result type alias for pipeline operations
pub type RagResult<T> = Result<T, RagError>;

/// Helper trait for attaching a path to I/O failures
pub trait ErrorContext<T> {
    /// Map an I/O error to [`RagError::Io`] for `path`
    fn with_path(self, path: &std::path::Path) -> RagResult<T>;
}

impl<T> ErrorContext<T> for Result<T, std::io::Error> {
    fn with_path(self, path: &std::path::Path) -> RagResult<T> {
        self.map_err(|e| RagError::io(path, e))
    }
}
