//! Exit codes for CLI operations.
//!
//! # Exit Code Semantics
//!
//! - `0`: Success
//! - `1`: General error
//! - `3`: The command ran but found nothing (empty retrieval)
//! - `4-8`: One code per error category, so scripts can choose a recovery
//! - `126-255`: Reserved by shell

use crate::error::{ErrorCategory, RagError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,

    GeneralError = 1,

    /// Command succeeded but returned no results (code 3)
    NotFound = 3,

    /// Input documents or query need attention (code 4)
    InvalidInput = 4,

    /// Filesystem or environment failure (code 5)
    IoError = 5,

    /// Settings, credentials or embedding model mismatch (code 6)
    ConfigError = 6,

    /// Index missing or corrupt; run ingestion (code 7)
    IndexUnavailable = 7,

    /// Remote model failed or timed out; retry later (code 8)
    RemoteUnavailable = 8,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl ExitCode {
    /// `Success` for a non-empty result, `NotFound` otherwise.
    pub fn from_results<T>(results: &[T]) -> Self {
        if results.is_empty() {
            ExitCode::NotFound
        } else {
            ExitCode::Success
        }
    }

    pub fn from_category(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::RetryLater => ExitCode::RemoteUnavailable,
            ErrorCategory::FixConfiguration => ExitCode::ConfigError,
            ErrorCategory::Reingest => ExitCode::IndexUnavailable,
            ErrorCategory::FixInput => ExitCode::InvalidInput,
            ErrorCategory::Environment => ExitCode::IoError,
        }
    }

    pub fn from_error(error: &RagError) -> Self {
        Self::from_category(error.category())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }

    pub fn description(&self) -> &str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::GeneralError => "General error",
            ExitCode::NotFound => "Not found",
            ExitCode::InvalidInput => "Invalid input",
            ExitCode::IoError => "I/O error",
            ExitCode::ConfigError => "Configuration error",
            ExitCode::IndexUnavailable => "Index missing or corrupt",
            ExitCode::RemoteUnavailable => "Remote model unavailable",
        }
    }

    /// Terminates the process with this code.
    pub fn exit(self) -> ! {
        std::process::exit(self.into())
    }
}
