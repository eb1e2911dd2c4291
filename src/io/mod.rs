//! CLI output plumbing: exit codes and the JSON envelope.

pub mod exit_code;
pub mod format;

pub use exit_code::ExitCode;
pub use format::JsonResponse;
