//! JSON envelope for `--json` output.

use serde::Serialize;

use crate::error::RagError;
use crate::io::exit_code::ExitCode;

#[derive(Debug, Serialize)]
pub struct JsonResponse<T: Serialize = serde_json::Value> {
    /// "success" or "error"
    pub status: &'static str,
    /// "OK", "NOT_FOUND", or an error status code
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<&'static str>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<&'static str>,
    pub exit_code: u8,
}

impl<T: Serialize> JsonResponse<T> {
    pub fn success(data: T, exit_code: ExitCode) -> Self {
        let (code, message) = if exit_code == ExitCode::NotFound {
            ("NOT_FOUND", "No results")
        } else {
            ("OK", "Success")
        };
        Self {
            status: "success",
            code: code.to_string(),
            category: None,
            message: message.to_string(),
            data: Some(data),
            suggestions: Vec::new(),
            exit_code: exit_code as u8,
        }
    }
}

impl JsonResponse {
    pub fn from_error(error: &RagError) -> Self {
        Self {
            status: "error",
            code: error.status_code(),
            category: Some(error.category().as_str()),
            message: error.to_string(),
            data: None,
            suggestions: error.recovery_suggestions(),
            exit_code: ExitCode::from_error(error) as u8,
        }
    }
}

impl<T: Serialize> JsonResponse<T> {
    /// Pretty JSON on stdout.
    pub fn print(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("failed to serialize response: {e}"),
        }
    }
}
