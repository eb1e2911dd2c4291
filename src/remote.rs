//! Shared plumbing for OpenAI-compatible HTTP endpoints.
//!
//! Two URL/auth schemes are supported:
//! - Azure OpenAI: `{endpoint}/openai/deployments/{deployment}/{route}?api-version=...`
//!   authenticated with an `api-key` header
//! - OpenAI and compatible servers: `{endpoint}/{route}` with the model in the
//!   request body, authenticated with `Authorization: Bearer`

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::{RagError, RagResult};

/// Which URL and authentication scheme an endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiScheme {
    #[default]
    Azure,
    OpenAi,
}

/// Resolved connection details for one remote model.
#[derive(Debug, Clone)]
pub struct RemoteEndpoint {
    pub scheme: ApiScheme,
    /// Base URL, e.g. `https://myres.openai.azure.com` or `https://api.openai.com/v1`
    pub base_url: String,
    /// Deployment name (Azure) or model name (OpenAI)
    pub model: String,
    pub api_version: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl RemoteEndpoint {
    /// Full URL for `route` (`embeddings`, `chat/completions`).
    pub fn url(&self, route: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.scheme {
            ApiScheme::Azure => format!(
                "{base}/openai/deployments/{}/{route}?api-version={}",
                self.model, self.api_version
            ),
            ApiScheme::OpenAi => format!("{base}/{route}"),
        }
    }

    /// Model name to send in the body; Azure takes it from the URL instead.
    pub fn body_model(&self) -> Option<&str> {
        match self.scheme {
            ApiScheme::Azure => None,
            ApiScheme::OpenAi => Some(&self.model),
        }
    }

    /// Blocking client with auth headers and the configured timeout.
    pub fn client(&self) -> RagResult<Client> {
        let mut headers = HeaderMap::new();
        let key = self.api_key.trim();
        let (name, value) = match self.scheme {
            ApiScheme::Azure => (HeaderName::from_static("api-key"), key.to_string()),
            ApiScheme::OpenAi => (AUTHORIZATION, format!("Bearer {key}")),
        };
        headers.insert(
            name,
            HeaderValue::from_str(&value)
                .map_err(|_| RagError::config("API key contains invalid header characters"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| RagError::config(format!("failed to build HTTP client: {e}")))
    }
}

/// Sends `request`, mapping transport failures and non-success statuses.
pub fn send(
    operation: &'static str,
    timeout: Duration,
    request: RequestBuilder,
) -> RagResult<Response> {
    let response = request.send().map_err(|e| transport_error(operation, timeout, e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    Err(RagError::RemoteCall {
        operation,
        status: Some(status.as_u16()),
        message: truncate(&body, 500),
    })
}

/// Maps a reqwest error to `Timeout` or `RemoteCall`.
pub fn transport_error(operation: &'static str, timeout: Duration, err: reqwest::Error) -> RagError {
    if err.is_timeout() {
        RagError::Timeout {
            operation,
            after: timeout,
        }
    } else {
        RagError::RemoteCall {
            operation,
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Reads the API key from the environment variable named by `var`.
pub fn api_key_from_env(var: &str) -> RagResult<String> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(RagError::config(format!(
            "environment variable {var} is not set; it must hold the API key"
        ))),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(scheme: ApiScheme) -> RemoteEndpoint {
        RemoteEndpoint {
            scheme,
            base_url: "https://example.test/".to_string(),
            model: "text-embedding-ada-002".to_string(),
            api_version: "2024-02-15-preview".to_string(),
            api_key: "secret".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_azure_url_uses_deployment() {
        let ep = endpoint(ApiScheme::Azure);
        assert_eq!(
            ep.url("embeddings"),
            "https://example.test/openai/deployments/text-embedding-ada-002/embeddings?api-version=2024-02-15-preview"
        );
        assert_eq!(ep.body_model(), None);
    }

    #[test]
    fn test_openai_url_puts_model_in_body() {
        let ep = endpoint(ApiScheme::OpenAi);
        assert_eq!(ep.url("chat/completions"), "https://example.test/chat/completions");
        assert_eq!(ep.body_model(), Some("text-embedding-ada-002"));
        assert!(ep.client().is_ok());
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = api_key_from_env("DOCENT_TEST_KEY_THAT_IS_NEVER_SET").unwrap_err();
        assert_eq!(err.status_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééé", 3), "é...");
    }
}
