//! Embeddings over an OpenAI-compatible HTTP endpoint (Azure or OpenAI).

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::embedding::provider::EmbeddingProvider;
use crate::error::{RagError, RagResult};
use crate::remote::{self, RemoteEndpoint};

const OPERATION: &str = "embedding";

/// Blocking embeddings client for `/embeddings`.
pub struct OpenAiEmbeddingProvider {
    client: Client,
    endpoint: RemoteEndpoint,
    url: String,
    dimensions: Option<usize>,
}

impl OpenAiEmbeddingProvider {
    /// `dimensions` is forwarded to models that support shortened output.
    pub fn new(endpoint: RemoteEndpoint, dimensions: Option<usize>) -> RagResult<Self> {
        if endpoint.base_url.trim().is_empty() {
            return Err(RagError::config("embedding endpoint is not configured"));
        }
        if endpoint.model.trim().is_empty() {
            return Err(RagError::config("embedding model is not configured"));
        }
        let client = endpoint.client()?;
        let url = endpoint.url("embeddings");
        Ok(Self {
            client,
            endpoint,
            url,
            dimensions,
        })
    }
}

impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn embed_batch(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: self.endpoint.body_model(),
            input: texts,
            dimensions: self.dimensions,
        };
        let response = remote::send(
            OPERATION,
            self.endpoint.timeout,
            self.client.post(&self.url).json(&request),
        )?;

        let parsed: EmbeddingResponse = response
            .json()
            .map_err(|e| remote::transport_error(OPERATION, self.endpoint.timeout, e))?;
        order_vectors(parsed, texts.len())
    }

    fn model(&self) -> &str {
        &self.endpoint.model
    }

    fn dimension(&self) -> Option<usize> {
        self.dimensions
    }
}

/// Restores input order and checks that every input got a vector.
fn order_vectors(mut parsed: EmbeddingResponse, expected: usize) -> RagResult<Vec<Vec<f32>>> {
    parsed.data.sort_by_key(|entry| entry.index);

    let in_order = parsed
        .data
        .iter()
        .enumerate()
        .all(|(i, entry)| entry.index == i);
    if parsed.data.len() != expected || !in_order {
        return Err(RagError::RemoteCall {
            operation: OPERATION,
            status: None,
            message: format!(
                "provider returned {} embeddings for {expected} inputs",
                parsed.data.len()
            ),
        });
    }

    Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
