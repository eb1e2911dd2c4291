//! Query-time retrieval over the shared index.

use std::sync::Arc;

use serde::Serialize;

use crate::config::Settings;
use crate::embedding::EmbeddingClient;
use crate::error::{RagError, RagResult};
use crate::retrieval::IndexHandle;
use crate::vector::{IndexStats, ScoredChunk, VectorIndex};

/// Retrieved chunks plus the context text handed to generation.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedContext {
    pub chunks: Vec<ScoredChunk>,
    pub text: String,
}

/// Embeds queries and searches the shared index.
#[derive(Debug, Clone)]
pub struct RetrievalService {
    handle: Arc<IndexHandle>,
    client: EmbeddingClient,
    default_k: usize,
    max_k: usize,
    /// Configured embedding dimension, checked against the loaded index
    expected_dimension: Option<usize>,
}

impl RetrievalService {
    pub fn new(handle: Arc<IndexHandle>, client: EmbeddingClient) -> Self {
        Self {
            handle,
            client,
            default_k: 4,
            max_k: 20,
            expected_dimension: None,
        }
    }

    pub fn from_settings(settings: &Settings, client: EmbeddingClient) -> Self {
        let handle = IndexHandle::new(settings.resolved_index_path())
            .with_probe_clusters(settings.index.probe_clusters);
        Self::new(Arc::new(handle), client)
            .with_k_limits(settings.retrieval.default_k, settings.retrieval.max_k)
            .with_expected_dimension(settings.embedding.dimension)
    }

    #[must_use]
    pub fn with_k_limits(mut self, default_k: usize, max_k: usize) -> Self {
        self.max_k = max_k.max(1);
        self.default_k = default_k.clamp(1, self.max_k);
        self
    }

    #[must_use]
    pub fn with_expected_dimension(mut self, dimension: Option<usize>) -> Self {
        self.expected_dimension = dimension;
        self
    }

    pub fn handle(&self) -> &Arc<IndexHandle> {
        &self.handle
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    /// Requested `k`, or the default, clamped to `[1, max_k]`.
    pub fn effective_k(&self, k: Option<usize>) -> usize {
        k.unwrap_or(self.default_k).clamp(1, self.max_k)
    }

    /// Top-`k` chunks for `query`, best first.
    pub fn retrieve(&self, query: &str, k: Option<usize>) -> RagResult<Vec<ScoredChunk>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::EmptyQuery);
        }
        let k = self.effective_k(k);
        let index = self.index()?;
        let vector = self.client.embed_one(query)?;
        let results = index.search(&vector, k)?;
        tracing::debug!("retrieved {} chunks for k={k}", results.len());
        Ok(results)
    }

    /// Retrieves and renders the chunks as numbered, attributed context.
    pub fn retrieve_context(&self, query: &str, k: Option<usize>) -> RagResult<RetrievedContext> {
        let chunks = self.retrieve(query, k)?;
        let text = format_context(&chunks);
        Ok(RetrievedContext { chunks, text })
    }

    pub fn stats(&self) -> RagResult<IndexStats> {
        Ok(self.index()?.stats())
    }

    fn index(&self) -> RagResult<Arc<VectorIndex>> {
        let index = self.handle.get()?;
        if let Some(expected) = self.expected_dimension {
            let actual = index.dimension().get();
            if actual != expected {
                return Err(RagError::DimensionMismatch { expected, actual });
            }
        }
        Ok(index)
    }
}

/// Numbers each chunk as `[n] source` followed by its text.
pub fn format_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, scored)| {
            format!(
                "[{}] {}\n{}",
                i + 1,
                scored.chunk.citation(),
                scored.chunk.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
