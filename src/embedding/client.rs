//! Throttled access to an [`EmbeddingProvider`].

use std::sync::Arc;

use crate::config::EmbeddingConfig;
use crate::embedding::openai::OpenAiEmbeddingProvider;
use crate::embedding::provider::EmbeddingProvider;
use crate::embedding::throttle::Throttle;
use crate::error::{RagError, RagResult};

/// Embedding client: one provider behind one shared throttle.
///
/// Cloning is cheap and clones share the throttle, so every call made
/// through any clone counts against the same rate budget.
#[derive(Clone)]
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    throttle: Arc<Throttle>,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, throttle: Arc<Throttle>) -> Self {
        Self { provider, throttle }
    }

    /// Remote provider from settings, throttled by `rate_limit_delay_ms`.
    ///
    /// `dimension` is checked against vectors, never sent to the provider.
    pub fn from_config(config: &EmbeddingConfig) -> RagResult<Self> {
        let provider = OpenAiEmbeddingProvider::new(config.remote_endpoint()?, None)?;
        Ok(Self::new(
            Arc::new(provider),
            Arc::new(Throttle::from_millis(config.rate_limit_delay_ms)),
        ))
    }

    /// Embeds `texts` in a single remote call.
    ///
    /// The batch is sent as given; splitting is the caller's policy.
    /// Provider errors propagate unchanged.
    pub fn embed(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = {
            let _ticket = self.throttle.acquire();
            self.provider.embed_batch(texts)?
        };

        if vectors.len() != texts.len() {
            return Err(RagError::RemoteCall {
                operation: "embedding",
                status: None,
                message: format!(
                    "provider returned {} embeddings for {} inputs",
                    vectors.len(),
                    texts.len()
                ),
            });
        }

        tracing::debug!("embedded batch of {}", texts.len());
        Ok(vectors)
    }

    pub fn embed_one(&self, text: &str) -> RagResult<Vec<f32>> {
        self.embed(&[text])?
            .pop()
            .ok_or_else(|| RagError::RemoteCall {
                operation: "embedding",
                status: None,
                message: "provider returned no embedding".to_string(),
            })
    }

    /// Embeds `texts` as consecutive batches of at most `batch_size`.
    pub fn embed_batched(&self, texts: &[&str], batch_size: usize) -> RagResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size.max(1)) {
            vectors.extend(self.embed(batch)?);
        }
        Ok(vectors)
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.provider.dimension()
    }

    pub fn throttle(&self) -> &Arc<Throttle> {
        &self.throttle
    }
}

impl std::fmt::Debug for EmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingClient")
            .field("model", &self.provider.model())
            .field("throttle", &self.throttle)
            .finish()
    }
}
