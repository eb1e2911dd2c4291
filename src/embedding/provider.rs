//! The remote side of embedding generation.

use crate::error::RagResult;

/// Turns a batch of strings into vectors in one remote call.
///
/// Implementations must return exactly one vector per input, in input
/// order, and must not retry or split the batch.
pub trait EmbeddingProvider: Send + Sync {
    fn embed_batch(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>>;

    /// Model identifier recorded with the index.
    fn model(&self) -> &str;

    /// Known output dimension, if the provider was told one.
    fn dimension(&self) -> Option<usize> {
        None
    }
}
