//! Grounded answer generation on top of retrieval.

mod chat;
mod prompt;

pub use chat::ChatGenerator;
pub use prompt::{INSUFFICIENT_CONTEXT, Prompt, SYSTEM_PROMPT};

use std::sync::Arc;

use serde::Serialize;

use crate::error::{RagError, RagResult};
use crate::retrieval::RetrievalService;
use crate::vector::ScoredChunk;

/// Turns a prompt into free text.
pub trait AnswerGenerator: Send + Sync {
    fn generate(&self, prompt: &Prompt) -> RagResult<String>;

    /// Minimal round trip used by `docent check`.
    fn ping(&self) -> RagResult<String>;

    fn model(&self) -> &str;
}

/// An answer with the chunks it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub chunks: Vec<ScoredChunk>,
}

/// Retrieve, then generate, in one pass.
#[derive(Clone)]
pub struct Answerer {
    retrieval: RetrievalService,
    generator: Arc<dyn AnswerGenerator>,
}

impl Answerer {
    pub fn new(retrieval: RetrievalService, generator: Arc<dyn AnswerGenerator>) -> Self {
        Self {
            retrieval,
            generator,
        }
    }

    pub fn retrieval(&self) -> &RetrievalService {
        &self.retrieval
    }

    pub fn ask(&self, question: &str, k: Option<usize>) -> RagResult<Answer> {
        if question.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }
        let chunks = self.retrieval.retrieve(question, k)?;
        if chunks.is_empty() {
            tracing::info!("no chunks retrieved; skipping generation");
            return Ok(Answer {
                answer: INSUFFICIENT_CONTEXT.to_string(),
                chunks,
            });
        }

        let prompt = Prompt::new(question, &chunks);
        let answer = self.generator.generate(&prompt)?;
        Ok(Answer { answer, chunks })
    }
}

impl std::fmt::Debug for Answerer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Answerer")
            .field("retrieval", &self.retrieval)
            .field("generator", &self.generator.model())
            .finish()
    }
}
