//! Prompt construction for grounded answers.

use crate::retrieval::format_context;
use crate::vector::ScoredChunk;

/// Returned without calling the model when retrieval found nothing.
pub const INSUFFICIENT_CONTEXT: &str =
    "The retrieved documents are not sufficient to answer this question.";

pub const SYSTEM_PROMPT: &str = "You are a document assistant. Answer only from the numbered \
context passages you are given. Do not invent information. Be concise.";

/// A system and user message pair for one question.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(question: &str, chunks: &[ScoredChunk]) -> Self {
        let context = format_context(chunks);
        let user = format!(
            "Context passages:\n\n{context}\n\n\
             Instructions:\n\
             1. Decide whether the passages above are sufficient to answer the question.\n\
             2. If they are, answer clearly in plain text (no markdown) with inline citations \
             such as [1] or [2] that refer to the passage numbers.\n\
             3. End with a \"Sources\" section listing each passage you used, one per line, \
             as its number and source.\n\
             4. If they are not sufficient, reply exactly: {INSUFFICIENT_CONTEXT}\n\n\
             Question: {}",
            question.trim()
        );
        Self {
            system: SYSTEM_PROMPT.to_string(),
            user,
        }
    }
}
