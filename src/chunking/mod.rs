//! Semantic chunking of documents into retrievable passages.

mod semantic;
mod sentences;

pub use semantic::{BreakpointScope, ChunkerOptions, SemanticChunker, percentile_linear};
pub use sentences::{Sentence, split_sentences};
