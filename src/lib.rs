//! Retrieval-augmented question answering over a local document corpus.
//!
//! Ingestion loads documents, splits them into semantic chunks, embeds the
//! chunks and saves a vector index. Retrieval embeds a query and returns the
//! nearest chunks; the answer module turns them into a cited answer.

pub mod answer;
pub mod chunking;
pub mod config;
pub mod display;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod io;
pub mod remote;
pub mod retrieval;
#[cfg(feature = "http-server")]
pub mod server;
pub mod types;
pub mod vector;

pub use answer::{Answer, AnswerGenerator, Answerer, ChatGenerator};
pub use chunking::{ChunkerOptions, SemanticChunker};
pub use config::Settings;
pub use embedding::{EmbeddingClient, EmbeddingProvider, Throttle};
pub use error::{ErrorCategory, RagError, RagResult};
pub use ingest::{DocumentLoader, IngestReport, IngestStage, IngestionPipeline};
pub use retrieval::{IndexHandle, RetrievalService};
pub use types::{Chunk, Document, PageSpan};
pub use vector::{DistanceMetric, IndexOptions, ScoredChunk, VectorIndex};
