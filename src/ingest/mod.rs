//! Corpus ingestion: document loading and the build pipeline.

pub mod loader;
mod pipeline;

pub use loader::{DocumentLoader, IGNORE_FILE, LoadOutcome, SkippedFile, load_file};
pub use pipeline::{IngestReport, IngestStage, IngestionPipeline};
