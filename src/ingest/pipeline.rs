//! One-shot ingestion: load, chunk, embed, build, save.
//!
//! Nothing is written until the final save, and the save replaces the
//! previous artifact atomically, so a failed run leaves the old index intact.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::chunking::SemanticChunker;
use crate::config::Settings;
use crate::embedding::EmbeddingClient;
use crate::error::{RagError, RagResult};
use crate::ingest::loader::{DocumentLoader, SkippedFile};
use crate::vector::{IndexEntry, IndexOptions, VectorDimension, VectorIndex};

/// How far an ingestion run got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Loading,
    Chunking,
    Embedding,
    Building,
    Saving,
    Done,
}

impl IngestStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Loading => "Loading documents",
            Self::Chunking => "Chunking",
            Self::Embedding => "Embedding chunks",
            Self::Building => "Building index",
            Self::Saving => "Saving index",
            Self::Done => "Done",
        }
    }
}

impl std::fmt::Display for IngestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Counts collected during a run; also describes a run that stopped early.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub source: PathBuf,
    pub index_path: PathBuf,
    pub stage: IngestStage,
    pub documents_loaded: usize,
    pub skipped: Vec<SkippedFile>,
    pub chunks: usize,
    pub dimension: Option<usize>,
    pub partitions: usize,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl IngestReport {
    fn new(source: &Path, index_path: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            index_path: index_path.to_path_buf(),
            stage: IngestStage::Loading,
            documents_loaded: 0,
            skipped: Vec::new(),
            chunks: 0,
            dimension: None,
            partitions: 0,
            elapsed: Duration::ZERO,
        }
    }
}

pub struct IngestionPipeline {
    loader: DocumentLoader,
    chunker: SemanticChunker,
    client: EmbeddingClient,
    index_options: IndexOptions,
    /// Expected dimension; detected from the first vector when unset
    dimension: Option<usize>,
    batch_size: usize,
}

impl IngestionPipeline {
    pub fn new(
        loader: DocumentLoader,
        chunker: SemanticChunker,
        client: EmbeddingClient,
        index_options: IndexOptions,
    ) -> Self {
        let batch_size = chunker.options().batch_size;
        Self {
            loader,
            chunker,
            client,
            index_options,
            dimension: None,
            batch_size,
        }
    }

    /// Wires a pipeline from settings around an existing client.
    pub fn from_settings(settings: &Settings, client: EmbeddingClient) -> RagResult<Self> {
        let chunker = SemanticChunker::new(client.clone(), settings.chunker_options())?;
        let mut options = settings.index_options();
        options.model = client.model().to_string();
        Ok(Self::new(
            DocumentLoader::from_config(&settings.ingest),
            chunker,
            client,
            options,
        )
        .with_dimension(settings.embedding.dimension))
    }

    #[must_use]
    pub fn with_dimension(mut self, dimension: Option<usize>) -> Self {
        self.dimension = dimension;
        self
    }

    #[must_use]
    pub fn with_loader(mut self, loader: DocumentLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn ingest(&self, source: &Path, index_path: &Path) -> RagResult<IngestReport> {
        self.ingest_with_progress(source, index_path, &mut |_| {})
    }

    /// Runs the pipeline, reporting each stage before it starts.
    ///
    /// The last report handed to `progress` describes where a failed run stopped.
    pub fn ingest_with_progress(
        &self,
        source: &Path,
        index_path: &Path,
        progress: &mut dyn FnMut(&IngestReport),
    ) -> RagResult<IngestReport> {
        let started = Instant::now();
        let mut report = IngestReport::new(source, index_path);
        let mut advance = |report: &mut IngestReport, stage: IngestStage| {
            report.stage = stage;
            report.elapsed = started.elapsed();
            progress(report);
        };

        advance(&mut report, IngestStage::Loading);
        let outcome = self.loader.load_all(source)?;
        report.documents_loaded = outcome.documents.len();
        report.skipped = outcome.skipped;
        if outcome.documents.is_empty() {
            advance(&mut report, IngestStage::Loading);
            return Err(RagError::NoDocumentsFound {
                path: source.to_path_buf(),
                extensions: self.loader.extensions().join(", "),
            });
        }

        advance(&mut report, IngestStage::Chunking);
        let chunks = self.chunker.chunk(&outcome.documents)?;
        report.chunks = chunks.len();
        drop(outcome.documents);

        advance(&mut report, IngestStage::Embedding);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self.client.embed_batched(&texts, self.batch_size)?;

        advance(&mut report, IngestStage::Building);
        let detected = self
            .dimension
            .or_else(|| vectors.first().map(Vec::len))
            .ok_or_else(|| RagError::NoDocumentsFound {
                path: source.to_path_buf(),
                extensions: self.loader.extensions().join(", "),
            })?;
        let dimension = VectorDimension::new(detected)?;
        report.dimension = Some(dimension.get());

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();
        let index = VectorIndex::build(dimension, entries, &self.index_options)?;
        report.partitions = index.stats().partitions;

        advance(&mut report, IngestStage::Saving);
        index.save(index_path)?;

        advance(&mut report, IngestStage::Done);
        tracing::info!(
            "Indexed {} chunks from {} documents into {}",
            report.chunks,
            report.documents_loaded,
            index_path.display()
        );
        Ok(report)
    }
}
