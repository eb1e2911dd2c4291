#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use docent::chunking::ChunkerOptions;
use docent::embedding::{EmbeddingClient, EmbeddingProvider, Throttle};
use docent::ingest::{DocumentLoader, IngestionPipeline};
use docent::{RagResult, SemanticChunker};
use docent::vector::IndexOptions;
use tempfile::TempDir;

/// Keyword groups; each group is one vector axis.
const TOPICS: &[&[&str]] = &[
    &["cat", "cats", "kitten", "sat", "slept", "sleep", "mat", "purr"],
    &["stock", "stocks", "market", "markets", "rose", "volatile", "shares", "price"],
    &["rain", "sun", "weather", "cloud", "storm", "forecast"],
    &["contract", "tenant", "rent", "notice", "lease", "landlord"],
];

/// Deterministic embeddings: one axis per topic plus a small constant axis
/// so no vector is all zeros.
#[derive(Default)]
pub struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn embed_text(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; TOPICS.len() + 1];
        for word in text.split(|c: char| !c.is_alphanumeric()) {
            let word = word.to_lowercase();
            for (axis, topic) in TOPICS.iter().enumerate() {
                if topic.contains(&word.as_str()) {
                    vector[axis] += 1.0;
                }
            }
        }
        vector[TOPICS.len()] = 0.05;
        vector
    }

    pub fn dimension() -> usize {
        TOPICS.len() + 1
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for KeywordEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::embed_text(t)).collect())
    }

    fn model(&self) -> &str {
        "keyword-test"
    }
}

pub fn keyword_client() -> (EmbeddingClient, Arc<KeywordEmbedder>) {
    let provider = Arc::new(KeywordEmbedder::default());
    let client = EmbeddingClient::new(provider.clone(), Arc::new(Throttle::unthrottled()));
    (client, provider)
}

pub fn pipeline_with(client: EmbeddingClient, options: ChunkerOptions) -> IngestionPipeline {
    let chunker = SemanticChunker::new(client.clone(), options).unwrap();
    IngestionPipeline::new(
        DocumentLoader::new(
            vec!["txt".into(), "md".into(), "rst".into(), "pdf".into()],
            false,
        ),
        chunker,
        client,
        IndexOptions {
            model: "keyword-test".to_string(),
            ..IndexOptions::default()
        },
    )
}

pub fn keyword_pipeline() -> IngestionPipeline {
    pipeline_with(keyword_client().0, ChunkerOptions::default())
}

/// A temporary document folder plus a separate output folder.
pub struct TestCorpus {
    pub docs: TempDir,
    pub out: TempDir,
}

impl TestCorpus {
    pub fn new() -> Self {
        Self {
            docs: TempDir::new().expect("Failed to create temp dir"),
            out: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn add_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.docs.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn source(&self) -> &Path {
        self.docs.path()
    }

    pub fn index_path(&self) -> PathBuf {
        self.out.path().join("index.dcx")
    }
}

/// The two-topic corpus: one document about a cat, one about markets.
pub fn cat_and_stocks() -> TestCorpus {
    let corpus = TestCorpus::new();
    corpus.add_file("cat.txt", "The cat sat. The cat slept.");
    corpus.add_file("stocks.txt", "Stocks rose today. Markets are volatile.");
    corpus
}
