//! End-to-end ingestion over temporary corpora with keyword embeddings.

use std::collections::HashSet;
use std::sync::Arc;

use docent::chunking::{BreakpointScope, ChunkerOptions};
use docent::ingest::IngestStage;
use docent::retrieval::{IndexHandle, RetrievalService};
use docent::{RagError, VectorIndex};

use crate::common::{TestCorpus, cat_and_stocks, keyword_client, keyword_pipeline, pipeline_with};

fn low_percentile() -> ChunkerOptions {
    ChunkerOptions {
        breakpoint_percentile: 10.0,
        ..ChunkerOptions::default()
    }
}

#[test]
fn test_cat_question_finds_cat_document() {
    let corpus = cat_and_stocks();
    let (client, _) = keyword_client();
    let report = pipeline_with(client.clone(), low_percentile())
        .ingest(corpus.source(), &corpus.index_path())
        .unwrap();
    assert!(report.chunks >= 2);

    let service = RetrievalService::new(Arc::new(IndexHandle::new(corpus.index_path())), client);
    let results = service.retrieve("Where did the cat sleep?", Some(1)).unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].chunk.source_id.ends_with("cat.txt"));
    assert!(results[0].chunk.text.contains("The cat slept."));
}

#[test]
fn test_topic_shift_splits_document() {
    let corpus = TestCorpus::new();
    corpus.add_file(
        "mixed.txt",
        "The cat sat. The cat slept. Stocks rose today. Markets are volatile.",
    );

    let report = keyword_pipeline()
        .ingest(corpus.source(), &corpus.index_path())
        .unwrap();
    assert_eq!(report.chunks, 2);

    let index = VectorIndex::load(&corpus.index_path()).unwrap();
    let texts: Vec<&str> = index.entries().iter().map(|e| e.chunk.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["The cat sat. The cat slept.", "Stocks rose today. Markets are volatile."]
    );
    let positions: Vec<u32> = index.entries().iter().map(|e| e.chunk.position).collect();
    assert_eq!(positions, vec![0, 1]);
}

#[test]
fn test_corpus_scope_uses_one_threshold() {
    let corpus = TestCorpus::new();
    corpus.add_file("a.txt", "The cat sat. Stocks rose today.");
    corpus.add_file("b.txt", "The cat sat. The kitten slept.");

    let options = ChunkerOptions {
        scope: BreakpointScope::Corpus,
        breakpoint_percentile: 50.0,
        ..ChunkerOptions::default()
    };
    let report = pipeline_with(keyword_client().0, options)
        .ingest(corpus.source(), &corpus.index_path())
        .unwrap();

    // a.txt splits at the topic change; b.txt stays whole
    assert_eq!(report.chunks, 3);
}

#[test]
fn test_single_sentence_document_is_one_chunk() {
    let corpus = TestCorpus::new();
    corpus.add_file("one.md", "The tenant gives notice in writing.");

    let report = keyword_pipeline()
        .ingest(corpus.source(), &corpus.index_path())
        .unwrap();
    assert_eq!(report.chunks, 1);

    let index = VectorIndex::load(&corpus.index_path()).unwrap();
    assert_eq!(index.entries()[0].chunk.text, "The tenant gives notice in writing.");
}

#[test]
fn test_every_document_is_indexed() {
    let corpus = cat_and_stocks();
    corpus.add_file("weather.rst", "Rain is in the forecast. A storm may follow.");
    corpus.add_file("notes.docx", "not loaded");
    corpus.add_file(".hidden.txt", "The cat is hidden.");

    let report = keyword_pipeline()
        .ingest(corpus.source(), &corpus.index_path())
        .unwrap();

    assert_eq!(report.stage, IngestStage::Done);
    assert_eq!(report.documents_loaded, 3);
    assert_eq!(report.skipped.len(), 1);

    let index = VectorIndex::load(&corpus.index_path()).unwrap();
    assert_eq!(index.len(), report.chunks);
    assert_eq!(index.model(), "keyword-test");

    let sources: HashSet<&str> = index
        .entries()
        .iter()
        .map(|e| e.chunk.source_id.as_str())
        .collect();
    assert_eq!(sources.len(), 3);
    assert!(sources.iter().all(|s| !s.contains(".hidden")));
}

#[test]
fn test_reingest_is_idempotent() {
    let corpus = cat_and_stocks();
    let pipeline = keyword_pipeline();

    let first = pipeline.ingest(corpus.source(), &corpus.index_path()).unwrap();
    let before = VectorIndex::load(&corpus.index_path()).unwrap();
    let second = pipeline.ingest(corpus.source(), &corpus.index_path()).unwrap();
    let after = VectorIndex::load(&corpus.index_path()).unwrap();

    assert_eq!(first.chunks, second.chunks);
    assert_eq!(before.entries(), after.entries());
}

#[test]
fn test_failed_ingest_keeps_previous_index() {
    let corpus = cat_and_stocks();
    let pipeline = keyword_pipeline();
    let report = pipeline.ingest(corpus.source(), &corpus.index_path()).unwrap();

    let empty = TestCorpus::new();
    let err = pipeline
        .ingest(empty.source(), &corpus.index_path())
        .unwrap_err();
    assert!(matches!(err, RagError::NoDocumentsFound { .. }));
    assert_eq!(err.status_code(), "NO_DOCUMENTS_FOUND");

    let index = VectorIndex::load(&corpus.index_path()).unwrap();
    assert_eq!(index.len(), report.chunks);
}

#[test]
fn test_missing_source_directory() {
    let corpus = TestCorpus::new();
    let err = keyword_pipeline()
        .ingest(&corpus.source().join("absent"), &corpus.index_path())
        .unwrap_err();
    assert_eq!(err.status_code(), "IO_ERROR");
    assert!(!corpus.index_path().exists());
}
