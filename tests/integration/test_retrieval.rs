//! Retrieval service and shared index handle.

use std::sync::{Arc, Barrier};
use std::thread;

use docent::embedding::{EmbeddingClient, EmbeddingProvider, Throttle};
use docent::retrieval::{IndexHandle, RetrievalService};
use docent::{RagError, RagResult, Settings};

use crate::common::{KeywordEmbedder, cat_and_stocks, keyword_client, keyword_pipeline};

/// Always answers with three-dimensional vectors.
struct NarrowEmbedder;

impl EmbeddingProvider for NarrowEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
    }

    fn model(&self) -> &str {
        "narrow"
    }
}

#[test]
fn test_retrieve_without_index_is_index_not_found() {
    let corpus = cat_and_stocks();
    let (client, provider) = keyword_client();
    let service = RetrievalService::new(Arc::new(IndexHandle::new(corpus.index_path())), client);

    let err = service.retrieve("Where did the cat sleep?", None).unwrap_err();
    assert!(matches!(err, RagError::IndexNotFound { .. }));
    assert_eq!(err.category().as_str(), "reingest");
    // The index is checked before any embedding call
    assert_eq!(provider.calls(), 0);
}

#[test]
fn test_first_retrieve_after_ingest_succeeds() {
    let corpus = cat_and_stocks();
    let (client, _) = keyword_client();
    let service = RetrievalService::new(
        Arc::new(IndexHandle::new(corpus.index_path())),
        client.clone(),
    );

    assert!(service.retrieve("cat", None).is_err());
    keyword_pipeline()
        .ingest(corpus.source(), &corpus.index_path())
        .unwrap();

    let results = service.retrieve("markets and stocks", Some(1)).unwrap();
    assert!(results[0].chunk.source_id.ends_with("stocks.txt"));
}

#[test]
fn test_concurrent_first_callers_share_one_load() {
    let corpus = cat_and_stocks();
    keyword_pipeline()
        .ingest(corpus.source(), &corpus.index_path())
        .unwrap();

    let handle = Arc::new(IndexHandle::new(corpus.index_path()));
    let barrier = Arc::new(Barrier::new(8));
    let loaded: Vec<_> = (0..8)
        .map(|_| {
            let handle = Arc::clone(&handle);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                handle.get().unwrap()
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|t| t.join().unwrap())
        .collect();

    assert_eq!(handle.load_count(), 1);
    assert!(loaded.iter().all(|index| Arc::ptr_eq(index, &loaded[0])));
}

#[test]
fn test_concurrent_queries_agree() {
    let corpus = cat_and_stocks();
    keyword_pipeline()
        .ingest(corpus.source(), &corpus.index_path())
        .unwrap();

    let (client, _) = keyword_client();
    let service = RetrievalService::new(Arc::new(IndexHandle::new(corpus.index_path())), client);

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let results = service.retrieve("The kitten purrs on the mat", Some(2)).unwrap();
                assert_eq!(results.len(), 2);
                assert!(results[0].chunk.source_id.ends_with("cat.txt"));
            });
        }
    });
    assert_eq!(service.handle().load_count(), 1);
}

#[test]
fn test_query_from_other_model_is_dimension_mismatch() {
    let corpus = cat_and_stocks();
    keyword_pipeline()
        .ingest(corpus.source(), &corpus.index_path())
        .unwrap();

    let client = EmbeddingClient::new(Arc::new(NarrowEmbedder), Arc::new(Throttle::unthrottled()));
    let service = RetrievalService::new(Arc::new(IndexHandle::new(corpus.index_path())), client);

    let err = service.retrieve("cat", None).unwrap_err();
    assert!(matches!(
        err,
        RagError::DimensionMismatch { expected, actual: 3 } if expected == KeywordEmbedder::dimension()
    ));
}

#[test]
fn test_service_from_settings() {
    let corpus = cat_and_stocks();
    keyword_pipeline()
        .ingest(corpus.source(), &corpus.index_path())
        .unwrap();

    let mut settings = Settings::default();
    settings.index_path = corpus.index_path();
    settings.retrieval.default_k = 1;
    settings.retrieval.max_k = 1;

    let service = RetrievalService::from_settings(&settings, keyword_client().0);
    assert_eq!(service.handle().path(), corpus.index_path().as_path());
    assert_eq!(service.retrieve("cat", Some(10)).unwrap().len(), 1);

    let stats = service.stats().unwrap();
    assert_eq!(stats.sources, 2);
    assert_eq!(stats.dimension, KeywordEmbedder::dimension());
}

#[test]
fn test_context_attributes_sources() {
    let corpus = cat_and_stocks();
    keyword_pipeline()
        .ingest(corpus.source(), &corpus.index_path())
        .unwrap();

    let (client, _) = keyword_client();
    let service = RetrievalService::new(Arc::new(IndexHandle::new(corpus.index_path())), client);
    let context = service.retrieve_context("cat", Some(2)).unwrap();

    assert!(context.text.starts_with("[1] "));
    assert!(context.text.contains("cat.txt\nThe cat sat. The cat slept."));
    assert!(context.text.contains("[2] "));
}
