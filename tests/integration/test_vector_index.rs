//! Index build, persistence and search through the public API.

use std::fs;

use docent::types::Chunk;
use docent::vector::{DistanceMetric, IndexEntry, IndexOptions, VectorDimension, VectorIndex};
use docent::RagError;
use tempfile::TempDir;

fn entry(position: u32, source: &str, vector: Vec<f32>) -> IndexEntry {
    IndexEntry {
        chunk: Chunk {
            text: format!("chunk {position} of {source}"),
            source_id: source.to_string(),
            position,
            start: 0,
            end: 10,
            page: Some(position + 1),
        },
        vector,
    }
}

/// Vectors with distinct directions, deterministic across runs.
fn spread_entries(count: u32, dim: usize) -> Vec<IndexEntry> {
    (0..count)
        .map(|i| {
            let vector = (0..dim)
                .map(|d| ((i as f32 + 1.0) * (d as f32 + 1.3)).sin() + 0.01 * d as f32)
                .collect();
            entry(i, "spread.txt", vector)
        })
        .collect()
}

#[test]
fn test_known_vectors_rank_exact_match_first() {
    let entries = vec![
        entry(0, "a.txt", vec![1.0, 0.2, 0.0]),
        entry(1, "a.txt", vec![0.1, 1.0, 0.1]),
        entry(2, "a.txt", vec![0.0, 0.3, 1.0]),
    ];
    let index = VectorIndex::build(
        VectorDimension::new(3).unwrap(),
        entries,
        &IndexOptions::default(),
    )
    .unwrap();

    let results = index.search(&[0.1, 1.0, 0.1], 3).unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].chunk.position, 1);
    assert!((results[0].score.get() - 1.0).abs() < 1e-5);
    assert!(results[0].score > results[1].score);
    assert!(results[1].score >= results[2].score);
}

#[test]
fn test_round_trip_ranks_each_entry_first() {
    for metric in [DistanceMetric::Cosine, DistanceMetric::Euclidean] {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.dcx");
        let entries = spread_entries(25, 6);
        let options = IndexOptions {
            metric,
            model: "test-model".to_string(),
            ..IndexOptions::default()
        };

        VectorIndex::build(VectorDimension::new(6).unwrap(), entries.clone(), &options)
            .unwrap()
            .save(&path)
            .unwrap();
        let loaded = VectorIndex::load(&path).unwrap();

        assert_eq!(loaded.metric(), metric);
        assert_eq!(loaded.model(), "test-model");
        assert_eq!(loaded.entries(), entries.as_slice());
        for original in &entries {
            let top = loaded.search(&original.vector, 1).unwrap();
            assert_eq!(top[0].chunk, original.chunk);
            assert!(top[0].score.get() > 0.999);
        }
    }
}

#[test]
fn test_search_never_exceeds_k() {
    let index = VectorIndex::build(
        VectorDimension::new(4).unwrap(),
        spread_entries(5, 4),
        &IndexOptions::default(),
    )
    .unwrap();
    let query = [0.3, -0.2, 0.9, 0.1];

    assert_eq!(index.search(&query, 2).unwrap().len(), 2);
    assert_eq!(index.search(&query, 50).unwrap().len(), 5);
    assert!(index.search(&query, 0).unwrap().is_empty());
}

#[test]
fn test_empty_index_round_trips_and_returns_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.dcx");
    VectorIndex::build(VectorDimension::new(3).unwrap(), Vec::new(), &IndexOptions::default())
        .unwrap()
        .save(&path)
        .unwrap();

    let loaded = VectorIndex::load(&path).unwrap();
    assert!(loaded.is_empty());
    assert!(loaded.search(&[1.0, 0.0, 0.0], 4).unwrap().is_empty());
    assert_eq!(loaded.stats().sources, 0);
}

#[test]
fn test_query_dimension_is_checked() {
    let index = VectorIndex::build(
        VectorDimension::new(4).unwrap(),
        spread_entries(3, 4),
        &IndexOptions::default(),
    )
    .unwrap();
    let err: RagError = index.search(&[1.0, 0.0], 1).unwrap_err().into();
    assert!(matches!(
        err,
        RagError::DimensionMismatch {
            expected: 4,
            actual: 2
        }
    ));
}

#[test]
fn test_partitioned_index_survives_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("big.dcx");
    let entries = spread_entries(200, 8);
    let options = IndexOptions {
        partition_threshold: 50,
        max_partitions: 8,
        probe_clusters: 8,
        ..IndexOptions::default()
    };

    let built = VectorIndex::build(VectorDimension::new(8).unwrap(), entries.clone(), &options)
        .unwrap();
    assert_eq!(built.stats().partitions, 8);
    built.save(&path).unwrap();

    let loaded = VectorIndex::load(&path).unwrap().with_probe_clusters(8);
    assert_eq!(loaded.partition(), built.partition());

    // Probing every partition is exact search
    for original in entries.iter().step_by(17) {
        let top = loaded.search(&original.vector, 1).unwrap();
        assert_eq!(top[0].chunk, original.chunk);
    }
}

#[test]
fn test_damaged_artifact_is_corrupt_index() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.dcx");
    VectorIndex::build(
        VectorDimension::new(4).unwrap(),
        spread_entries(4, 4),
        &IndexOptions::default(),
    )
    .unwrap()
    .save(&path)
    .unwrap();

    let mut bytes = fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xff;
    fs::write(&path, &bytes).unwrap();

    let err = VectorIndex::load(&path).unwrap_err();
    assert!(matches!(err, RagError::CorruptIndex { .. }));
    assert_eq!(err.status_code(), "CORRUPT_INDEX");

    fs::write(&path, b"not an index").unwrap();
    assert!(matches!(
        VectorIndex::load(&path),
        Err(RagError::CorruptIndex { .. })
    ));
}
