//! The in-memory vector index.
//!
//! A `VectorIndex` is the set of chunk entries plus an optional k-means
//! partition. Small indexes are searched exhaustively; once an index reaches
//! the partition threshold it is split into ⌈√n⌉ partitions (capped) and
//! search only scores entries in the partitions nearest to the query.

use std::path::Path;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::error::RagResult;
use crate::types::Chunk;
use crate::vector::clustering::{kmeans_clustering, partition_count, rank_centroids};
use crate::vector::storage;
use crate::vector::types::{ClusterId, DistanceMetric, Score, VectorDimension, VectorError};

/// Seed for partitioning so rebuilding the same entries gives the same layout.
const PARTITION_SEED: u64 = 0x5eed_d0c5;

/// One embedding vector with its originating chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Build-time parameters.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub metric: DistanceMetric,
    /// Embedding model identifier recorded in the artifact
    pub model: String,
    /// Entry count at which the index is partitioned
    pub partition_threshold: usize,
    pub max_partitions: usize,
    /// Partitions scored per query
    pub probe_clusters: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Cosine,
            model: String::new(),
            partition_threshold: 10_000,
            max_partitions: 100,
            probe_clusters: 4,
        }
    }
}

/// K-means partition: centroids plus the member entries of each.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub centroids: Vec<Vec<f32>>,
    pub assignments: Vec<ClusterId>,
    members: Vec<Vec<usize>>,
}

impl Partition {
    pub fn new(centroids: Vec<Vec<f32>>, assignments: Vec<ClusterId>) -> Self {
        let mut members = vec![Vec::new(); centroids.len()];
        for (entry, cluster) in assignments.iter().enumerate() {
            if let Some(list) = members.get_mut(cluster.index()) {
                list.push(entry);
            }
        }
        Self {
            centroids,
            assignments,
            members,
        }
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }
}

/// A chunk with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub score: Score,
}

/// Summary of a loaded or freshly built index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub entries: usize,
    pub dimension: usize,
    pub metric: DistanceMetric,
    pub model: String,
    pub sources: usize,
    pub partitions: usize,
    pub created_at: DateTime<Utc>,
}

/// Read-only once built; searches never mutate it.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: VectorDimension,
    metric: DistanceMetric,
    model: String,
    created_at: DateTime<Utc>,
    entries: Vec<IndexEntry>,
    partition: Option<Partition>,
    probe_clusters: usize,
}

impl VectorIndex {
    /// Builds an index, partitioning it when it is large enough.
    ///
    /// Fails with `DimensionMismatch` if any vector differs from `dimension`.
    pub fn build(
        dimension: VectorDimension,
        entries: Vec<IndexEntry>,
        options: &IndexOptions,
    ) -> Result<Self, VectorError> {
        for entry in &entries {
            dimension.validate_vector(&entry.vector)?;
            if entry.vector.iter().any(|v| !v.is_finite()) {
                return Err(VectorError::NonFinite {
                    context: "index vector",
                });
            }
        }

        let partition = if entries.len() >= options.partition_threshold.max(1) && entries.len() > 1
        {
            let k = partition_count(entries.len(), options.max_partitions);
            let vectors: Vec<&[f32]> = entries.iter().map(|e| e.vector.as_slice()).collect();
            let mut rng = StdRng::seed_from_u64(PARTITION_SEED);
            let result = kmeans_clustering(&vectors, k, options.metric, &mut rng)?;
            tracing::debug!(
                "partitioned {} entries into {k} clusters in {} iterations",
                entries.len(),
                result.iterations
            );
            Some(Partition::new(result.centroids, result.assignments))
        } else {
            None
        };

        Ok(Self {
            dimension,
            metric: options.metric,
            model: options.model.clone(),
            created_at: Utc::now(),
            entries,
            partition,
            probe_clusters: options.probe_clusters.max(1),
        })
    }

    /// Reassembles an index from its persisted parts.
    pub(crate) fn from_parts(
        dimension: VectorDimension,
        metric: DistanceMetric,
        model: String,
        created_at: DateTime<Utc>,
        entries: Vec<IndexEntry>,
        partition: Option<Partition>,
    ) -> Self {
        Self {
            dimension,
            metric,
            model,
            created_at,
            entries,
            partition,
            probe_clusters: IndexOptions::default().probe_clusters,
        }
    }

    /// Overrides how many partitions a query scores.
    #[must_use]
    pub fn with_probe_clusters(mut self, probe: usize) -> Self {
        self.probe_clusters = probe.max(1);
        self
    }

    /// Loads an index saved with [`VectorIndex::save`].
    pub fn load(path: &Path) -> RagResult<Self> {
        storage::read_index(path)
    }

    /// Atomically replaces the artifact at `path`.
    pub fn save(&self, path: &Path) -> RagResult<()> {
        storage::write_index(self, path)
    }

    /// At most `k` results, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, VectorError> {
        self.dimension.validate_vector(query)?;
        if query.iter().any(|v| !v.is_finite()) {
            return Err(VectorError::NonFinite {
                context: "query vector",
            });
        }

        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<(usize, f32)> = match &self.partition {
            Some(partition) if !partition.is_empty() => self.probe(partition, query, k),
            _ => self
                .entries
                .iter()
                .enumerate()
                .map(|(i, e)| (i, self.metric.distance(query, &e.vector)))
                .collect(),
        };

        // Ties keep source order
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        candidates.truncate(k);

        candidates
            .into_iter()
            .map(|(i, distance)| {
                Ok(ScoredChunk {
                    chunk: self.entries[i].chunk.clone(),
                    score: Score::new(self.metric.score(distance))?,
                })
            })
            .collect()
    }

    /// Scores entries of the nearest partitions until `probe_clusters`
    /// partitions and at least `k` candidates have been seen.
    fn probe(&self, partition: &Partition, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut candidates = Vec::new();
        for (probed, cluster) in rank_centroids(query, &partition.centroids, self.metric)
            .into_iter()
            .enumerate()
        {
            if probed >= self.probe_clusters && candidates.len() >= k {
                break;
            }
            for &i in &partition.members[cluster] {
                candidates.push((i, self.metric.distance(query, &self.entries[i].vector)));
            }
        }
        candidates
    }

    pub fn stats(&self) -> IndexStats {
        let mut sources: Vec<&str> = self
            .entries
            .iter()
            .map(|e| e.chunk.source_id.as_str())
            .collect();
        sources.sort_unstable();
        sources.dedup();

        IndexStats {
            entries: self.entries.len(),
            dimension: self.dimension.get(),
            metric: self.metric,
            model: self.model.clone(),
            sources: sources.len(),
            partitions: self.partition.as_ref().map_or(0, Partition::len),
            created_at: self.created_at,
        }
    }

    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn partition(&self) -> Option<&Partition> {
        self.partition.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
