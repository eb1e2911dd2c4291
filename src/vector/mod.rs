//! Vector index: chunk vectors plus chunk text, searchable by similarity.
//!
//! # Architecture
//! Small indexes are searched exhaustively. Large ones are partitioned with
//! K-means at build time (IVF-style) and queries only score the entries of
//! the partitions nearest to the query vector. The index is persisted as a
//! single checksummed file and loaded through a memory map.

mod clustering;
mod index;
mod storage;
mod types;

pub use clustering::{
    ClusteringError, KMeansResult, assign_to_nearest_centroid, kmeans_clustering, partition_count,
};
pub use index::{IndexEntry, IndexOptions, IndexStats, Partition, ScoredChunk, VectorIndex};
pub use types::{
    ClusterId, DistanceMetric, Score, VectorDimension, VectorError, cosine_similarity,
    euclidean_distance,
};
