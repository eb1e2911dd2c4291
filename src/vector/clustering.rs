//! K-means partitioning for large indexes.
//!
//! Centroids are seeded with K-means++ and refined with Lloyd iterations
//! under the index's own distance metric. For cosine indexes centroids are
//! kept at unit length so the cosine distance to a centroid stays meaningful.
//!
//! # Algorithm Details
//! - Initialization: K-means++
//! - Max iterations: 50
//! - Convergence: no assignment changes, or mean centroid shift below 1e-4
//!
//! Assignment is O(n * k * d) per iteration and runs on rayon.

use crate::vector::types::{ClusterId, DistanceMetric, VectorError};
use rand::Rng;
use rayon::prelude::*;
use thiserror::Error;

/// Maximum number of Lloyd iterations.
const MAX_ITERATIONS: usize = 50;

/// Convergence tolerance for centroid updates.
const CONVERGENCE_TOLERANCE: f32 = 1e-4;

const EPSILON: f32 = 1e-10;

/// Result of a K-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    pub centroids: Vec<Vec<f32>>,
    /// Cluster of each input vector, consistent with the final centroids
    pub assignments: Vec<ClusterId>,
    pub iterations: usize,
}

#[derive(Error, Debug)]
pub enum ClusteringError {
    #[error("Empty vector set provided for clustering")]
    EmptyVectorSet,

    #[error("Invalid cluster count: {0}\nSuggestion: Use k between 1 and the number of vectors")]
    InvalidClusterCount(usize),

    #[error(
        "Dimension mismatch in vectors\nSuggestion: Ensure all vectors come from the same embedding model"
    )]
    DimensionMismatch,

    #[error("Failed to initialize centroids")]
    InitializationFailed,
}

impl From<ClusteringError> for VectorError {
    fn from(err: ClusteringError) -> Self {
        VectorError::ClusteringFailed(err.to_string())
    }
}

/// Number of partitions for `n` entries: ⌈√n⌉ clamped to `[1, max]`.
#[must_use]
pub fn partition_count(n: usize, max: usize) -> usize {
    let k = (n as f64).sqrt().ceil() as usize;
    k.clamp(1, max.max(1)).min(n.max(1))
}

/// Performs K-means clustering on `vectors` under `metric`.
pub fn kmeans_clustering<R: Rng>(
    vectors: &[&[f32]],
    k: usize,
    metric: DistanceMetric,
    rng: &mut R,
) -> Result<KMeansResult, ClusteringError> {
    if vectors.is_empty() {
        return Err(ClusteringError::EmptyVectorSet);
    }

    if k == 0 || k > vectors.len() {
        return Err(ClusteringError::InvalidClusterCount(k));
    }

    let dimension = vectors[0].len();
    if vectors.iter().any(|v| v.len() != dimension) {
        return Err(ClusteringError::DimensionMismatch);
    }

    let mut centroids = initialize_centroids_kmeans_plus_plus(vectors, k, metric, rng)?;
    let mut assignments = assign_all(vectors, &centroids, metric);
    let mut iterations = 1;

    while iterations < MAX_ITERATIONS {
        iterations += 1;

        let new_centroids = update_centroids(vectors, &assignments, k, metric, rng);
        let movement = calculate_centroid_movement(&centroids, &new_centroids, metric);
        centroids = new_centroids;

        let new_assignments = assign_all(vectors, &centroids, metric);
        let converged = new_assignments == assignments;
        assignments = new_assignments;

        if converged || movement < CONVERGENCE_TOLERANCE {
            break;
        }
    }

    if iterations >= MAX_ITERATIONS {
        tracing::debug!("k-means stopped after {MAX_ITERATIONS} iterations without converging");
    }

    Ok(KMeansResult {
        centroids,
        assignments,
        iterations,
    })
}

/// Assigns a vector to its nearest centroid.
pub fn assign_to_nearest_centroid(
    vector: &[f32],
    centroids: &[Vec<f32>],
    metric: DistanceMetric,
) -> ClusterId {
    let mut best_distance = f32::INFINITY;
    let mut best_cluster = 0;

    for (i, centroid) in centroids.iter().enumerate() {
        let distance = metric.distance(vector, centroid);
        if distance < best_distance {
            best_distance = distance;
            best_cluster = i;
        }
    }

    ClusterId::new(best_cluster as u32)
}

/// Centroid indices ordered nearest first.
pub fn rank_centroids(query: &[f32], centroids: &[Vec<f32>], metric: DistanceMetric) -> Vec<usize> {
    let mut ranked: Vec<(usize, f32)> = centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, metric.distance(query, c)))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.into_iter().map(|(i, _)| i).collect()
}

fn assign_all(vectors: &[&[f32]], centroids: &[Vec<f32>], metric: DistanceMetric) -> Vec<ClusterId> {
    vectors
        .par_iter()
        .map(|vector| assign_to_nearest_centroid(vector, centroids, metric))
        .collect()
}

fn update_centroids<R: Rng>(
    vectors: &[&[f32]],
    assignments: &[ClusterId],
    k: usize,
    metric: DistanceMetric,
    rng: &mut R,
) -> Vec<Vec<f32>> {
    let dimension = vectors[0].len();
    let mut new_centroids = vec![vec![0.0; dimension]; k];
    let mut cluster_sizes = vec![0usize; k];

    for (vector, cluster_id) in vectors.iter().zip(assignments.iter()) {
        let idx = cluster_id.index();
        for (acc, &value) in new_centroids[idx].iter_mut().zip(vector.iter()) {
            *acc += value;
        }
        cluster_sizes[idx] += 1;
    }

    for (centroid, &size) in new_centroids.iter_mut().zip(cluster_sizes.iter()) {
        if size == 0 {
            // Empty cluster: reseed from a random member
            let random_idx = rng.random_range(0..vectors.len());
            *centroid = prepare_centroid(vectors[random_idx], metric);
        } else {
            for value in centroid.iter_mut() {
                *value /= size as f32;
            }
            if metric == DistanceMetric::Cosine {
                normalize_vector(centroid);
            }
        }
    }

    new_centroids
}

fn initialize_centroids_kmeans_plus_plus<R: Rng>(
    vectors: &[&[f32]],
    k: usize,
    metric: DistanceMetric,
    rng: &mut R,
) -> Result<Vec<Vec<f32>>, ClusteringError> {
    let mut centroids = Vec::with_capacity(k);

    let first_idx = rng.random_range(0..vectors.len());
    centroids.push(prepare_centroid(vectors[first_idx], metric));

    // Squared distance of every vector to its nearest chosen centroid
    let mut nearest: Vec<f32> = vectors
        .iter()
        .map(|v| squared(metric.distance(v, &centroids[0])))
        .collect();

    while centroids.len() < k {
        let total: f32 = nearest.iter().sum();

        let next_idx = if total < EPSILON {
            // Every point coincides with a centroid; take any point not yet used
            nearest
                .iter()
                .position(|&d| d > 0.0)
                .unwrap_or(centroids.len() % vectors.len())
        } else {
            let target = rng.random::<f32>() * total;
            let mut cumulative = 0.0;
            nearest
                .iter()
                .position(|&d| {
                    cumulative += d;
                    cumulative >= target
                })
                .unwrap_or(vectors.len() - 1)
        };

        let centroid = prepare_centroid(vectors[next_idx], metric);
        for (slot, vector) in nearest.iter_mut().zip(vectors.iter()) {
            *slot = slot.min(squared(metric.distance(vector, &centroid)));
        }
        centroids.push(centroid);
    }

    if centroids.len() != k {
        return Err(ClusteringError::InitializationFailed);
    }

    Ok(centroids)
}

fn calculate_centroid_movement(old: &[Vec<f32>], new: &[Vec<f32>], metric: DistanceMetric) -> f32 {
    old.iter()
        .zip(new.iter())
        .map(|(old_c, new_c)| metric.distance(old_c, new_c))
        .sum::<f32>()
        / old.len() as f32
}

fn squared(x: f32) -> f32 {
    x * x
}

fn prepare_centroid(vector: &[f32], metric: DistanceMetric) -> Vec<f32> {
    let mut centroid = vector.to_vec();
    if metric == DistanceMetric::Cosine {
        normalize_vector(&mut centroid);
    }
    centroid
}

/// Normalizes a vector in-place to unit length; near-zero vectors are left as-is.
fn normalize_vector(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > EPSILON {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
