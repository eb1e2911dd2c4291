//! Breakpoint-based semantic chunking.
//!
//! Each document is split into sentences, every sentence is embedded, and
//! the cosine distance between consecutive sentences is measured. Distances
//! at or above a percentile threshold mark chunk boundaries.

use serde::{Deserialize, Serialize};

use crate::chunking::sentences::{Sentence, split_sentences};
use crate::embedding::EmbeddingClient;
use crate::error::{RagError, RagResult};
use crate::types::{Chunk, Document};
use crate::vector::cosine_similarity;

/// Population the breakpoint threshold is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakpointScope {
    /// One threshold per document
    #[default]
    Document,
    /// One threshold over the distances of every document in the run
    Corpus,
}

#[derive(Debug, Clone)]
pub struct ChunkerOptions {
    /// Percentile in [0, 100]
    pub breakpoint_percentile: f32,
    pub scope: BreakpointScope,
    /// Neighbors on each side embedded together with a sentence
    pub buffer_size: usize,
    /// Maximum sentences per embedding request
    pub batch_size: usize,
}

impl Default for ChunkerOptions {
    fn default() -> Self {
        Self {
            breakpoint_percentile: 95.0,
            scope: BreakpointScope::Document,
            buffer_size: 0,
            batch_size: 64,
        }
    }
}

pub struct SemanticChunker {
    client: EmbeddingClient,
    options: ChunkerOptions,
}

/// Sentences of one document plus their consecutive distances.
struct Plan<'a> {
    document: &'a Document,
    sentences: Vec<Sentence>,
    /// `None` when the document is kept whole without measuring
    distances: Option<Vec<f32>>,
}

impl SemanticChunker {
    pub fn new(client: EmbeddingClient, options: ChunkerOptions) -> RagResult<Self> {
        let p = options.breakpoint_percentile;
        if !(0.0..=100.0).contains(&p) {
            return Err(RagError::config(format!(
                "breakpoint percentile {p} is outside [0, 100]"
            )));
        }
        Ok(Self { client, options })
    }

    pub fn options(&self) -> &ChunkerOptions {
        &self.options
    }

    /// Chunks every document, in input order.
    ///
    /// Positions restart at 0 for each source. Blank documents yield nothing.
    pub fn chunk(&self, documents: &[Document]) -> RagResult<Vec<Chunk>> {
        let plans = documents
            .iter()
            .map(|doc| self.plan(doc))
            .collect::<RagResult<Vec<_>>>()?;

        let corpus_threshold = match self.options.scope {
            BreakpointScope::Corpus => {
                let pooled: Vec<f32> = plans
                    .iter()
                    .filter_map(|p| p.distances.as_deref())
                    .flatten()
                    .copied()
                    .collect();
                usable_threshold(&pooled, self.options.breakpoint_percentile)
            }
            BreakpointScope::Document => None,
        };

        let mut chunks = Vec::new();
        for plan in &plans {
            let threshold = match self.options.scope {
                BreakpointScope::Document => plan
                    .distances
                    .as_deref()
                    .and_then(|d| usable_threshold(d, self.options.breakpoint_percentile)),
                BreakpointScope::Corpus => corpus_threshold.filter(|_| {
                    plan.distances
                        .as_deref()
                        .is_some_and(|d| d.iter().all(|v| v.is_finite()))
                }),
            };
            let produced = assemble(plan, threshold);
            tracing::debug!(
                "{}: {} sentences -> {} chunks",
                plan.document.source.display(),
                plan.sentences.len(),
                produced.len()
            );
            chunks.extend(produced);
        }

        Ok(chunks)
    }

    /// Chunks a single document.
    pub fn chunk_document(&self, document: &Document) -> RagResult<Vec<Chunk>> {
        self.chunk(std::slice::from_ref(document))
    }

    fn plan<'a>(&self, document: &'a Document) -> RagResult<Plan<'a>> {
        let sentences = split_sentences(&document.text);
        if sentences.len() < 2 {
            return Ok(Plan {
                document,
                sentences,
                distances: None,
            });
        }

        let text = &document.text;
        let b = self.options.buffer_size;
        let windows: Vec<&str> = (0..sentences.len())
            .map(|i| {
                let first = i.saturating_sub(b);
                let last = (i + b).min(sentences.len() - 1);
                &text[sentences[first].start..sentences[last].end]
            })
            .collect();

        let vectors = self.client.embed_batched(&windows, self.options.batch_size)?;
        let distances = vectors
            .windows(2)
            .map(|pair| 1.0 - cosine_similarity(&pair[0], &pair[1]))
            .collect();

        Ok(Plan {
            document,
            sentences,
            distances: Some(distances),
        })
    }
}

/// Threshold for `distances`, or `None` when they carry no signal
/// (empty, all equal, or containing a non-finite value).
fn usable_threshold(distances: &[f32], percentile: f32) -> Option<f32> {
    if distances.is_empty() || distances.iter().any(|d| !d.is_finite()) {
        return None;
    }
    let min = distances.iter().copied().fold(f32::INFINITY, f32::min);
    let max = distances.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max - min <= f32::EPSILON {
        return None;
    }
    percentile_linear(distances, percentile)
}

/// Percentile with linear interpolation between closest ranks.
pub fn percentile_linear(values: &[f32], percentile: f32) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);

    let rank = (percentile.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f32;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Groups sentences between boundaries into chunks.
fn assemble(plan: &Plan<'_>, threshold: Option<f32>) -> Vec<Chunk> {
    let sentences = &plan.sentences;
    if sentences.is_empty() {
        return Vec::new();
    }

    let mut groups: Vec<(usize, usize)> = Vec::new();
    let mut group_start = 0;
    if let (Some(threshold), Some(distances)) = (threshold, plan.distances.as_deref()) {
        for (i, &distance) in distances.iter().enumerate() {
            if distance >= threshold {
                groups.push((group_start, i));
                group_start = i + 1;
            }
        }
    }
    groups.push((group_start, sentences.len() - 1));

    let doc = plan.document;
    let source_id = doc.source_id();
    groups
        .into_iter()
        .filter(|(first, last)| first <= last)
        .enumerate()
        .map(|(position, (first, last))| {
            let start = sentences[first].start;
            let end = sentences[last].end;
            Chunk {
                text: doc.text[start..end].to_string(),
                source_id: source_id.clone(),
                position: position as u32,
                start,
                end,
                page: doc.page_at(start),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingProvider, Throttle};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Topic vectors keyed on a handful of words.
    struct TopicProvider {
        requests: Mutex<usize>,
    }

    impl EmbeddingProvider for TopicProvider {
        fn embed_batch(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>> {
            *self.requests.lock() += 1;
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    vec![
                        if t.contains("cat") { 1.0 } else { 0.0 },
                        if t.contains("stock") || t.contains("market") { 1.0 } else { 0.0 },
                        0.1,
                    ]
                })
                .collect())
        }

        fn model(&self) -> &str {
            "topic"
        }
    }

    fn chunker(options: ChunkerOptions) -> (SemanticChunker, Arc<TopicProvider>) {
        let provider = Arc::new(TopicProvider {
            requests: Mutex::new(0),
        });
        let client = EmbeddingClient::new(provider.clone(), Arc::new(Throttle::unthrottled()));
        (SemanticChunker::new(client, options).unwrap(), provider)
    }

    #[test]
    fn test_single_sentence_is_one_chunk_without_embedding() {
        let (chunker, provider) = chunker(ChunkerOptions::default());
        let doc = Document::new("one.txt", "  Only one sentence here.\n");

        let chunks = chunker.chunk_document(&doc).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Only one sentence here.");
        assert_eq!(chunks[0].position, 0);
        assert_eq!(*provider.requests.lock(), 0);
    }

    #[test]
    fn test_blank_document_yields_nothing() {
        let (chunker, _) = chunker(ChunkerOptions::default());
        assert!(chunker.chunk_document(&Document::new("e.txt", " \n ")).unwrap().is_empty());
    }

    #[test]
    fn test_topic_shift_becomes_boundary() {
        let (chunker, _) = chunker(ChunkerOptions::default());
        let doc = Document::new(
            "mixed.txt",
            "The cat sat. The cat slept. Stocks rose today. Markets are volatile.",
        );

        let chunks = chunker.chunk_document(&doc).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "The cat sat. The cat slept.");
        assert_eq!(chunks[1].text, "Stocks rose today. Markets are volatile.");
        assert_eq!(chunks[1].position, 1);
        assert_eq!(&doc.text[chunks[1].start..chunks[1].end], chunks[1].text);
    }

    #[test]
    fn test_identical_distances_keep_document_whole() {
        let (chunker, _) = chunker(ChunkerOptions::default());
        let doc = Document::new("same.txt", "The cat sat. The cat slept. The cat purred.");
        let chunks = chunker.chunk_document(&doc).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, doc.text);
    }

    #[test]
    fn test_positions_restart_per_source() {
        let (chunker, _) = chunker(ChunkerOptions::default());
        let docs = vec![
            Document::new("a.txt", "The cat sat. The cat slept. Stocks rose. Markets fell."),
            Document::new("b.txt", "Stocks rose. The cat sat. The cat slept. The cat ate."),
        ];
        let chunks = chunker.chunk(&docs).unwrap();
        let a: Vec<u32> = chunks.iter().filter(|c| c.source_id == "a.txt").map(|c| c.position).collect();
        let b: Vec<u32> = chunks.iter().filter(|c| c.source_id == "b.txt").map(|c| c.position).collect();
        assert_eq!(a, vec![0, 1]);
        assert_eq!(b, vec![0, 1]);
    }

    #[test]
    fn test_corpus_scope_pools_distances() {
        let (chunker, _) = chunker(ChunkerOptions {
            breakpoint_percentile: 90.0,
            scope: BreakpointScope::Corpus,
            ..ChunkerOptions::default()
        });
        // b.txt never changes topic, so the pooled threshold leaves it whole
        let docs = vec![
            Document::new("a.txt", "The cat sat. Stocks rose."),
            Document::new("b.txt", "The cat sat. The cat slept. The cat ate."),
        ];
        let chunks = chunker.chunk(&docs).unwrap();
        assert_eq!(chunks.iter().filter(|c| c.source_id == "a.txt").count(), 2);
        assert_eq!(chunks.iter().filter(|c| c.source_id == "b.txt").count(), 1);
    }

    #[test]
    fn test_pages_are_attached() {
        let (chunker, _) = chunker(ChunkerOptions::default());
        let doc = Document::from_pages(
            "report.pdf",
            &["The cat sat. The cat slept.", "Stocks rose today. Markets fell."],
        );
        let chunks = chunker.chunk_document(&doc).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].page, Some(1));
        assert_eq!(chunks[1].page, Some(2));
    }

    #[test]
    fn test_percentile_linear() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile_linear(&values, 0.0), Some(1.0));
        assert_eq!(percentile_linear(&values, 100.0), Some(4.0));
        assert!((percentile_linear(&values, 50.0).unwrap() - 2.5).abs() < 1e-6);
        assert!((percentile_linear(&values, 95.0).unwrap() - 3.85).abs() < 1e-5);
        assert_eq!(percentile_linear(&[], 50.0), None);
    }

    #[test]
    fn test_non_finite_distances_are_unusable() {
        assert_eq!(usable_threshold(&[0.1, f32::NAN], 95.0), None);
        assert_eq!(usable_threshold(&[0.3, 0.3, 0.3], 95.0), None);
        assert!(usable_threshold(&[0.1, 0.9], 95.0).is_some());
    }

    #[test]
    fn test_rejects_out_of_range_percentile() {
        let provider = Arc::new(TopicProvider {
            requests: Mutex::new(0),
        });
        let client = EmbeddingClient::new(provider, Arc::new(Throttle::unthrottled()));
        let options = ChunkerOptions {
            breakpoint_percentile: 120.0,
            ..ChunkerOptions::default()
        };
        assert!(SemanticChunker::new(client, options).is_err());
    }
}
