//! Exact in-memory vector index using cosine similarity.
//!
//! [`VectorIndex`] keeps entries in insertion order and answers queries with a
//! brute-force scan. At on-device scales (hundreds to low thousands of
//! chunks) the scan is cheap, and it makes ranking fully deterministic: ties
//! are broken by insertion order, earlier first.
//!
//! The index is not synchronized; the pipeline owns it behind its lock.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::mem;

use serde::{Deserialize, Serialize};

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude. Sums are accumulated in
/// `f64`, so any finite `f32` vector has a finite norm. The result is clamped
/// to `[-1, 1]` to absorb rounding error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    similarity_with_norms(a, l2_norm(a), b, l2_norm(b))
}

fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}

fn similarity_with_norms(a: &[f32], norm_a: f64, b: &[f32], norm_b: f64) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(&x, &y)| f64::from(x) * f64::from(y)).sum();
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0) as f32
}

struct IndexEntry {
    chunk: Chunk,
    embedding: Vec<f32>,
    norm: f64,
}

/// Counters and sizes reported by [`VectorIndex::statistics`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStatistics {
    /// Entries currently stored.
    pub entries: usize,
    /// Fixed embedding dimension.
    pub dimension: usize,
    /// Estimated heap footprint in bytes.
    pub memory_bytes: usize,
    /// Entries inserted since the index was created.
    pub total_inserted: u64,
    /// Entries removed individually since the index was created.
    pub total_removed: u64,
    /// Number of times the index was cleared.
    pub clears: u64,
}

/// An exact cosine-similarity index over chunk embeddings.
///
/// Every stored embedding has exactly [`dimension`](Self::dimension)
/// components; anything else is rejected.
///
/// # Example
///
/// ```rust
/// use edge_rag::{Chunk, VectorIndex};
///
/// let mut index = VectorIndex::new(2);
/// let chunk = Chunk {
///     id: "chunk_0".into(),
///     text: "hello".into(),
///     metadata: None,
///     source_document_index: 0,
/// };
/// index.insert(chunk, vec![1.0, 0.0])?;
/// let hits = index.search(&[1.0, 0.0], 1)?;
/// assert_eq!(hits[0].chunk_id, "chunk_0");
/// # Ok::<(), edge_rag::RagError>(())
/// ```
pub struct VectorIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
    ids: HashSet<String>,
    total_inserted: u64,
    total_removed: u64,
    clears: u64,
}

impl VectorIndex {
    /// Create an empty index for embeddings of length `dimension`.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
            ids: HashSet::new(),
            total_inserted: 0,
            total_removed: 0,
            clears: 0,
        }
    }

    /// The fixed embedding dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Current entry count.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an entry with `chunk_id` is stored.
    pub fn contains(&self, chunk_id: &str) -> bool {
        self.ids.contains(chunk_id)
    }

    fn check_vector(&self, what: &str, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(RagError::InvalidInput(format!(
                "{what} dimension mismatch: expected {}, got {}",
                self.dimension,
                vector.len()
            )));
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(RagError::InvalidInput(format!("{what} contains non-finite values")));
        }
        Ok(())
    }

    /// Append one entry and return its chunk ID.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidInput`] if the embedding has the wrong
    /// dimension or non-finite components, or if the chunk ID is already stored.
    pub fn insert(&mut self, chunk: Chunk, embedding: Vec<f32>) -> Result<String> {
        self.check_vector("embedding", &embedding)?;
        if self.ids.contains(&chunk.id) {
            return Err(RagError::InvalidInput(format!("duplicate chunk id '{}'", chunk.id)));
        }
        Ok(self.push(chunk, embedding))
    }

    /// Append several entries, all or nothing.
    ///
    /// Every embedding and ID is validated before any entry is stored, so on
    /// error the index is unchanged.
    ///
    /// # Errors
    ///
    /// Same conditions as [`insert`](Self::insert), for any item in the batch.
    pub fn insert_batch(&mut self, items: Vec<(Chunk, Vec<f32>)>) -> Result<Vec<String>> {
        let mut batch_ids = HashSet::with_capacity(items.len());
        for (chunk, embedding) in &items {
            self.check_vector("embedding", embedding)?;
            if self.ids.contains(&chunk.id) || !batch_ids.insert(chunk.id.as_str()) {
                return Err(RagError::InvalidInput(format!("duplicate chunk id '{}'", chunk.id)));
            }
        }

        self.entries.reserve(items.len());
        Ok(items.into_iter().map(|(chunk, embedding)| self.push(chunk, embedding)).collect())
    }

    fn push(&mut self, chunk: Chunk, embedding: Vec<f32>) -> String {
        let id = chunk.id.clone();
        let norm = l2_norm(&embedding);
        self.ids.insert(id.clone());
        self.entries.push(IndexEntry { chunk, embedding, norm });
        self.total_inserted += 1;
        id
    }

    /// Return up to `top_k` entries ordered by descending cosine similarity to
    /// `query`; equal scores keep insertion order.
    ///
    /// An empty index yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidInput`] if `query` has the wrong dimension
    /// or non-finite components.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        self.check_vector("query embedding", query)?;
        if top_k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_norm = l2_norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                (position, similarity_with_norms(&entry.embedding, entry.norm, query, query_norm))
            })
            .collect();

        let rank = |a: &(usize, f32), b: &(usize, f32)| -> Ordering {
            b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
        };
        if top_k < scored.len() {
            scored.select_nth_unstable_by(top_k - 1, rank);
            scored.truncate(top_k);
        }
        scored.sort_unstable_by(rank);

        Ok(scored
            .into_iter()
            .map(|(position, score)| {
                let chunk = &self.entries[position].chunk;
                SearchResult {
                    chunk_id: chunk.id.clone(),
                    text: chunk.text.clone(),
                    similarity_score: score,
                    metadata: chunk.metadata.clone(),
                }
            })
            .collect())
    }

    /// Remove the entry with `chunk_id`. Returns whether one was removed.
    pub fn remove(&mut self, chunk_id: &str) -> bool {
        if !self.ids.remove(chunk_id) {
            return false;
        }
        self.entries.retain(|entry| entry.chunk.id != chunk_id);
        self.total_removed += 1;
        true
    }

    /// Drop all entries. Safe to call repeatedly.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.entries.shrink_to_fit();
        self.ids.clear();
        self.ids.shrink_to_fit();
        self.clears += 1;
    }

    /// Estimated heap footprint of the stored entries in bytes.
    ///
    /// Counts embeddings, chunk text and IDs; metadata is not included.
    pub fn memory_usage(&self) -> usize {
        let entries: usize = self
            .entries
            .iter()
            .map(|entry| {
                entry.embedding.capacity() * mem::size_of::<f32>()
                    + entry.chunk.text.capacity()
                    + entry.chunk.id.capacity() * 2
            })
            .sum();
        entries + self.entries.capacity() * mem::size_of::<IndexEntry>()
    }

    /// Snapshot of counters and sizes.
    pub fn statistics(&self) -> IndexStatistics {
        IndexStatistics {
            entries: self.entries.len(),
            dimension: self.dimension,
            memory_bytes: self.memory_usage(),
            total_inserted: self.total_inserted,
            total_removed: self.total_removed,
            clears: self.clears,
        }
    }
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("dimension", &self.dimension)
            .field("entries", &self.entries.len())
            .finish()
    }
}
