//! Thread-safe in-memory vector index over profile chunks.
//!
//! Chunks live in a sharded concurrent map keyed by chunk id. Cosine
//! similarity is computed in f64 over the stored f32 vectors; search is
//! exact, sized for profile-scale corpora (dozens to hundreds of chunks).

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use vitae_core::{Result, VitaeError};

use crate::chunker::ProfileChunk;

/// A chunk as held by the store: the chunk plus its embedding.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use vitae_index::chunker::ProfileChunk;
/// use vitae_index::store::StoredChunk;
///
/// let stored = StoredChunk {
///     chunk: ProfileChunk {
///         id: "chunk-0".into(),
///         text: "Name: Ada".into(),
///         metadata: HashMap::new(),
///     },
///     embedding: vec![0.1, 0.2, 0.3],
/// };
/// assert_eq!(stored.embedding.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct StoredChunk {
    /// The chunk as produced by the chunker.
    pub chunk: ProfileChunk,
    /// The embedding it was stored under.
    pub embedding: Vec<f32>,
}

/// A hit from a similarity search: a copy of the stored chunk with its
/// score against the query vector.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The matched chunk (without embedding).
    pub chunk: ProfileChunk,
    /// Cosine similarity against the query, in [-1, 1].
    pub score: f64,
}

struct Entry {
    chunk: ProfileChunk,
    embedding: Vec<f32>,
    seq: u64,
}

/// In-memory vector index with exact top-K cosine search.
///
/// Safe for concurrent readers and writers; a search observes a
/// consistent per-key snapshot. The dimensionality is fixed at
/// construction and every insert is validated against it.
///
/// # Examples
///
/// ```
/// use vitae_index::store::VectorStore;
///
/// let store = VectorStore::new(3);
/// assert_eq!(store.len(), 0);
/// assert!(store.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
/// ```
pub struct VectorStore {
    chunks: DashMap<String, Entry>,
    dimensions: usize,
    insert_seq: AtomicU64,
}

impl VectorStore {
    /// Create an empty store for vectors of the given dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self {
            chunks: DashMap::new(),
            dimensions,
            insert_seq: AtomicU64::new(0),
        }
    }

    /// Dimensionality this store was created with.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Store a chunk under its id, replacing any previous chunk with the
    /// same id.
    ///
    /// # Errors
    ///
    /// Returns [`VitaeError::InvariantViolation`] if the embedding is
    /// empty or its length differs from the store dimensionality.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use vitae_index::chunker::ProfileChunk;
    /// use vitae_index::store::VectorStore;
    ///
    /// let store = VectorStore::new(2);
    /// let chunk = ProfileChunk {
    ///     id: "chunk-0".into(),
    ///     text: "Summary".into(),
    ///     metadata: HashMap::new(),
    /// };
    /// store.insert(chunk, vec![1.0, 0.0]).unwrap();
    /// assert_eq!(store.len(), 1);
    /// ```
    pub fn insert(&self, chunk: ProfileChunk, embedding: Vec<f32>) -> Result<()> {
        if embedding.is_empty() {
            return Err(VitaeError::InvariantViolation(format!(
                "chunk '{}' has an empty embedding",
                chunk.id
            )));
        }
        if embedding.len() != self.dimensions {
            return Err(VitaeError::InvariantViolation(format!(
                "chunk '{}' has {} dimensions, store expects {}",
                chunk.id,
                embedding.len(),
                self.dimensions
            )));
        }

        let seq = self.insert_seq.fetch_add(1, Ordering::Relaxed);
        self.chunks.insert(
            chunk.id.clone(),
            Entry {
                chunk,
                embedding,
                seq,
            },
        );
        Ok(())
    }

    /// Store a batch of chunks, returning how many were inserted.
    ///
    /// Equivalent to sequential [`insert`](Self::insert) calls and not
    /// atomic: a failure partway through leaves earlier inserts in place.
    ///
    /// # Errors
    ///
    /// Returns the first [`VitaeError::InvariantViolation`] encountered.
    pub fn insert_all(&self, pairs: Vec<(ProfileChunk, Vec<f32>)>) -> Result<usize> {
        let mut inserted = 0;
        for (chunk, embedding) in pairs {
            self.insert(chunk, embedding)?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Exact top-K cosine similarity search.
    ///
    /// Returns up to `top_k` hits sorted by descending score; ties break
    /// by insertion order (earlier insert first), so results are
    /// deterministic for a given insertion sequence. An empty store
    /// returns an empty vec.
    ///
    /// # Errors
    ///
    /// Returns [`VitaeError::DimensionMismatch`] if the query vector
    /// length differs from the store dimensionality.
    ///
    /// # Examples
    ///
    /// ```
    /// use vitae_index::store::VectorStore;
    ///
    /// let store = VectorStore::new(2);
    /// let results = store.search(&[0.5, 0.5], 5).unwrap();
    /// assert!(results.is_empty());
    /// ```
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        if self.chunks.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(VitaeError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(f64, u64, ProfileChunk)> = self
            .chunks
            .iter()
            .map(|entry| {
                let e = entry.value();
                let score = cosine_similarity(query, &e.embedding);
                (score, e.seq, e.chunk.clone())
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, _, chunk)| SearchHit { chunk, score })
            .collect())
    }

    /// Get a copy of the stored chunk with the given id.
    pub fn get(&self, id: &str) -> Option<StoredChunk> {
        self.chunks.get(id).map(|entry| {
            let e = entry.value();
            StoredChunk {
                chunk: e.chunk.clone(),
                embedding: e.embedding.clone(),
            }
        })
    }

    /// Whether a chunk with the given id is stored.
    pub fn contains(&self, id: &str) -> bool {
        self.chunks.contains_key(id)
    }

    /// Remove the chunk with the given id. Returns `true` if it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.chunks.remove(id).is_some()
    }

    /// All stored chunks in insertion order.
    pub fn all(&self) -> Vec<StoredChunk> {
        let mut entries: Vec<(u64, StoredChunk)> = self
            .chunks
            .iter()
            .map(|entry| {
                let e = entry.value();
                (
                    e.seq,
                    StoredChunk {
                        chunk: e.chunk.clone(),
                        embedding: e.embedding.clone(),
                    },
                )
            })
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, stored)| stored).collect()
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Remove all stored chunks.
    pub fn clear(&self) {
        self.chunks.clear();
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for i in 0..a.len() {
        let ai = a[i] as f64;
        let bi = b[i] as f64;
        dot += ai * bi;
        norm_a += ai * ai;
        norm_b += bi * bi;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    dot / denom
}
