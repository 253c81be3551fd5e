//! Text-level retrieval over the vector store.
//!
//! [`Retriever`] ties an [`EmbeddingProvider`] to a [`VectorStore`]: it
//! embeds chunks for indexing and queries for search, so callers only
//! ever deal in text.

use std::sync::Arc;

use vitae_core::{Result, VitaeError};

use crate::chunker::ProfileChunk;
use crate::embedding::EmbeddingProvider;
use crate::store::{SearchHit, VectorStore};

/// Embeds and retrieves profile chunks through a shared vector store.
///
/// The store is sized to the provider's dimensionality at construction,
/// so vectors from the paired provider always fit.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use vitae_core::EmbeddingConfig;
/// use vitae_index::embedding::EmbeddingClient;
/// use vitae_index::search::Retriever;
///
/// let config = EmbeddingConfig {
///     api_key: Some("test-key".into()),
///     ..EmbeddingConfig::default()
/// };
/// let client = EmbeddingClient::with_config(&config).unwrap();
/// let retriever = Retriever::new(Arc::new(client));
/// assert!(retriever.store().is_empty());
/// ```
pub struct Retriever {
    store: Arc<VectorStore>,
    embeddings: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    /// Create a retriever backed by a fresh store sized to the provider.
    pub fn new(embeddings: Arc<dyn EmbeddingProvider>) -> Self {
        let store = Arc::new(VectorStore::new(embeddings.dimensions()));
        Self { store, embeddings }
    }

    /// Access the underlying vector store.
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Embed a batch of chunks and insert them into the store.
    ///
    /// Returns the number of chunks stored. An empty batch is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`VitaeError::Provider`] if embedding fails or the
    /// provider returns a different number of vectors than chunks, and
    /// [`VitaeError::InvariantViolation`] if a vector does not fit the
    /// store.
    pub async fn index_chunks(&self, chunks: Vec<ProfileChunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embeddings.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(VitaeError::Provider(format!(
                "embedding provider returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let pairs: Vec<(ProfileChunk, Vec<f32>)> = chunks.into_iter().zip(embeddings).collect();
        let count = self.store.insert_all(pairs)?;

        tracing::info!(chunks = count, "indexed profile chunks");
        Ok(count)
    }

    /// Embed a query and return the closest stored chunks.
    ///
    /// # Errors
    ///
    /// Returns [`VitaeError::Provider`] if embedding fails, and
    /// [`VitaeError::DimensionMismatch`] if the provider produced a
    /// vector of unexpected length.
    pub async fn search_by_text(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let query_embedding = self.embeddings.embed(query).await?;
        self.store.search(&query_embedding, top_k)
    }
}
