//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{IndexedChunk, SearchResult};
use crate::error::Result;

/// Summary of a stored collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub dimensions: usize,
    /// Model that produced the stored vectors.
    pub embedding_model: String,
    /// Number of stored chunks.
    pub count: usize,
}

/// A storage backend for vector embeddings with cosine similarity search.
///
/// Implementations manage named collections of [`IndexedChunk`]s. Mutating
/// operations must be durable (for persistent backends) before they return
/// `Ok`.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{VectorStore, InMemoryVectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 384, "hash-embed-384").await?;
/// store.upsert("docs", &chunks).await?;
/// let results = store.search("docs", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    ///
    /// `embedding_model` is recorded so that vectors from a different model
    /// are never mixed into the collection.
    async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        embedding_model: &str,
    ) -> Result<()>;

    /// Delete a named collection and all its data. No-op if it is absent.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Describe a collection, or `None` if it has not been created.
    async fn describe(&self, name: &str) -> Result<Option<CollectionInfo>>;

    /// Whether a collection with this name has been created (and persisted).
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.describe(name).await?.is_some())
    }

    /// Append chunks to a collection, keeping insertion order. Chunks with an
    /// id already present replace the stored entry in place.
    async fn upsert(&self, collection: &str, chunks: &[IndexedChunk]) -> Result<()>;

    /// Search for the `top_k` most similar chunks to the given embedding.
    ///
    /// Returns results ordered by descending cosine similarity; equal scores
    /// keep insertion order (earlier-inserted first).
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Number of chunks stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Human-readable location of a collection, used in error messages.
    fn location(&self, collection: &str) -> String;
}
