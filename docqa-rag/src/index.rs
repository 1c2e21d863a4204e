//! Vector index over a [`VectorStore`] collection.
//!
//! [`VectorIndex`] opens collections; an open collection is represented by an
//! [`IndexHandle`], which is the only way to add to or search the index.
//! Deleting through the handle consumes it, so a deleted index can no longer
//! be used.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{VectorIndex, RagConfig, InMemoryVectorStore, HashEmbeddingProvider};
//!
//! let index = VectorIndex::new(
//!     &RagConfig::default(),
//!     Arc::new(HashEmbeddingProvider::default()),
//!     Arc::new(InMemoryVectorStore::new()),
//! );
//! let handle = index.build(chunks).await?;
//! let results = handle.search("what is ownership?", None).await?;
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::RagConfig;
use crate::document::{Chunk, IndexedChunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Opens, builds and deletes the configured collection.
#[derive(Clone)]
pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    collection: String,
    default_top_k: usize,
    similarity_threshold: Option<f32>,
}

impl VectorIndex {
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            embedder,
            store,
            collection: config.collection_name.clone(),
            default_top_k: config.top_k,
            similarity_threshold: config.similarity_threshold,
        }
    }

    /// Embed and persist `chunks` as a fresh collection, replacing anything
    /// previously stored under the same name.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyInput`] if `chunks` is empty, or a backend
    /// error if embedding or storage fails.
    pub async fn build(&self, chunks: Vec<Chunk>) -> Result<IndexHandle> {
        if chunks.is_empty() {
            return Err(RagError::EmptyInput("cannot build an index from zero chunks".into()));
        }

        self.store.delete_collection(&self.collection).await?;
        let (dimensions, model) = (self.embedder.dimensions(), self.embedder.model_id());
        self.store.create_collection(&self.collection, dimensions, model).await.inspect_err(|e| {
            error!(collection = %self.collection, error = %e, "failed to create collection")
        })?;

        let handle = IndexHandle { index: self.clone() };
        let added = handle.add(chunks).await?;
        info!(
            collection = %self.collection,
            location = %self.store.location(&self.collection),
            chunk_count = added,
            "built index"
        );
        Ok(handle)
    }

    /// Reopen a previously persisted collection.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotFound`] if nothing is stored under the
    /// configured collection, or [`RagError::VectorStore`] if the stored
    /// vectors were produced by a different embedding model.
    pub async fn load(&self) -> Result<IndexHandle> {
        let Some(info) = self.store.describe(&self.collection).await? else {
            return Err(RagError::NotFound { location: self.store.location(&self.collection) });
        };

        let model = self.embedder.model_id();
        if info.embedding_model != model || info.dimensions != self.embedder.dimensions() {
            return Err(RagError::VectorStore {
                backend: "index".into(),
                message: format!(
                    "collection '{}' was built with '{}' ({} dims), configured model is '{}' ({} dims)",
                    self.collection,
                    info.embedding_model,
                    info.dimensions,
                    model,
                    self.embedder.dimensions()
                ),
            });
        }

        info!(collection = %self.collection, chunk_count = info.count, "loaded index");
        Ok(IndexHandle { index: self.clone() })
    }

    /// Remove everything persisted for the collection, whether or not a
    /// handle is open.
    pub async fn delete(&self) -> Result<()> {
        self.store.delete_collection(&self.collection).await.inspect_err(|e| {
            error!(collection = %self.collection, error = %e, "failed to delete collection")
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIndex")
            .field("collection", &self.collection)
            .field("embedding_model", &self.embedder.model_id())
            .field("default_top_k", &self.default_top_k)
            .finish()
    }
}

/// An open index. Obtained from [`VectorIndex::build`] or
/// [`VectorIndex::load`].
#[derive(Debug)]
pub struct IndexHandle {
    index: VectorIndex,
}

impl IndexHandle {
    /// Embed `chunks` and append them to the index in order. Returns the
    /// number of chunks added; an empty slice is a no-op.
    pub async fn add(&self, chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let index = &self.index;

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = index.embedder.embed_batch(&texts).await.inspect_err(|e| {
            error!(error = %e, chunk_count = chunks.len(), "embedding failed during indexing")
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::Embedding {
                provider: index.embedder.model_id().to_string(),
                message: format!(
                    "expected {} embeddings, got {}",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }

        let indexed: Vec<IndexedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk {
                id: Uuid::new_v4().to_string(),
                chunk,
                embedding,
            })
            .collect();

        index.store.upsert(&index.collection, &indexed).await.inspect_err(|e| {
            error!(collection = %index.collection, error = %e, "upsert failed during indexing")
        })?;

        debug!(collection = %index.collection, chunk_count = indexed.len(), "added chunks");
        Ok(indexed.len())
    }

    /// Return the `k` chunks most similar to `query`, best first.
    ///
    /// `None` uses the configured `top_k`. Asking for more chunks than are
    /// stored returns all of them; `Some(0)` returns nothing.
    pub async fn search(&self, query: &str, k: Option<usize>) -> Result<Vec<SearchResult>> {
        let index = &self.index;
        let k = k.unwrap_or(index.default_top_k);
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = index
            .embedder
            .embed(query)
            .await
            .inspect_err(|e| error!(error = %e, "embedding failed during search"))?;

        let mut results =
            index.store.search(&index.collection, &query_embedding, k).await.inspect_err(|e| {
                error!(collection = %index.collection, error = %e, "vector store search failed")
            })?;

        if let Some(threshold) = index.similarity_threshold {
            results.retain(|r| r.score >= threshold);
        }

        info!(result_count = results.len(), k, "search completed");
        Ok(results)
    }

    /// Number of chunks in the index.
    pub async fn count(&self) -> Result<usize> {
        self.index.store.count(&self.index.collection).await
    }

    /// Delete all persisted state. The handle is consumed.
    pub async fn delete(self) -> Result<()> {
        self.index.delete().await
    }

    pub fn collection(&self) -> &str {
        self.index.collection()
    }
}
