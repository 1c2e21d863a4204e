//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a volatile vector store
//! backed by a `HashMap` protected by a `tokio::sync::RwLock`. It is suitable
//! for tests and throwaway sessions. The [`Collection`] type it stores is also
//! the unit that [`FileVectorStore`](crate::filestore::FileVectorStore)
//! persists.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::document::{IndexedChunk, SearchResult};
use crate::embedding::cosine_similarity;
use crate::error::{RagError, Result};
use crate::vectorstore::{CollectionInfo, VectorStore};

const BACKEND: &str = "InMemory";

/// An insertion-ordered set of indexed chunks sharing one embedding space.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub(crate) struct Collection {
    pub(crate) dimensions: usize,
    pub(crate) embedding_model: String,
    pub(crate) entries: Vec<IndexedChunk>,
}

impl Collection {
    pub(crate) fn new(dimensions: usize, embedding_model: &str) -> Self {
        Self { dimensions, embedding_model: embedding_model.to_string(), entries: Vec::new() }
    }

    pub(crate) fn info(&self) -> CollectionInfo {
        CollectionInfo {
            dimensions: self.dimensions,
            embedding_model: self.embedding_model.clone(),
            count: self.entries.len(),
        }
    }

    pub(crate) fn upsert(&mut self, backend: &str, chunks: &[IndexedChunk]) -> Result<()> {
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != self.dimensions) {
            return Err(RagError::store(
                backend,
                format!(
                    "chunk '{}' has {} dimensions, collection expects {}",
                    bad.id,
                    bad.embedding.len(),
                    self.dimensions
                ),
            ));
        }
        for chunk in chunks {
            match self.entries.iter_mut().find(|existing| existing.id == chunk.id) {
                Some(existing) => *existing = chunk.clone(),
                None => self.entries.push(chunk.clone()),
            }
        }
        Ok(())
    }

    pub(crate) fn search(
        &self,
        backend: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if embedding.len() != self.dimensions {
            return Err(RagError::store(
                backend,
                format!(
                    "query has {} dimensions, collection expects {}",
                    embedding.len(),
                    self.dimensions
                ),
            ));
        }

        let mut scored: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|entry| SearchResult {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&entry.embedding, embedding),
            })
            .collect();

        // stable sort: equal scores keep insertion order, NaN ranks last
        scored.sort_by(|a, b| rank_key(b.score).total_cmp(&rank_key(a.score)));
        scored.truncate(top_k);
        Ok(scored)
    }
}

fn rank_key(score: f32) -> f32 {
    if score.is_nan() { f32::NEG_INFINITY } else { score }
}

/// An in-memory vector store using cosine similarity for search.
///
/// Collections are stored as a `HashMap` from collection name to
/// [`Collection`]. All operations are async-safe via `tokio::sync::RwLock`.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 384, "hash-embed-384").await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(collection: &str) -> RagError {
    RagError::store(BACKEND, format!("collection '{collection}' does not exist"))
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        embedding_model: &str,
    ) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| Collection::new(dimensions, embedding_model));
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn describe(&self, name: &str) -> Result<Option<CollectionInfo>> {
        Ok(self.collections.read().await.get(name).map(Collection::info))
    }

    async fn upsert(&self, collection: &str, chunks: &[IndexedChunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        store.upsert(BACKEND, chunks)
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;
        store.search(BACKEND, embedding, top_k)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).map_or(0, |c| c.entries.len()))
    }

    fn location(&self, collection: &str) -> String {
        format!("memory://{collection}")
    }
}
