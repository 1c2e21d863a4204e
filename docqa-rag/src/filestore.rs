//! Durable vector store persisted as JSON files.
//!
//! Each collection lives in `<root>/<collection>.json`. Every mutation
//! rewrites the file through a temporary sibling and an atomic rename, and
//! completes before the call returns. Loaded collections are cached behind a
//! `tokio::sync::RwLock`, so concurrent searches share a read lock.
//!
//! One writer per root directory is assumed; two processes mutating the same
//! collection will overwrite each other's changes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::{IndexedChunk, SearchResult};
use crate::error::{RagError, Result};
use crate::inmemory::Collection;
use crate::vectorstore::{CollectionInfo, VectorStore};

const BACKEND: &str = "File";
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct PersistedRef<'a> {
    version: u32,
    #[serde(flatten)]
    collection: &'a Collection,
}

#[derive(Deserialize)]
struct Persisted {
    version: u32,
    #[serde(flatten)]
    collection: Collection,
}

/// A [`VectorStore`] that keeps every collection in a JSON file under a root
/// directory.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{FileVectorStore, VectorStore};
///
/// let store = FileVectorStore::new("./docqa_store");
/// store.create_collection("docs", 384, "hash-embed-384").await?;
/// store.upsert("docs", &chunks).await?;
/// ```
#[derive(Debug)]
pub struct FileVectorStore {
    root: PathBuf,
    cache: RwLock<HashMap<String, Collection>>,
}

impl FileVectorStore {
    /// Create a store rooted at `root`. Nothing is touched on disk until the
    /// first mutation.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), cache: RwLock::new(HashMap::new()) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_path(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(RagError::store(
                BACKEND,
                format!("invalid collection name '{name}': use letters, digits, '-' or '_'"),
            ));
        }
        Ok(self.root.join(format!("{name}.json")))
    }

    async fn read_from_disk(&self, name: &str) -> Result<Option<Collection>> {
        let path = self.collection_path(name)?;
        let exists = tokio::fs::try_exists(&path).await.map_err(|e| io_error(&path, e))?;
        if !exists {
            return Ok(None);
        }

        let data = tokio::fs::read(&path).await.map_err(|e| io_error(&path, e))?;
        let persisted: Persisted = serde_json::from_slice(&data).map_err(|e| {
            RagError::store(BACKEND, format!("corrupt collection file {}: {e}", path.display()))
        })?;
        if persisted.version != FORMAT_VERSION {
            return Err(RagError::store(
                BACKEND,
                format!(
                    "unsupported format version {} in {} (expected {FORMAT_VERSION})",
                    persisted.version,
                    path.display()
                ),
            ));
        }

        debug!(
            collection = name,
            chunk_count = persisted.collection.entries.len(),
            "read collection"
        );
        Ok(Some(persisted.collection))
    }

    async fn write_to_disk(&self, name: &str, collection: &Collection) -> Result<()> {
        let path = self.collection_path(name)?;
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| io_error(&self.root, e))?;

        let data = serde_json::to_vec(&PersistedRef { version: FORMAT_VERSION, collection })?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data).await.map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| io_error(&path, e))?;

        debug!(collection = name, chunk_count = collection.entries.len(), "persisted collection");
        Ok(())
    }

    /// Make sure `name` is in the cache if it exists on disk. Returns whether
    /// the collection exists.
    async fn ensure_cached(&self, name: &str) -> Result<bool> {
        if self.cache.read().await.contains_key(name) {
            return Ok(true);
        }
        let mut cache = self.cache.write().await;
        if cache.contains_key(name) {
            return Ok(true);
        }
        match self.read_from_disk(name).await? {
            Some(collection) => {
                cache.insert(name.to_string(), collection);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn io_error(path: &Path, e: std::io::Error) -> RagError {
    RagError::store(BACKEND, format!("{}: {e}", path.display()))
}

fn missing(collection: &str) -> RagError {
    RagError::store(BACKEND, format!("collection '{collection}' does not exist"))
}

#[async_trait]
impl VectorStore for FileVectorStore {
    async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        embedding_model: &str,
    ) -> Result<()> {
        if self.ensure_cached(name).await? {
            return Ok(());
        }
        let mut cache = self.cache.write().await;
        if cache.contains_key(name) {
            return Ok(());
        }
        let collection = Collection::new(dimensions, embedding_model);
        self.write_to_disk(name, &collection).await?;
        cache.insert(name.to_string(), collection);
        info!(collection = name, root = %self.root.display(), "created collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let path = self.collection_path(name)?;
        let mut cache = self.cache.write().await;
        cache.remove(name);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => info!(collection = name, "deleted collection"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&path, e)),
        }
        // only succeeds once the directory is empty
        let _ = tokio::fs::remove_dir(&self.root).await;
        Ok(())
    }

    async fn describe(&self, name: &str) -> Result<Option<CollectionInfo>> {
        if !self.ensure_cached(name).await? {
            return Ok(None);
        }
        Ok(self.cache.read().await.get(name).map(Collection::info))
    }

    async fn upsert(&self, collection: &str, chunks: &[IndexedChunk]) -> Result<()> {
        if !self.ensure_cached(collection).await? {
            return Err(missing(collection));
        }
        let mut cache = self.cache.write().await;
        let stored = cache.get_mut(collection).ok_or_else(|| missing(collection))?;

        let mut updated = stored.clone();
        updated.upsert(BACKEND, chunks)?;
        self.write_to_disk(collection, &updated).await?;
        *stored = updated;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if !self.ensure_cached(collection).await? {
            return Err(missing(collection));
        }
        let cache = self.cache.read().await;
        let stored = cache.get(collection).ok_or_else(|| missing(collection))?;
        stored.search(BACKEND, embedding, top_k)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.describe(collection).await?.map_or(0, |info| info.count))
    }

    fn location(&self, collection: &str) -> String {
        self.root.join(format!("{collection}.json")).display().to_string()
    }
}
