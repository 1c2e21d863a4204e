//! Configuration for the question-answering pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters shared by every pipeline component.
///
/// Components receive this struct explicitly; nothing reads ambient global
/// state, so independently configured sessions can run side by side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Upper bound on the assembled context, in characters.
    pub max_context_chars: usize,
    /// Upper bound on generated answer length, in tokens.
    pub max_new_tokens: usize,
    /// Number of conversation turns retained per session.
    pub max_history_turns: usize,
    /// Minimum similarity score for search results. `None` keeps everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f32>,
    /// Identifier of the embedding model.
    pub embedding_model: String,
    /// Identifier of the generation model.
    pub generation_model: String,
    /// Directory holding the persisted index.
    pub store_path: PathBuf,
    /// Name of the vector collection.
    pub collection_name: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 900,
            chunk_overlap: 100,
            top_k: 3,
            max_context_chars: 3500,
            max_new_tokens: 180,
            max_history_turns: 10,
            similarity_threshold: None,
            embedding_model: crate::embedding::DEFAULT_EMBEDDING_MODEL.to_string(),
            generation_model: "google/flan-t5-base".to_string(),
            store_path: PathBuf::from("./docqa_store"),
            collection_name: "rag_documents".to_string(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the character budget for assembled context.
    pub fn max_context_chars(mut self, chars: usize) -> Self {
        self.config.max_context_chars = chars;
        self
    }

    /// Set the generation length bound.
    pub fn max_new_tokens(mut self, tokens: usize) -> Self {
        self.config.max_new_tokens = tokens;
        self
    }

    /// Set how many conversation turns a session keeps.
    pub fn max_history_turns(mut self, turns: usize) -> Self {
        self.config.max_history_turns = turns;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    pub fn generation_model(mut self, model: impl Into<String>) -> Self {
        self.config.generation_model = model.into();
        self
    }

    /// Set the directory where the index is persisted.
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_path = path.into();
        self
    }

    pub fn collection_name(mut self, name: impl Into<String>) -> Self {
        self.config.collection_name = name.into();
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `max_history_turns == 0`
    /// - `collection_name` is empty
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if config.max_history_turns == 0 {
            return Err(RagError::Config(
                "max_history_turns must be greater than zero".to_string(),
            ));
        }
        if config.collection_name.trim().is_empty() {
            return Err(RagError::Config("collection_name must not be empty".to_string()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_deployment() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 900);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.max_context_chars, 3500);
        assert_eq!(config.max_new_tokens, 180);
        assert_eq!(config.collection_name, "rag_documents");
        assert_eq!(config.embedding_model, "sentence-transformers/all-MiniLM-L6-v2");
        assert!(config.similarity_threshold.is_none());
    }

    #[test]
    fn default_config_passes_validation() {
        assert!(RagConfig::builder().build().is_ok());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn rejects_zero_top_k_and_blank_collection() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().collection_name("  ").build().is_err());
        assert!(RagConfig::builder().max_history_turns(0).build().is_err());
    }

    #[test]
    fn builder_sets_every_field() {
        let config = RagConfig::builder()
            .chunk_size(256)
            .chunk_overlap(32)
            .top_k(5)
            .max_context_chars(1200)
            .max_new_tokens(64)
            .similarity_threshold(0.25)
            .store_path("/tmp/idx")
            .collection_name("notes")
            .build()
            .unwrap();
        assert_eq!(config.chunk_size, 256);
        assert_eq!(config.chunk_overlap, 32);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.max_context_chars, 1200);
        assert_eq!(config.max_new_tokens, 64);
        assert_eq!(config.similarity_threshold, Some(0.25));
        assert_eq!(config.store_path, PathBuf::from("/tmp/idx"));
        assert_eq!(config.collection_name, "notes");
    }
}
