//! Local sentence-embedding models run through ONNX Runtime by `fastembed`.
//!
//! Model files are downloaded on first use and cached by `fastembed`; after
//! that no network access is needed.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, info};

use crate::embedding::{DEFAULT_EMBEDDING_MODEL, EmbeddingProvider};
use crate::error::{RagError, Result};

const PROVIDER: &str = "fastembed";

/// Model names accepted by [`FastEmbedProvider::from_model_name`].
pub const SUPPORTED_MODELS: [&str; 6] = [
    DEFAULT_EMBEDDING_MODEL,
    "sentence-transformers/all-MiniLM-L12-v2",
    "BAAI/bge-small-en-v1.5",
    "BAAI/bge-base-en-v1.5",
    "intfloat/multilingual-e5-small",
    "intfloat/multilingual-e5-large",
];

/// Map a model name to the `fastembed` model that serves it. The
/// `sentence-transformers/` prefix is optional.
pub fn model_for_name(name: &str) -> Option<EmbeddingModel> {
    let short = name.strip_prefix("sentence-transformers/").unwrap_or(name);
    match short {
        "all-MiniLM-L6-v2" => Some(EmbeddingModel::AllMiniLML6V2),
        "all-MiniLM-L12-v2" => Some(EmbeddingModel::AllMiniLML12V2),
        "BAAI/bge-small-en-v1.5" => Some(EmbeddingModel::BGESmallENV15),
        "BAAI/bge-base-en-v1.5" => Some(EmbeddingModel::BGEBaseENV15),
        "intfloat/multilingual-e5-small" => Some(EmbeddingModel::MultilingualE5Small),
        "intfloat/multilingual-e5-large" => Some(EmbeddingModel::MultilingualE5Large),
        _ => None,
    }
}

fn embedding_error(message: impl Into<String>) -> RagError {
    RagError::Embedding { provider: PROVIDER.into(), message: message.into() }
}

/// An [`EmbeddingProvider`] running a sentence-embedding model in process.
///
/// Defaults to `all-MiniLM-L6-v2` (384 dimensions). Inference is CPU-bound,
/// so batches run on the blocking thread pool.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::local::FastEmbedProvider;
///
/// let provider = FastEmbedProvider::new()?;
/// assert_eq!(provider.dimensions(), 384);
/// let vectors = provider.embed_batch(&["first passage", "second passage"]).await?;
/// ```
#[derive(Clone)]
pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
    model_id: String,
    dimensions: usize,
}

impl FastEmbedProvider {
    /// Load `all-MiniLM-L6-v2`.
    pub fn new() -> Result<Self> {
        Self::with_model(EmbeddingModel::AllMiniLML6V2, DEFAULT_EMBEDDING_MODEL)
    }

    /// Load the model known by `name`; see [`SUPPORTED_MODELS`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] for an unknown name, before anything is
    /// downloaded.
    pub fn from_model_name(name: &str) -> Result<Self> {
        let model = model_for_name(name).ok_or_else(|| {
            RagError::Config(format!(
                "unknown embedding model '{name}' (supported: {})",
                SUPPORTED_MODELS.join(", ")
            ))
        })?;
        Self::with_model(model, name)
    }

    /// Load `model`, recording `model_id` with every vector it produces.
    pub fn with_model(model: EmbeddingModel, model_id: &str) -> Result<Self> {
        info!(provider = PROVIDER, model = model_id, "loading embedding model");
        let mut text_model =
            TextEmbedding::try_new(InitOptions::new(model).with_show_download_progress(true))
                .map_err(|e| embedding_error(format!("failed to load '{model_id}': {e}")))?;

        let sample = text_model
            .embed(vec!["dimension check"], None)
            .map_err(|e| embedding_error(e.to_string()))?;
        let dimensions = sample
            .first()
            .map(Vec::len)
            .ok_or_else(|| embedding_error("model returned no embedding"))?;

        Ok(Self {
            model: Arc::new(Mutex::new(text_model)),
            model_id: model_id.to_string(),
            dimensions,
        })
    }
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model_id", &self.model_id)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| embedding_error("model returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.model_id,
            "embedding batch"
        );

        let model = Arc::clone(&self.model);
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let embeddings = tokio::task::spawn_blocking(move || {
            let mut model = model.lock().map_err(|_| embedding_error("model lock poisoned"))?;
            model.embed(owned, None).map_err(|e| embedding_error(e.to_string()))
        })
        .await
        .map_err(|e| embedding_error(format!("embedding task failed: {e}")))??;

        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimensions) {
            return Err(embedding_error(format!(
                "expected {} dimensions, model returned {}",
                self.dimensions,
                bad.len()
            )));
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn names_map_with_or_without_prefix() {
        for name in [DEFAULT_EMBEDDING_MODEL, "all-MiniLM-L6-v2"] {
            assert!(matches!(model_for_name(name), Some(EmbeddingModel::AllMiniLML6V2)));
        }
        assert!(matches!(
            model_for_name("BAAI/bge-small-en-v1.5"),
            Some(EmbeddingModel::BGESmallENV15)
        ));
        assert!(model_for_name("hash-embed-384").is_none());
        for name in SUPPORTED_MODELS {
            assert!(model_for_name(name).is_some(), "{name}");
        }
    }

    #[test]
    fn unknown_name_fails_before_download() {
        let err = FastEmbedProvider::from_model_name("not-a-model").unwrap_err();
        assert!(matches!(err, RagError::Config(ref m) if m.contains("not-a-model")));
    }

    #[tokio::test]
    #[ignore = "Downloads 86MB model - run with --ignored"]
    async fn minilm_embeds_related_text_closer() {
        let provider = FastEmbedProvider::new().unwrap();
        assert_eq!(provider.dimensions(), 384);
        assert_eq!(provider.model_id(), DEFAULT_EMBEDDING_MODEL);

        let vectors = provider
            .embed_batch(&["How do I parse JSON?", "Deserialize a JSON string", "Bake bread"])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 3);
        assert!(
            cosine_similarity(&vectors[0], &vectors[1])
                > cosine_similarity(&vectors[0], &vectors[2])
        );
    }
}
