//! Generation provider trait.

use async_trait::async_trait;

use crate::error::Result;

/// A language model that turns a prompt into answer text.
///
/// Implementations should bound the output length by their configured
/// token budget and report failures as [`RagError::Generation`](crate::RagError::Generation).
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::GenerationProvider;
///
/// let answer = generator.generate(&prompt).await?;
/// ```
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate an answer for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Identifier of the underlying model.
    fn model_id(&self) -> &str;
}
