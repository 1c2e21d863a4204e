//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur while indexing documents or answering questions.
#[derive(Debug, Error)]
pub enum RagError {
    /// No usable documents or chunks were supplied.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// The operation requires an open index but none is open.
    #[error("Index not initialized: prepare or load documents first")]
    NotInitialized,

    /// A load was requested but nothing has been persisted at the location.
    #[error("Saved content not found at {location}. Prepare documents first.")]
    NotFound {
        /// Where the persisted index was expected.
        location: String,
    },

    /// A single document could not be loaded.
    #[error("Failed to load '{path}': {message}")]
    Loader {
        /// Path of the document that failed.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while generating an answer.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl RagError {
    /// Whether this error came from an external collaborator (embedding,
    /// storage or generation backend).
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            Self::Embedding { .. } | Self::VectorStore { .. } | Self::Generation { .. }
        )
    }

    /// Whether nothing has been persisted at the requested location.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn store(backend: &str, message: impl Into<String>) -> Self {
        Self::VectorStore { backend: backend.to_string(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_are_grouped() {
        assert!(RagError::store("File", "disk full").is_backend());
        assert!(
            RagError::Generation { provider: "OpenAI".into(), message: "timeout".into() }
                .is_backend()
        );
        assert!(!RagError::NotInitialized.is_backend());
        assert!(!RagError::EmptyInput("no chunks".into()).is_backend());
    }

    #[test]
    fn not_found_names_the_location() {
        let err = RagError::NotFound { location: "./store/docs.json".into() };
        assert!(err.to_string().contains("./store/docs.json"));
        assert!(err.is_not_found());
        assert!(!RagError::store("File", "unsupported format version 2").is_not_found());
    }
}
