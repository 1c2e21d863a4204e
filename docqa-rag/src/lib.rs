//! Document question answering over a vector index.
//!
//! This crate provides:
//! - Document loading and discovery for plain-text formats
//! - Recursive and fixed-size chunking with overlap and provenance
//! - Vector indexing over pluggable embedding and storage backends
//! - Bounded context assembly and prompt construction
//! - A session orchestrator tying the pieces together
//!
//! The embedding model, the vector store and the language model are reached
//! through the [`EmbeddingProvider`], [`VectorStore`] and
//! [`GenerationProvider`] traits. [`HashEmbeddingProvider`],
//! [`InMemoryVectorStore`] and [`FileVectorStore`] work offline. The `fastembed`
//! feature adds local sentence-embedding models and the `openai` feature adds
//! HTTP providers for OpenAI-compatible servers.

pub mod chunking;
pub mod config;
pub mod context;
pub mod conversation;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filestore;
pub mod generation;
pub mod index;
pub mod inmemory;
pub mod loader;
#[cfg(feature = "fastembed")]
pub mod local;
#[cfg(feature = "openai")]
pub mod openai;
pub mod prompt;
pub mod session;
pub mod vectorstore;

pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, split_documents};
pub use config::{RagConfig, RagConfigBuilder};
pub use context::{AssembledContext, CONTEXT_SEPARATOR, assemble};
pub use conversation::{ConversationHistory, ConversationTurn, Role};
pub use document::{Chunk, ChunkMetadata, Document, IndexedChunk, SearchResult};
pub use embedding::{
    DEFAULT_EMBEDDING_MODEL, DEFAULT_HASH_MODEL, EmbeddingProvider, HashEmbeddingProvider,
    cosine_similarity,
};
pub use error::{RagError, Result};
pub use filestore::FileVectorStore;
pub use generation::GenerationProvider;
pub use index::{IndexHandle, VectorIndex};
pub use inmemory::InMemoryVectorStore;
pub use loader::{
    DocumentLoader, SUPPORTED_EXTENSIONS, SourceFile, TextFileLoader, discover_documents,
    load_documents,
};
pub use prompt::{AnswerStyle, NOT_FOUND_ANSWER, build_prompt};
pub use session::{
    ActionOutcome, Answer, IngestStats, NOT_INITIALIZED_ANSWER, QueryOutcome, RagAssistant,
    RagAssistantBuilder, SessionState, SessionStats, SessionStatus,
};
pub use vectorstore::{CollectionInfo, VectorStore};
