//! Session orchestration: ingest documents, answer questions, reset.
//!
//! A [`RagAssistant`] holds the shared collaborators and is `Send + Sync`;
//! per-user state lives in a [`SessionState`] that every operation borrows
//! mutably, so calls within one session are serialized by the borrow checker
//! while many sessions share one assistant.
//!
//! Administrative operations never return `Err`: failures are logged and
//! reported as an unsuccessful [`ActionOutcome`] so a presentation layer can
//! show the message as-is.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{RagAssistant, RagConfig, SourceFile};
//!
//! let assistant = RagAssistant::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
//!     .vector_store(Arc::new(FileVectorStore::new("./docqa_store")))
//!     .build()?;
//!
//! let mut session = assistant.new_session();
//! let outcome = assistant.initialize(&mut session, &[SourceFile::from_path("guide.md")]).await;
//! println!("{}", outcome.message);
//! let answer = assistant.ask(&mut session, "What is this about?", generator.as_ref()).await;
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker, split_documents};
use crate::config::RagConfig;
use crate::context::assemble;
use crate::conversation::{ConversationHistory, ConversationTurn};
use crate::document::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::index::{IndexHandle, VectorIndex};
use crate::loader::{DocumentLoader, SourceFile, TextFileLoader, load_documents};
use crate::prompt::build_prompt;
use crate::vectorstore::VectorStore;

/// Answer given to questions asked before any documents are ready.
pub const NOT_INITIALIZED_ANSWER: &str = "Please upload a file first.";

const NO_CHUNKS_MESSAGE: &str = "Could not prepare the uploaded file(s).";

/// Whether a session can answer questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Uninitialized,
    Ready,
}

/// Per-session state: the open index, if any, and the conversation so far.
#[derive(Debug)]
pub struct SessionState {
    index: Option<IndexHandle>,
    history: ConversationHistory,
}

impl SessionState {
    pub fn new(max_history_turns: usize) -> Self {
        Self { index: None, history: ConversationHistory::new(max_history_turns) }
    }

    pub fn status(&self) -> SessionStatus {
        if self.index.is_some() { SessionStatus::Ready } else { SessionStatus::Uninitialized }
    }

    pub fn is_initialized(&self) -> bool {
        self.index.is_some()
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// The open index, for callers that search or add chunks directly.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotInitialized`] if no index is open.
    pub fn index(&self) -> Result<&IndexHandle> {
        self.index.as_ref().ok_or(RagError::NotInitialized)
    }
}

/// Summary of a batch of ingested chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestStats {
    pub total_chunks: usize,
    pub total_documents: usize,
    /// Source document names, sorted and unique.
    pub sources: Vec<String>,
    /// File types, sorted and unique.
    pub file_types: Vec<String>,
    /// Mean chunk length in characters, rounded to two decimals.
    pub avg_chunk_size: f64,
    pub total_characters: usize,
    /// `total_characters / 4`.
    pub estimated_tokens: usize,
}

impl IngestStats {
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        if chunks.is_empty() {
            return Self::default();
        }
        let sources: BTreeSet<&str> = chunks.iter().map(|c| c.metadata.source.as_str()).collect();
        let file_types: BTreeSet<&str> =
            chunks.iter().map(|c| c.metadata.file_type.as_str()).collect();
        let total_characters: usize = chunks.iter().map(Chunk::char_len).sum();
        let avg = total_characters as f64 / chunks.len() as f64;

        Self {
            total_chunks: chunks.len(),
            total_documents: sources.len(),
            sources: sources.into_iter().map(String::from).collect(),
            file_types: file_types.into_iter().map(String::from).collect(),
            avg_chunk_size: (avg * 100.0).round() / 100.0,
            total_characters,
            estimated_tokens: total_characters / 4,
        }
    }
}

/// Result of an administrative action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub success: bool,
    /// User-facing description of what happened.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<IngestStats>,
}

impl ActionOutcome {
    fn success(message: impl Into<String>, stats: Option<IngestStats>) -> Self {
        Self { success: true, message: message.into(), stats }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), stats: None }
    }
}

/// Result of preparing a question for generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// No documents are loaded; `answer` is the fixed advisory.
    NotInitialized { answer: String },
    /// The prompt is ready for a generation provider.
    Prepared { prompt: String, sources: Vec<String>, context_truncated: bool },
    /// Retrieval failed.
    Failed { message: String },
}

/// A generated answer with the documents it was drawn from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<String>,
    pub success: bool,
}

/// Snapshot of a session for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub initialized: bool,
    /// Chunks in the open index (0 when uninitialized).
    pub chunk_count: usize,
    pub conversation_turns: usize,
}

/// Coordinates loading, chunking, indexing, retrieval and prompt building.
///
/// Construct one via [`RagAssistant::builder()`].
pub struct RagAssistant {
    config: RagConfig,
    loader: Arc<dyn DocumentLoader>,
    chunker: Arc<dyn Chunker>,
    index: VectorIndex,
}

impl RagAssistant {
    pub fn builder() -> RagAssistantBuilder {
        RagAssistantBuilder::default()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// A fresh, uninitialized session.
    pub fn new_session(&self) -> SessionState {
        SessionState::new(self.config.max_history_turns)
    }

    /// Build a new index from `files`, replacing whatever the session (and
    /// the store) held before. The conversation starts over on success.
    ///
    /// If no file yields any text the session is left as it was. If indexing
    /// fails the session ends up uninitialized.
    pub async fn initialize(
        &self,
        state: &mut SessionState,
        files: &[SourceFile],
    ) -> ActionOutcome {
        info!(file_count = files.len(), "initializing from documents");
        let chunks = self.prepare(files);
        if chunks.is_empty() {
            warn!(file_count = files.len(), "no chunks produced; session unchanged");
            return ActionOutcome::failure(NO_CHUNKS_MESSAGE);
        }
        let stats = IngestStats::from_chunks(&chunks);

        state.index = None;
        match self.index.build(chunks).await {
            Ok(handle) => {
                state.index = Some(handle);
                state.history.clear();
                info!(
                    documents = stats.total_documents,
                    chunks = stats.total_chunks,
                    "session ready"
                );
                let message = format!("Ready! Loaded {} file(s).", stats.total_documents);
                ActionOutcome::success(message, Some(stats))
            }
            Err(e) => {
                error!(error = %e, "initialization failed");
                ActionOutcome::failure(format!("Initialization error: {e}"))
            }
        }
    }

    /// Reopen the index persisted by an earlier session and return how many
    /// chunks it holds.
    ///
    /// On failure the session is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotFound`] if nothing has been saved, or the
    /// backend error that kept the saved index from being read.
    pub async fn open_saved(&self, state: &mut SessionState) -> Result<usize> {
        let handle = self.index.load().await?;
        let count = handle.count().await?;
        state.index = Some(handle);
        state.history.clear();
        Ok(count)
    }

    /// [`open_saved`](Self::open_saved), reported as an [`ActionOutcome`].
    pub async fn load_existing(&self, state: &mut SessionState) -> ActionOutcome {
        match self.open_saved(state).await {
            Ok(count) => {
                ActionOutcome::success(format!("Loaded saved content ({count} items)."), None)
            }
            Err(e) => {
                error!(error = %e, "failed to load saved index");
                ActionOutcome::failure(format!("Failed to load saved content: {e}"))
            }
        }
    }

    /// Add `files` to the open index. Behaves like [`initialize`](Self::initialize)
    /// when the session is uninitialized.
    pub async fn add_documents(
        &self,
        state: &mut SessionState,
        files: &[SourceFile],
    ) -> ActionOutcome {
        let Some(handle) = state.index.as_ref() else {
            return self.initialize(state, files).await;
        };

        let chunks = self.prepare(files);
        if chunks.is_empty() {
            warn!(file_count = files.len(), "no chunks produced; nothing added");
            return ActionOutcome::failure(NO_CHUNKS_MESSAGE);
        }
        let stats = IngestStats::from_chunks(&chunks);

        match handle.add(chunks).await {
            Ok(added) => {
                info!(documents = stats.total_documents, chunks = added, "added documents");
                let message = format!("Added {} file(s).", stats.total_documents);
                ActionOutcome::success(message, Some(stats))
            }
            Err(e) => {
                error!(error = %e, "adding documents failed");
                ActionOutcome::failure(format!("Error adding documents: {e}"))
            }
        }
    }

    /// Retrieve context for `question` and build the generation prompt.
    ///
    /// Records the question in the conversation history when a prompt is
    /// produced.
    pub async fn query(&self, state: &mut SessionState, question: &str) -> QueryOutcome {
        let Ok(handle) = state.index() else {
            return QueryOutcome::NotInitialized { answer: NOT_INITIALIZED_ANSWER.to_string() };
        };

        let results = match handle.search(question, None).await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "retrieval failed");
                return QueryOutcome::Failed { message: format!("Search failed: {e}") };
            }
        };

        let assembled = assemble(&results, self.config.max_context_chars);
        let prompt = build_prompt(question, &assembled.context);
        state.history.push(ConversationTurn::user(question));

        QueryOutcome::Prepared {
            prompt,
            sources: assembled.sources,
            context_truncated: assembled.truncated,
        }
    }

    /// [`query`](Self::query) followed by generation. The answer is recorded
    /// in the conversation history with its sources.
    pub async fn ask(
        &self,
        state: &mut SessionState,
        question: &str,
        generator: &dyn GenerationProvider,
    ) -> Answer {
        let (prompt, sources) = match self.query(state, question).await {
            QueryOutcome::Prepared { prompt, sources, .. } => (prompt, sources),
            QueryOutcome::NotInitialized { answer } => {
                return Answer { text: answer, sources: Vec::new(), success: false };
            }
            QueryOutcome::Failed { message } => {
                return Answer { text: message, sources: Vec::new(), success: false };
            }
        };

        match generator.generate(&prompt).await {
            Ok(text) => {
                let text = text.trim().to_string();
                state.history.push(ConversationTurn::assistant(text.clone(), sources.clone()));
                info!(model = generator.model_id(), sources = sources.len(), "answered question");
                Answer { text, sources, success: true }
            }
            Err(e) => {
                error!(model = generator.model_id(), error = %e, "generation failed");
                Answer { text: format!("Error generating answer: {e}"), sources, success: false }
            }
        }
    }

    /// Return the session to the uninitialized state and delete the
    /// persisted index, whether or not this session had it open.
    pub async fn reset(&self, state: &mut SessionState) -> ActionOutcome {
        state.history.clear();
        let deleted = match state.index.take() {
            Some(handle) => handle.delete().await,
            None => self.index.delete().await,
        };
        match deleted {
            Ok(()) => {
                info!(collection = self.index.collection(), "session reset");
                ActionOutcome::success("System reset.", None)
            }
            Err(e) => {
                error!(error = %e, "reset could not delete the saved index");
                ActionOutcome::failure(format!("Reset error: {e}"))
            }
        }
    }

    /// Forget the conversation; the index is untouched.
    pub fn clear_conversation(&self, state: &mut SessionState) {
        state.history.clear();
    }

    /// # Errors
    ///
    /// Returns a backend error if the chunk count cannot be read.
    pub async fn stats(&self, state: &SessionState) -> Result<SessionStats> {
        let chunk_count = match state.index.as_ref() {
            Some(handle) => handle.count().await?,
            None => 0,
        };
        Ok(SessionStats {
            initialized: state.is_initialized(),
            chunk_count,
            conversation_turns: state.history.len(),
        })
    }

    fn prepare(&self, files: &[SourceFile]) -> Vec<Chunk> {
        let documents = load_documents(self.loader.as_ref(), files);
        split_documents(self.chunker.as_ref(), &documents)
    }
}

/// Builder for constructing a [`RagAssistant`].
///
/// `config`, `embedding_provider` and `vector_store` are required. The loader
/// defaults to [`TextFileLoader`] and the chunker to a [`RecursiveChunker`]
/// sized from the config.
#[derive(Default)]
pub struct RagAssistantBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    loader: Option<Arc<dyn DocumentLoader>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagAssistantBuilder {
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing.
    pub fn build(self) -> Result<RagAssistant> {
        let config =
            self.config.ok_or_else(|| RagError::Config("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;

        let loader = self.loader.unwrap_or_else(|| Arc::new(TextFileLoader));
        let chunker =
            self.chunker.unwrap_or_else(|| Arc::new(RecursiveChunker::from_config(&config)));
        let index = VectorIndex::new(&config, embedding_provider, vector_store);

        Ok(RagAssistant { config, loader, chunker, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ChunkMetadata;

    fn chunk(source: &str, file_type: &str, text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            metadata: ChunkMetadata {
                source: source.to_string(),
                file_type: file_type.to_string(),
                chunk_index: 0,
                total_chunks: 0,
                token_count: 0,
                start_index: 0,
            },
        }
    }

    #[test]
    fn ingest_stats_summarize_chunks() {
        let chunks = [
            chunk("b.md", ".md", "abcd"),
            chunk("a.txt", ".txt", "abcdefgh"),
            chunk("b.md", ".md", "abcdefghij"),
        ];
        let stats = IngestStats::from_chunks(&chunks);
        assert_eq!(stats.total_chunks, 3);
        assert_eq!(stats.total_documents, 2);
        assert_eq!(stats.sources, vec!["a.txt", "b.md"]);
        assert_eq!(stats.file_types, vec![".md", ".txt"]);
        assert_eq!(stats.total_characters, 22);
        assert_eq!(stats.avg_chunk_size, 7.33);
        assert_eq!(stats.estimated_tokens, 5);
    }

    #[test]
    fn ingest_stats_of_nothing_are_zero() {
        assert_eq!(IngestStats::from_chunks(&[]), IngestStats::default());
    }

    #[test]
    fn builder_requires_collaborators() {
        let err = RagAssistant::builder().config(RagConfig::default()).build().err();
        assert!(matches!(err, Some(RagError::Config(_))));
    }

    #[test]
    fn new_sessions_are_uninitialized() {
        let state = SessionState::new(4);
        assert_eq!(state.status(), SessionStatus::Uninitialized);
        assert!(state.history().is_empty());
    }
}
