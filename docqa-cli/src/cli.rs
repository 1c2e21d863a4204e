//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use docqa_rag::RagConfig;

/// Ask questions about your documents
#[derive(Debug, Parser)]
#[command(name = "docqa", version)]
pub struct Cli {
    /// Directory holding the saved index
    #[arg(long, global = true, env = "DOCQA_STORE_PATH")]
    pub store_path: Option<PathBuf>,

    /// Name of the vector collection
    #[arg(long, global = true, env = "DOCQA_COLLECTION")]
    pub collection: Option<String>,

    /// Maximum chunk size in characters
    #[arg(long, global = true, env = "DOCQA_CHUNK_SIZE")]
    pub chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long, global = true, env = "DOCQA_CHUNK_OVERLAP")]
    pub chunk_overlap: Option<usize>,

    /// Number of chunks retrieved per question
    #[arg(long, global = true, env = "DOCQA_TOP_K")]
    pub top_k: Option<usize>,

    /// Character budget for retrieved context
    #[arg(long, global = true, env = "DOCQA_MAX_CONTEXT_CHARS")]
    pub max_context_chars: Option<usize>,

    /// Embedding model: a sentence-transformers name run locally,
    /// `hash-embed-<dims>` for the offline hashing embedder, or the model
    /// served at --embed-url
    #[arg(long, global = true, env = "DOCQA_EMBED_MODEL")]
    pub embed_model: Option<String>,

    /// Base URL of an OpenAI-compatible server used to compute embeddings
    #[arg(long, global = true, env = "DOCQA_EMBED_URL")]
    pub embed_url: Option<String>,

    /// Vector size returned by the --embed-url model
    #[arg(long, global = true, env = "DOCQA_EMBED_DIMENSIONS")]
    pub embed_dimensions: Option<usize>,

    /// Where the index lives
    #[arg(long, global = true, value_enum, env = "DOCQA_BACKEND", default_value_t = Backend::File)]
    pub backend: Backend,

    /// Base URL of an OpenAI-compatible server used to generate answers.
    /// Without it the assembled prompt is printed instead.
    #[arg(long, global = true, env = "DOCQA_LLM_URL")]
    pub llm_url: Option<String>,

    /// Model name sent to the generation server
    #[arg(long, global = true, env = "DOCQA_LLM_MODEL")]
    pub llm_model: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// JSON files under the store path
    File,
    /// Process memory; nothing survives exit
    Memory,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a fresh index from files or directories, replacing the saved one
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Add files or directories to the saved index
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Ask a single question against the saved index
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Interactive question-and-answer session
    Chat,
    /// Show what is currently indexed
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the saved index
    Reset,
}

impl Cli {
    /// Overlay the flags that were given onto the default configuration.
    pub fn to_config(&self) -> docqa_rag::Result<RagConfig> {
        let mut builder = RagConfig::builder();
        if let Some(path) = &self.store_path {
            builder = builder.store_path(path);
        }
        if let Some(name) = &self.collection {
            builder = builder.collection_name(name);
        }
        if let Some(size) = self.chunk_size {
            builder = builder.chunk_size(size);
        }
        if let Some(overlap) = self.chunk_overlap {
            builder = builder.chunk_overlap(overlap);
        }
        if let Some(k) = self.top_k {
            builder = builder.top_k(k);
        }
        if let Some(chars) = self.max_context_chars {
            builder = builder.max_context_chars(chars);
        }
        if let Some(model) = &self.embed_model {
            builder = builder.embedding_model(model);
        }
        if let Some(model) = &self.llm_model {
            builder = builder.generation_model(model);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "docqa",
            "--top-k",
            "5",
            "--collection",
            "notes",
            "--backend",
            "memory",
            "ask",
            "what",
            "is",
            "this?",
        ])
        .unwrap();

        let config = cli.to_config().unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.collection_name, "notes");
        assert_eq!(config.chunk_size, RagConfig::default().chunk_size);
        assert_eq!(cli.backend, Backend::Memory);
        match cli.command {
            Command::Ask { question } => assert_eq!(question.join(" "), "what is this?"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = Cli::try_parse_from(["docqa", "stats", "-vv", "--json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Stats { json: true }));
    }

    #[test]
    fn invalid_combinations_are_rejected_by_the_builder() {
        let cli = Cli::try_parse_from([
            "docqa",
            "--chunk-size",
            "50",
            "--chunk-overlap",
            "50",
            "stats",
        ])
        .unwrap();
        assert!(cli.to_config().is_err());
    }

    #[test]
    fn embedding_model_reaches_the_config() {
        let default = Cli::try_parse_from(["docqa", "stats"]).unwrap().to_config().unwrap();
        assert_eq!(default.embedding_model, "sentence-transformers/all-MiniLM-L6-v2");

        let cli =
            Cli::try_parse_from(["docqa", "--embed-model", "hash-embed-128", "stats"]).unwrap();
        assert_eq!(cli.to_config().unwrap().embedding_model, "hash-embed-128");
    }

    #[test]
    fn ingest_requires_paths() {
        assert!(Cli::try_parse_from(["docqa", "ingest"]).is_err());
    }
}
