//! Wiring between parsed arguments and the session orchestrator.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use docqa_rag::{
    ActionOutcome, EmbeddingProvider, FileVectorStore, GenerationProvider,
    HashEmbeddingProvider, InMemoryVectorStore, QueryOutcome, RagAssistant, RagConfig,
    SessionState, SessionStats, SourceFile, VectorStore, discover_documents,
};
use tracing::{debug, info};

use crate::cli::{Backend, Cli, Command};
use crate::repl;

pub struct App {
    assistant: RagAssistant,
    generator: Option<Arc<dyn GenerationProvider>>,
}

impl App {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = cli.to_config()?;
        let store: Arc<dyn VectorStore> = match cli.backend {
            Backend::File => Arc::new(FileVectorStore::new(&config.store_path)),
            Backend::Memory => Arc::new(InMemoryVectorStore::new()),
        };
        let embedder = build_embedder(cli.embed_url.as_deref(), cli.embed_dimensions, &config)?;
        let generator = build_generator(cli.llm_url.as_deref(), &config);
        let assistant = RagAssistant::builder()
            .config(config)
            .embedding_provider(embedder)
            .vector_store(store)
            .build()?;
        Ok(Self { assistant, generator })
    }

    pub fn assistant(&self) -> &RagAssistant {
        &self.assistant
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        let mut session = self.assistant.new_session();
        match command {
            Command::Ingest { paths } => {
                let files = collect_sources(&paths)?;
                let outcome = self.assistant.initialize(&mut session, &files).await;
                report(&outcome)
            }
            Command::Add { paths } => {
                let files = collect_sources(&paths)?;
                let opened = self.open_saved(&mut session).await?;
                debug!(opened, "checked for a saved index before adding");
                let outcome = self.assistant.add_documents(&mut session, &files).await;
                report(&outcome)
            }
            Command::Ask { question } => {
                let loaded = self.assistant.load_existing(&mut session).await;
                if !loaded.success {
                    bail!("{}", loaded.message);
                }
                if !self.answer(&mut session, &question.join(" ")).await {
                    bail!("no answer was produced");
                }
                Ok(())
            }
            Command::Chat => repl::run(self, session).await,
            Command::Stats { json } => {
                self.open_saved(&mut session).await?;
                let stats = self.assistant.stats(&session).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                } else {
                    print_stats(&stats);
                }
                Ok(())
            }
            Command::Reset => {
                let outcome = self.assistant.reset(&mut session).await;
                report(&outcome)
            }
        }
    }

    /// Open the saved index into `session`. Returns `false` when nothing has
    /// been saved yet; any other load failure is an error, so a saved index
    /// that cannot be read is never rebuilt over.
    pub async fn open_saved(&self, session: &mut SessionState) -> Result<bool> {
        match self.assistant.open_saved(session).await {
            Ok(count) => {
                debug!(count, "opened saved index");
                Ok(true)
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => bail!("Failed to load saved content: {e}"),
        }
    }

    /// Answer `question` and print the result. Returns whether an answer (or
    /// prompt) was produced.
    pub async fn answer(&self, session: &mut SessionState, question: &str) -> bool {
        if let Some(generator) = &self.generator {
            let answer = self.assistant.ask(session, question, generator.as_ref()).await;
            println!("{}", answer.text);
            print_references(&answer.sources);
            return answer.success;
        }

        match self.assistant.query(session, question).await {
            QueryOutcome::Prepared { prompt, sources, context_truncated } => {
                if context_truncated {
                    info!("retrieved context was cut to fit the character budget");
                }
                println!("{prompt}");
                print_references(&sources);
                true
            }
            QueryOutcome::NotInitialized { answer } => {
                println!("{answer}");
                false
            }
            QueryOutcome::Failed { message } => {
                println!("{message}");
                false
            }
        }
    }
}

/// Pick the embedding provider: a remote server when `url` is given, the
/// offline hashing embedder for `hash-embed-<dims>` names, otherwise a local
/// sentence-transformers model.
fn build_embedder(
    url: Option<&str>,
    dimensions: Option<usize>,
    config: &RagConfig,
) -> Result<Arc<dyn EmbeddingProvider>> {
    let model = config.embedding_model.as_str();
    if let Some(url) = url {
        return remote_embedder(url, model, dimensions);
    }
    if let Some(dims) = model.strip_prefix("hash-embed-") {
        let dims: usize =
            dims.parse().with_context(|| format!("invalid hashing embedder '{model}'"))?;
        return Ok(Arc::new(HashEmbeddingProvider::new(dims)?));
    }
    local_embedder(model)
}

#[cfg(feature = "fastembed")]
fn local_embedder(model: &str) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider = docqa_rag::local::FastEmbedProvider::from_model_name(model)?;
    info!(model, dimensions = provider.dimensions(), "local embedding model ready");
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "fastembed"))]
fn local_embedder(model: &str) -> Result<Arc<dyn EmbeddingProvider>> {
    bail!(
        "embedding model '{model}' needs the `fastembed` feature; \
         use --embed-model hash-embed-384 for the offline embedder"
    )
}

#[cfg(feature = "openai")]
fn remote_embedder(
    url: &str,
    model: &str,
    dimensions: Option<usize>,
) -> Result<Arc<dyn EmbeddingProvider>> {
    use docqa_rag::openai::OpenAIEmbeddingProvider;

    let mut provider = OpenAIEmbeddingProvider::new(url).with_model(model);
    if let Some(dimensions) = dimensions {
        provider = provider.with_dimensions(dimensions);
    }
    if let Ok(key) = std::env::var("DOCQA_API_KEY") {
        provider = provider.with_api_key(key);
    }
    info!(url, model, "embeddings computed remotely");
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "openai"))]
fn remote_embedder(
    url: &str,
    _model: &str,
    _dimensions: Option<usize>,
) -> Result<Arc<dyn EmbeddingProvider>> {
    bail!("--embed-url {url} needs a build with the `openai` feature")
}

#[cfg(feature = "openai")]
fn build_generator(url: Option<&str>, config: &RagConfig) -> Option<Arc<dyn GenerationProvider>> {
    use docqa_rag::openai::OpenAIGenerationProvider;

    let url = url?;
    let mut generator = OpenAIGenerationProvider::new(url, &config.generation_model)
        .with_max_tokens(config.max_new_tokens);
    if let Ok(key) = std::env::var("DOCQA_API_KEY") {
        generator = generator.with_api_key(key);
    }
    info!(url, model = %config.generation_model, "answers generated remotely");
    Some(Arc::new(generator))
}

#[cfg(not(feature = "openai"))]
fn build_generator(url: Option<&str>, _config: &RagConfig) -> Option<Arc<dyn GenerationProvider>> {
    if let Some(url) = url {
        tracing::warn!(url, "built without the `openai` feature; printing prompts instead");
    }
    None
}

/// Expand files and directories into the supported documents they contain.
pub fn collect_sources(paths: &[PathBuf]) -> Result<Vec<SourceFile>> {
    let mut files = Vec::new();
    for path in paths {
        let found = discover_documents(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        files.extend(found);
    }
    if files.is_empty() {
        bail!("no supported files (.txt, .md, .markdown) found");
    }
    Ok(files)
}

pub fn print_outcome(outcome: &ActionOutcome) {
    println!("{}", outcome.message);
    if let Some(stats) = &outcome.stats {
        println!(
            "  {} chunk(s), {} characters (~{} tokens), avg chunk {:.2} chars",
            stats.total_chunks,
            stats.total_characters,
            stats.estimated_tokens,
            stats.avg_chunk_size
        );
        println!("  sources: {}", stats.sources.join(", "));
    }
}

pub fn print_stats(stats: &SessionStats) {
    if !stats.initialized {
        println!("Nothing indexed yet.");
        return;
    }
    println!("Saved content: {} chunk(s)", stats.chunk_count);
    println!("Conversation: {} turn(s)", stats.conversation_turns);
}

fn print_references(sources: &[String]) {
    if sources.is_empty() {
        return;
    }
    println!("\nReferences:");
    for source in sources {
        println!("- {source}");
    }
}

fn report(outcome: &ActionOutcome) -> Result<()> {
    print_outcome(outcome);
    if !outcome.success {
        bail!("{}", outcome.message);
    }
    Ok(())
}
