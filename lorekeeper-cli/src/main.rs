//! Lorekeeper CLI - talk to an NPC from the terminal

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use lorekeeper_core::config::LorekeeperConfig;
use lorekeeper_core::conversation::ConversationLog;
use lorekeeper_core::dialogue::{
    DialogueOrchestrator, FALLBACK_MESSAGE, IgnoredReason, SubmitOutcome, event_channel,
};
use lorekeeper_core::llm::OllamaBackend;
use lorekeeper_core::prompt::{Persona, PromptBuilder};
use lorekeeper_core::retrieval::{
    Corpus, LexicalScorer, SimilarityScorer, retrieve_context, score_candidates,
};

#[derive(Parser)]
#[command(name = "lorekeeper")]
#[command(about = "Retrieval-augmented NPC dialogue", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the NPC, one line per turn from stdin
    Chat(SessionArgs),
    /// Print the prompt a question would produce without calling the backend
    Prompt {
        #[command(flatten)]
        session: SessionArgs,
        /// Player question
        query: String,
    },
    /// Score every lore line against a question
    Retrieve {
        #[command(flatten)]
        session: SessionArgs,
        /// Player question
        query: String,
    },
    /// Version information
    Version,
}

#[derive(Args)]
struct SessionArgs {
    /// Configuration file (defaults to lorekeeper.toml, then LORE_CONFIG_PATH).
    /// LORE_* variables override either.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lore corpus, one snippet per line
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Assistant role text for the NPC
    #[arg(short, long)]
    role: Option<String>,

    /// Model name override
    #[arg(short, long)]
    model: Option<String>,

    /// Score lore with local MiniLM embeddings instead of word overlap
    #[cfg(feature = "embeddings-local")]
    #[arg(long)]
    embeddings: bool,
}

impl SessionArgs {
    fn load_config(&self) -> Result<LorekeeperConfig> {
        let mut config = match &self.config {
            Some(path) => LorekeeperConfig::from_file(path)?,
            None => LorekeeperConfig::load()?,
        };
        if let Some(corpus) = &self.corpus {
            config.retrieval.corpus_path = Some(corpus.clone());
        }
        if let Some(role) = &self.role {
            config.persona.assistant_role = role.clone();
            config.persona.assistant_role_path = None;
        }
        if let Some(model) = &self.model {
            config.backend.model = model.clone();
        }
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "embeddings-local")]
    fn scorer(&self) -> Result<Arc<dyn SimilarityScorer>> {
        use lorekeeper_core::embeddings::LocalEmbeddings;
        use lorekeeper_core::retrieval::EmbeddingScorer;

        if !self.embeddings {
            return Ok(Arc::new(LexicalScorer::new()));
        }
        let provider = LocalEmbeddings::with_default_model()?;
        Ok(Arc::new(EmbeddingScorer::new(Arc::new(provider))))
    }

    #[cfg(not(feature = "embeddings-local"))]
    fn scorer(&self) -> Result<Arc<dyn SimilarityScorer>> {
        Ok(Arc::new(LexicalScorer::new()))
    }
}

fn load_corpus(config: &LorekeeperConfig) -> Result<Corpus> {
    match &config.retrieval.corpus_path {
        Some(path) => Corpus::load(path)
            .with_context(|| format!("loading corpus {}", path.display())),
        None => {
            tracing::warn!("No corpus configured; answering without lore");
            Ok(Corpus::default())
        }
    }
}

async fn chat(session: SessionArgs) -> Result<()> {
    let config = session.load_config()?;
    let corpus = load_corpus(&config)?;
    let backend = OllamaBackend::from_config(&config.backend);
    tracing::info!(endpoint = %backend.endpoint(), model = %backend.model(), "Using Ollama");

    let (events, mut event_rx) = event_channel(config.events.buffer_size);
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            tracing::debug!(event = event.event_type(), turn_id = ?event.turn_id(), "Dialogue event");
        }
    });

    let npc = Arc::new(
        DialogueOrchestrator::builder()
            .corpus(corpus)
            .scorer(session.scorer()?)
            .backend(Arc::new(backend))
            .event_sender(events)
            .config(config)
            .build()?,
    );

    {
        let npc = Arc::clone(&npc);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                npc.shutdown();
            }
        });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match npc.submit(&line).await {
            SubmitOutcome::Answered(report) => println!("NPC: {}", report.response),
            SubmitOutcome::Failed(failure) => {
                println!("NPC: {}", FALLBACK_MESSAGE);
                tracing::debug!(turn_id = %failure.turn_id, "Turn failed");
            }
            SubmitOutcome::Ignored(IgnoredReason::ShutDown) => break,
            SubmitOutcome::Ignored(_) => {}
        }
    }

    npc.shutdown();
    Ok(())
}

async fn prompt(session: SessionArgs, query: String) -> Result<()> {
    let config = session.load_config()?;
    let corpus = load_corpus(&config)?;
    let persona: Persona = config.persona.resolve()?;
    let scorer = session.scorer()?;

    let question = query.trim();
    let context = retrieve_context(
        scorer.as_ref(),
        question,
        corpus.lines(),
        config.retrieval.threshold,
    )
    .await?;

    let mut builder = PromptBuilder::from_persona(&persona);
    builder.set_question("User", question);
    for line in context {
        builder.add_context_document(line);
    }
    print!("{}", builder.build(&ConversationLog::new()));
    Ok(())
}

async fn retrieve(session: SessionArgs, query: String) -> Result<()> {
    let config = session.load_config()?;
    let corpus = load_corpus(&config)?;
    let scorer = session.scorer()?;
    let threshold = config.retrieval.threshold;

    for candidate in score_candidates(scorer.as_ref(), query.trim(), corpus.lines()).await? {
        let marker = if candidate.score > threshold { '*' } else { ' ' };
        println!("{} {:.3}  {}", marker, candidate.score, candidate.text);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat(session) => chat(session).await?,
        Commands::Prompt { session, query } => prompt(session, query).await?,
        Commands::Retrieve { session, query } => retrieve(session, query).await?,
        Commands::Version => {
            println!("lorekeeper {}", env!("CARGO_PKG_VERSION"));
            println!("lorekeeper-core {}", lorekeeper_core::VERSION);
        }
    }

    Ok(())
}
