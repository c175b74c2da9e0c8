//! ragslab command line.
//!
//! ```bash
//! ragslab chunk data.txt --size 200 --overlap 50 --separator $'\n\n'
//! ragslab ingest ./data/new_articles --reset
//! ragslab query "find document related to technology company" -k 2
//! ragslab ask "tell me about space x ships."
//! ragslab ask "what did the bank decide?" --docs ./data/new_articles
//! ragslab chat
//! ```
//!
//! Settings come from `--config` (TOML), then `.env` / environment variables.
//! The index is kept under `./db/chroma_persistent_storage` unless
//! `persist_path` says otherwise, so `ingest` and `ask` share it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{ArgAction, Parser, Subcommand};
use ragslab::{
    load_directory, load_file, ChunkParams, Chunker, Document, EmbeddingService, FixedChunker,
    LocalIndex, OpenAiChat, OpenAiEmbeddings, Pipeline, RagConfig, SeparatorChunker, Session,
    Turn,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ragslab", version, about = "Chunk, index and question text documents")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "RAGSLAB_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the chunks of a file.
    Chunk {
        /// UTF-8 text file.
        file: PathBuf,
        /// Chunk size in characters.
        #[arg(long, allow_negative_numbers = true)]
        size: Option<i64>,
        /// Overlap in characters.
        #[arg(long, allow_negative_numbers = true)]
        overlap: Option<i64>,
        /// Split on this separator and merge pieces instead of fixed windows.
        #[arg(long)]
        separator: Option<String>,
    },
    /// Chunk, embed and store a file or a directory of .txt files.
    Ingest {
        /// File or directory.
        path: PathBuf,
        /// Delete the collection first.
        #[arg(long)]
        reset: bool,
    },
    /// Print the chunks nearest to a text.
    Query {
        /// Query text.
        text: String,
        /// Number of results.
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Answer one question from the indexed documents.
    Ask {
        /// The question.
        question: String,
        /// Answer from this file or directory instead of the stored index.
        #[arg(long)]
        docs: Option<PathBuf>,
    },
    /// Interactive conversation; type `exit` to quit.
    Chat,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "ragslab=info",
        1 => "ragslab=debug",
        _ => "ragslab=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RagConfig> {
    dotenvy::dotenv().ok();
    let config = match path {
        Some(path) => RagConfig::load(path)?,
        None => RagConfig::default(),
    }
    .with_env_overrides()
    .with_default_persist_path();
    config.validate()?;
    Ok(config)
}

fn embedder(config: &RagConfig) -> anyhow::Result<Arc<dyn EmbeddingService>> {
    if config.api_key.is_some() {
        return Ok(Arc::new(OpenAiEmbeddings::from_config(config)?));
    }
    local_embedder()
}

#[cfg(feature = "local-embeddings")]
fn local_embedder() -> anyhow::Result<Arc<dyn EmbeddingService>> {
    tracing::info!("No API key configured, using local embeddings");
    Ok(Arc::new(ragslab::LocalEmbeddings::new()?))
}

#[cfg(not(feature = "local-embeddings"))]
fn local_embedder() -> anyhow::Result<Arc<dyn EmbeddingService>> {
    bail!("no API key configured; set OPENAI_API_KEY or build with --features local-embeddings")
}

async fn pipeline(
    config: &RagConfig,
    with_chat: bool,
) -> anyhow::Result<(Pipeline, Arc<LocalIndex>)> {
    let index = Arc::new(LocalIndex::from_config(config).await?);
    let mut pipeline = Pipeline::from_config(config, embedder(config)?, index.clone())?;
    if with_chat {
        pipeline = pipeline.with_chat(Arc::new(OpenAiChat::from_config(config)?));
    }
    Ok((pipeline, index))
}

async fn require_indexed(pipeline: &Pipeline, index: &LocalIndex) -> anyhow::Result<()> {
    pipeline
        .ensure_indexed()
        .await
        .with_context(|| match index.location() {
            Some(path) => format!(
                "nothing indexed in {}; run `ragslab ingest <PATH>` first",
                path.display()
            ),
            None => "nothing indexed; pass --docs <PATH>".to_string(),
        })
}

async fn load_path(path: &Path) -> anyhow::Result<Vec<Document>> {
    let documents = if path.is_dir() {
        load_directory(path).await?
    } else {
        vec![load_file(path).await?]
    };
    Ok(documents)
}

fn chunk_command(
    config: &RagConfig,
    document: &Document,
    size: Option<i64>,
    overlap: Option<i64>,
    separator: Option<String>,
) -> anyhow::Result<()> {
    let params = ChunkParams::from_signed(
        size.unwrap_or(config.chunk_size),
        overlap.unwrap_or(config.chunk_overlap),
    )?;
    let chunker: Box<dyn Chunker> = match separator {
        Some(separator) => Box::new(SeparatorChunker::with_params(params, separator)?),
        None => Box::new(FixedChunker::from_params(params)),
    };

    let chunks = document.chunks(chunker.as_ref());
    println!("Total chunks: {}", chunks.len());
    for chunk in &chunks {
        println!("{}\t{}..{}\t{:?}", chunk.id(), chunk.start, chunk.end, chunk.text);
    }
    Ok(())
}

async fn chat_loop(mut session: Session) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"Ask: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            session.close();
            break;
        };
        match session.handle(&line).await {
            Ok(Turn::Answer(answer)) => println!("Response:: {}\n", answer.text),
            Ok(Turn::Skip) => {}
            Ok(Turn::Exit) => break,
            Err(e) if e.is_retryable() => eprintln!("{e} (try again)"),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Command::Chunk {
            file,
            size,
            overlap,
            separator,
        } => {
            let document = load_file(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            chunk_command(&config, &document, size, overlap, separator)?;
        }
        Command::Ingest { path, reset } => {
            let (pipeline, index) = pipeline(&config, false).await?;
            if reset {
                index.delete_collection().await?;
            }
            let documents = load_path(&path)
                .await
                .with_context(|| format!("loading {}", path.display()))?;
            if documents.is_empty() {
                bail!("no .txt documents found in {}", path.display());
            }
            let report = pipeline.ingest(&documents).await?;
            println!(
                "Ingested {} chunks from {} documents into '{}'",
                report.chunks,
                report.documents,
                index.name()
            );
        }
        Command::Query { text, k } => {
            let (pipeline, index) = pipeline(&config, false).await?;
            require_indexed(&pipeline, &index).await?;
            let hits = pipeline.retrieve(&text, k.unwrap_or(config.top_k)).await?;
            for hit in hits {
                println!(
                    "Found similar document: {} (ID: {}, Distance: {:.4})",
                    hit.text, hit.id, hit.distance
                );
            }
        }
        Command::Ask { question, docs } => {
            let config = match docs {
                Some(_) => RagConfig {
                    persist_path: None,
                    ..config
                },
                None => config,
            };
            let (pipeline, index) = pipeline(&config, true).await?;
            if let Some(path) = &docs {
                let documents = load_path(path)
                    .await
                    .with_context(|| format!("loading {}", path.display()))?;
                let report = pipeline.ingest(&documents).await?;
                tracing::info!(chunks = report.chunks, "Indexed documents for this question");
            }
            require_indexed(&pipeline, &index).await?;
            let answer = pipeline.answer(&question).await?;
            println!("The Query:: {question}.\nResponse:: {}", answer.text);
        }
        Command::Chat => {
            let (pipeline, index) = pipeline(&config, true).await?;
            require_indexed(&pipeline, &index).await?;
            let session =
                Session::new(pipeline, config.max_history).with_top_k(config.chat_top_k)?;
            chat_loop(session).await?;
        }
    }

    Ok(())
}
