//! # docrag CLI
//!
//! The `docrag` binary drives the content pipeline from the command
//! line: database initialization, document ingestion, chunk
//! regeneration, inspection, and retrieval checks.
//!
//! ## Usage
//!
//! ```bash
//! docrag --config ./config/docrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docrag init` | Create the SQLite database and run schema migrations |
//! | `docrag ingest <file>` | Ingest a text file as a new document |
//! | `docrag regenerate <id>` | Re-chunk and re-embed an existing document |
//! | `docrag list` | List stored documents |
//! | `docrag get <id>` | Show a document with its chunks |
//! | `docrag delete <id>` | Delete a document and its chunks |
//! | `docrag clear-chunks` | Delete every chunk across all documents |
//! | `docrag ask "<question>"` | Retrieve the nearest published chunks |

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docrag::config;
use docrag::db;
use docrag::embedding::create_provider;
use docrag::ingest::{IngestRequest, Ingestor};
use docrag::migrate;
use docrag::models::DocumentFilter;
use docrag::retrieve::Retriever;
use docrag::store::DocumentStore;
use docrag::store_sqlite::SqliteStore;

/// docrag CLI — ingestion and retrieval core for an institutional
/// website's AI assistant.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file. See `config/docrag.example.toml` for a full
/// example.
#[derive(Parser)]
#[command(
    name = "docrag",
    about = "docrag — document ingestion and retrieval for a grounded AI assistant",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the documents and chunks
    /// tables. Idempotent — running it multiple times is safe.
    Init,

    /// Ingest a text file as a new document.
    ///
    /// Normalizes the body, splits it into overlapping chunks, and
    /// embeds each chunk if an embedding provider is configured. The
    /// summary line reports how many chunks were embedded; partial
    /// embedding is normal when the provider hits quota or transient
    /// errors.
    Ingest {
        /// Path to a UTF-8 text file containing the document body.
        file: PathBuf,

        /// Document title. Defaults to the file stem.
        #[arg(long)]
        title: Option<String>,

        /// Canonical source URL for the document.
        #[arg(long)]
        url: Option<String>,

        /// Free-form JSON metadata object stored with the document.
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Re-chunk and re-embed an existing document.
    ///
    /// Discards the document's current chunks and rebuilds them from
    /// its stored body. Useful after changing chunking settings or to
    /// retry embedding after a provider outage.
    Regenerate {
        /// Document UUID.
        id: String,
    },

    /// List stored documents, newest first.
    List,

    /// Show a document's metadata, body, and chunks.
    Get {
        /// Document UUID.
        id: String,
    },

    /// Delete a document and all of its chunks.
    Delete {
        /// Document UUID.
        id: String,
    },

    /// Delete every chunk across all documents.
    ///
    /// Documents survive; their `updated_at` is bumped so a later
    /// regeneration pass can find them. Use before switching embedding
    /// models or dimensions.
    ClearChunks,

    /// Retrieve the nearest published chunks for a question.
    ///
    /// Requires an embedding provider. Prints ranked chunks with their
    /// cosine similarity scores; prints nothing relevant found when
    /// retrieval degrades.
    Ask {
        /// The visitor question.
        question: String,

        /// Number of chunks to retrieve (defaults to retrieval.top_k).
        #[arg(long)]
        k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    let pool = db::connect(&cfg.db.path).await?;

    if let Commands::Init = cli.command {
        migrate::run_migrations(&pool).await?;
        println!("Database initialized at {}", cfg.db.path.display());
        return Ok(());
    }

    let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::new(pool));
    // Only commands that embed need the provider (and its API key).
    let provider = || {
        let api_key = std::env::var("OPENAI_API_KEY").ok();
        create_provider(&cfg.embedding, api_key)
    };

    match cli.command {
        Commands::Init => unreachable!(),
        Commands::Ingest {
            file,
            title,
            url,
            metadata,
        } => {
            let body = std::fs::read_to_string(&file)
                .map_err(|e| anyhow::anyhow!("failed to read {}: {}", file.display(), e))?;
            let title = title.unwrap_or_else(|| {
                file.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "untitled".to_string())
            });

            let ingestor = Ingestor::new(store, provider()?, cfg.chunking.clone());
            let result = ingestor
                .ingest(IngestRequest {
                    title,
                    body,
                    source_url: url,
                    metadata_json: metadata,
                })
                .await?;

            println!("Ingested \"{}\" ({})", result.title, result.document_id);
            println!(
                "  chunks: {}  embedded: {}  status: {}",
                result.total_chunks, result.embedded_chunks, result.status
            );
        }
        Commands::Regenerate { id } => {
            let ingestor = Ingestor::new(store, provider()?, cfg.chunking.clone());
            let result = ingestor.regenerate(&id).await?;
            println!("Regenerated \"{}\" ({})", result.title, result.document_id);
            println!(
                "  chunks: {}  embedded: {}  status: {}",
                result.total_chunks, result.embedded_chunks, result.status
            );
        }
        Commands::List => {
            let docs = store.list_documents(&DocumentFilter::default()).await?;
            if docs.is_empty() {
                println!("No documents.");
                return Ok(());
            }
            for doc in docs {
                let chunks = store.count_chunks(Some(&doc.id)).await?;
                println!(
                    "{}  {}  [{} chunks{}]",
                    doc.id,
                    doc.title,
                    chunks,
                    if doc.published { "" } else { ", unpublished" }
                );
            }
        }
        Commands::Get { id } => {
            let doc = store
                .get_document(&id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("document not found: {}", id))?;
            println!("id:       {}", doc.id);
            println!("title:    {}", doc.title);
            if let Some(url) = &doc.source_url {
                println!("url:      {}", url);
            }
            println!("metadata: {}", doc.metadata_json);
            println!("published: {}", doc.published);
            println!();
            println!("{}", doc.body);

            let chunks = store.get_document_chunks(&doc.id).await?;
            println!();
            println!("--- {} chunks ---", chunks.len());
            for chunk in chunks {
                let embedded = if chunk.embedding.is_some() {
                    "embedded"
                } else {
                    "no embedding"
                };
                println!(
                    "[{}] {} words, {} ({})",
                    chunk.chunk_index,
                    chunk.text.split_whitespace().count(),
                    embedded,
                    chunk.id
                );
            }
        }
        Commands::Delete { id } => {
            store.delete_document(&id).await?;
            println!("Deleted document {}", id);
        }
        Commands::ClearChunks => {
            let ingestor = Ingestor::new(store, None, cfg.chunking.clone());
            let result = ingestor.clear_all().await?;
            println!(
                "Removed {} chunks across {} documents.",
                result.chunks_removed, result.documents_touched
            );
        }
        Commands::Ask { question, k } => {
            let retriever = Retriever::new(store, provider()?, cfg.retrieval.top_k);
            let hits = match k {
                Some(k) => retriever.retrieve_top(&question, k).await,
                None => retriever.retrieve(&question).await,
            };

            if hits.is_empty() {
                println!("No relevant chunks found.");
                return Ok(());
            }
            for hit in hits {
                println!(
                    "score {:.4}  doc {}  chunk {}",
                    hit.score, hit.chunk.document_id, hit.chunk.chunk_index
                );
                let preview: String = hit.chunk.text.chars().take(200).collect();
                println!("  {}", preview);
            }
        }
    }

    Ok(())
}
