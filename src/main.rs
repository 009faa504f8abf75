//! # docqa CLI
//!
//! The `docqa` binary drives the document QA pipeline: database
//! initialization, document management, ingestion, question answering,
//! and the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa init` | Create the SQLite database schema |
//! | `docqa docs add` | Insert a completed document from a text file |
//! | `docqa docs list` | List a user's documents |
//! | `docqa ingest <id>` | Chunk and embed one document |
//! | `docqa ask "<question>"` | Answer a question over ingested documents |
//! | `docqa serve` | Start the HTTP API server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docqa::{config, docs_cmd, ingest, migrate, qa, server};

/// docqa — a retrieval-augmented question answering service for user
/// documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docqa.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "docqa — retrieval-augmented question answering over user documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables.
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Manage documents.
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Chunk and embed a completed document.
    ///
    /// Splits the document's extracted text into overlapping chunks,
    /// embeds each chunk, and upserts the vectors. Re-running without
    /// `--reindex` skips unchanged chunks.
    Ingest {
        /// Document UUID.
        document_id: String,

        /// Owning user identifier.
        #[arg(long)]
        user: String,

        /// Delete all existing chunks for the document before ingesting.
        #[arg(long)]
        reindex: bool,
    },

    /// Answer a question over the user's completed documents.
    Ask {
        /// The question to answer.
        question: String,

        /// Owning user identifier.
        #[arg(long)]
        user: String,

        /// Restrict to specific document UUIDs (repeatable). Default:
        /// all completed documents.
        #[arg(long = "doc")]
        docs: Vec<String>,

        /// Number of chunks to send to the model (clamped to 1..=12).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Start the HTTP API server.
    Serve,
}

/// Document management subcommands.
#[derive(Subcommand)]
enum DocsAction {
    /// Insert a completed document from a local text file.
    Add {
        /// Owning user identifier.
        #[arg(long)]
        user: String,
        /// Display name for the document.
        #[arg(long)]
        name: String,
        /// Path to a plain-text file with the document's content.
        #[arg(long)]
        file: PathBuf,
    },
    /// List a user's documents with status and chunk counts.
    List {
        /// Owning user identifier.
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Docs { action } => match action {
            DocsAction::Add { user, name, file } => {
                docs_cmd::run_docs_add(&cfg, &user, &name, &file).await?;
            }
            DocsAction::List { user } => {
                docs_cmd::run_docs_list(&cfg, &user).await?;
            }
        },
        Commands::Ingest {
            document_id,
            user,
            reindex,
        } => {
            ingest::run_ingest(&cfg, &user, &document_id, reindex).await?;
        }
        Commands::Ask {
            question,
            user,
            docs,
            top_k,
        } => {
            let scope = if docs.is_empty() { None } else { Some(docs) };
            qa::run_ask(&cfg, &user, &question, scope, top_k).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
