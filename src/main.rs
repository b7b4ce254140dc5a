//! # docsift CLI
//!
//! The `docsift` binary ingests PDFs and scanned images into a local vector
//! index and answers retrieval queries against it.
//!
//! ## Usage
//!
//! ```bash
//! docsift --config ./config/docsift.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docsift add <path>` | Extract, chunk, embed and index one document |
//! | `docsift search "<query>"` | Print the top-k matching chunks as JSON |
//! | `docsift context "<query>"` | Print a length-bounded context block |
//! | `docsift stats` | Summarize the indexed corpus |
//! | `docsift serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! docsift add ./manuals/irrigation.pdf
//! docsift add ./scans/invoice-0042.png
//! docsift search "drip line spacing" --top-k 3
//! docsift search "late fee" --source invoice-0042.png
//! docsift context "how often to rotate crops" --max-length 1500
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` (e.g. `RUST_LOG=docsift=debug`) to
//! change verbosity.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docsift::config;
use docsift::retriever::Retriever;
use docsift::server;
use docsift::stats;

/// docsift: retrieval over PDFs and scanned images.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docsift.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docsift",
    about = "docsift: local retrieval over PDFs and scanned images",
    version,
    long_about = "docsift extracts text from PDFs (per page) and images (via OCR), splits it into \
    overlapping chunks, embeds them, and serves nearest-neighbor search and context assembly \
    from a persisted vector index."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docsift.toml`. Built-in defaults apply when the
    /// file does not exist.
    #[arg(long, global = true, default_value = "./config/docsift.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ingest one PDF or image.
    ///
    /// Prints `Document added: true` when at least one chunk was indexed,
    /// `false` otherwise (unsupported type, unreadable file, no text,
    /// embedding failure). Details go to the log.
    Add {
        /// Path to a `.pdf`, `.png`, `.jpg`, `.jpeg`, `.tiff`, `.tif` or `.bmp` file.
        path: PathBuf,
    },

    /// Search indexed chunks by semantic similarity.
    ///
    /// Prints a JSON array of results, best first.
    Search {
        /// Free-text query.
        query: String,

        /// Maximum number of results (defaults to `[retrieval].top_k`).
        #[arg(long)]
        top_k: Option<usize>,

        /// Only search chunks from this document (file name as indexed).
        #[arg(long)]
        source: Option<String>,
    },

    /// Build a context block for a query.
    ///
    /// Concatenates the best-matching chunks, each with a source and
    /// relevance header, up to a character budget.
    Context {
        /// Free-text query.
        query: String,

        /// Character budget (defaults to `[retrieval].max_context_length`).
        #[arg(long)]
        max_length: Option<usize>,
    },

    /// Show corpus statistics.
    Stats,

    /// Start the HTTP server on `[server].bind`.
    Serve,
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
        Commands::Add { path } => {
            let retriever = Retriever::open(&cfg).await?;
            let added = retriever.add_document(&path).await;
            println!("Document added: {}", added);
            retriever.close().await?;
        }
        Commands::Search {
            query,
            top_k,
            source,
        } => {
            let retriever = Retriever::open(&cfg).await?;
            let top_k = top_k.unwrap_or(cfg.retrieval.top_k);
            let results = match source {
                Some(source) => retriever.try_search(&query, top_k, Some(&source)).await?,
                None => retriever.search(&query, top_k).await,
            };
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Context { query, max_length } => {
            let retriever = Retriever::open(&cfg).await?;
            let max_length = max_length.unwrap_or(cfg.retrieval.max_context_length);
            let context = retriever.get_context(&query, max_length).await;
            println!("{}", context);
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
