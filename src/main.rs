//! # SPO Assistant CLI (`spo`)
//!
//! ```bash
//! spo serve                      # start the chat server
//! spo check                      # load and split documents, no network
//! spo --config ./config/spo.toml -v serve
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;

use spo_assistant::chunk::split_pages;
use spo_assistant::config::{load_config, Config};
use spo_assistant::loader::load_documents;
use spo_assistant::{logging, server};

/// SPO assistant: ask questions about study and examination regulations.
#[derive(Parser)]
#[command(name = "spo", version, about)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "./config/spo.toml")]
    config: PathBuf,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the chat server.
    ///
    /// Reads OPENAI_API_KEY (a `.env` file is honoured), builds the index in
    /// the background and serves the chat on `[server].bind`.
    Serve {
        /// Override `[server].bind`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Load and split the documents without calling any external service.
    ///
    /// Prints pages and chunks per file.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    let mut config = load_config(&cli.config).context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            server::run_server(&config).await?;
        }
        Commands::Check => run_check(&config)?,
    }

    Ok(())
}

fn run_check(config: &Config) -> Result<()> {
    let pages = load_documents(&config.documents)?;
    let chunks = split_pages(
        &pages,
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
    );

    let mut per_file: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for page in &pages {
        per_file.entry(page.source.as_str()).or_default().0 += 1;
    }
    for chunk in &chunks {
        per_file.entry(chunk.source.as_str()).or_default().1 += 1;
    }

    println!("{:<48} {:>6} {:>7}", "DOCUMENT", "PAGES", "CHUNKS");
    for (source, (page_count, chunk_count)) in &per_file {
        println!("{:<48} {:>6} {:>7}", source, page_count, chunk_count);
    }
    println!();
    println!(
        "documents: {}  pages: {}  chunks: {}",
        per_file.len(),
        pages.len(),
        chunks.len()
    );
    println!("ok");

    Ok(())
}
