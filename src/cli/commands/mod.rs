//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod audit;
mod extract;
mod init;
mod reprocess;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::load_settings;

#[derive(Parser)]
#[command(name = "earchive")]
#[command(about = "Document archive with OCR enrichment")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Start the archive service
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default from config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Start the OCR worker
    Worker {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default from config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Send a document to the OCR worker again
    Reprocess {
        /// Document ID
        id: String,
    },

    /// Show recent audit log entries
    Audit {
        /// Only entries by this actor
        #[arg(long)]
        actor: Option<String>,
        /// Only entries with this action (e.g. AddDocument)
        #[arg(long)]
        action: Option<String>,
        /// Maximum number of entries
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Run metadata extraction on a text file and print the result
    Extract {
        /// Text file to analyze
        file: PathBuf,
        /// Department to carry into the result
        #[arg(short, long)]
        department: Option<String>,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (settings, _config) = load_settings(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.bind.clone());
            serve::cmd_serve(&settings, &bind).await
        }
        Commands::Worker { bind } => {
            let bind = bind.unwrap_or_else(|| settings.worker_bind.clone());
            serve::cmd_worker(&settings, &bind).await
        }
        Commands::Reprocess { id } => reprocess::cmd_reprocess(&settings, &id).await,
        Commands::Audit {
            actor,
            action,
            limit,
        } => audit::cmd_audit(&settings, actor, action, limit).await,
        Commands::Extract { file, department } => {
            extract::cmd_extract(&file, department.as_deref())
        }
    }
}
