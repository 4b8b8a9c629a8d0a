//! posh - prompt renderer cache tooling
//!
//! Main entry point for the posh CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use posh_cache::{BackendKind, CACHE_DIR_ENV, CacheConfig, SESSION_ID_ENV};

mod commands;

use commands::cache;

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// posh - prompt renderer cache tooling
#[derive(Parser)]
#[command(name = "posh")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Also write a JSON log under <cache dir>/logs
    #[arg(long, global = true)]
    pub log_file: bool,

    /// Cache directory (default: platform cache directory)
    #[arg(long, global = true, env = CACHE_DIR_ENV)]
    pub cache_dir: Option<PathBuf>,

    /// Session identifier (default: generated per process)
    #[arg(long, global = true, env = SESSION_ID_ENV)]
    pub session_id: Option<String>,

    /// Persistence backend: file or mapped
    #[arg(long, global = true)]
    pub backend: Option<BackendKind>,

    /// Keep changes in memory only
    #[arg(long, global = true)]
    pub no_persist: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect and manage the prompt cache
    Cache(cache::CacheArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = CacheConfig::new().with_persist(!cli.no_persist);
    if let Some(dir) = cli.cache_dir.filter(|d| !d.as_os_str().is_empty()) {
        config = config.with_cache_dir(dir);
    }
    if let Some(id) = cli.session_id {
        config = config.with_session_id(id);
    }
    if let Some(backend) = cli.backend {
        config = config.with_backend(backend);
    }

    // Console logging to stderr, plus an optional rotating JSON file
    use tracing_subscriber::prelude::*;

    let filter = if cli.verbose {
        "posh=debug,posh_cache=debug,warn"
    } else {
        "warn"
    };
    let console_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let (file_layer, _guard) = if cli.log_file {
        let log_dir = config
            .cache_dir
            .clone()
            .unwrap_or_else(|| posh_cache::paths::cache_dir().to_path_buf())
            .join("logs");
        let file_appender = tracing_appender::rolling::daily(&log_dir, "posh.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_filter(tracing_subscriber::EnvFilter::new(
                "posh=trace,posh_cache=trace,info",
            ));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    // Create context for commands
    let ctx = commands::Context {
        config,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Cache(args) => cache::run(args, &ctx),
    }
}
