//! # hw-cli
//!
//! Command-line host for the hookwarden pipeline.
//!
//! - `hookwarden check` — run one event (stdin or `--event FILE`) and print the decision
//! - `hookwarden serve` — JSON-lines loop on stdin/stdout with manifest hot-reload
//! - `hookwarden validate` — load the manifest and list hooks by tier
//! - `hookwarden audit verify/tail` — inspect the verdict log
//!
//! Logs go to stderr so stdout stays a clean response channel.

mod commands;
mod engine;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::engine::EngineContext;

/// hookwarden — run lifecycle hooks around agent tool calls.
#[derive(Parser)]
#[command(name = "hookwarden", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, global = true, default_value = ".")]
    project_root: PathBuf,

    /// Hook manifest (defaults to .hookwarden/hooks.yaml).
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    /// Engine config (defaults to .hookwarden/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines instead of plain text.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one event through the pipeline.
    Check {
        /// Read the event from a file instead of stdin.
        #[arg(long)]
        event: Option<PathBuf>,
        /// Print the full result (per-hook verdicts, timings) instead of the host response.
        #[arg(long)]
        full: bool,
    },
    /// Process newline-delimited events from stdin until EOF.
    Serve {
        /// Print full results instead of host responses.
        #[arg(long)]
        full: bool,
        /// Do not watch the manifest for changes.
        #[arg(long)]
        no_watch: bool,
    },
    /// Validate the manifest and list registered hooks.
    Validate,
    /// Inspect the verdict log.
    Audit {
        #[command(subcommand)]
        command: commands::audit::AuditCommands,
    },
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("hw_engine=info".parse()?)
        .add_directive("hookwarden=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let ctx = EngineContext::load(&project_root, cli.manifest, cli.config)?;

    match &cli.command {
        Commands::Check { event, full } => {
            let blocked = commands::check::execute(&ctx, event.as_deref(), *full)?;
            if blocked {
                std::process::exit(hw_evaluators::BLOCK_EXIT_CODE);
            }
            Ok(())
        }
        Commands::Serve { full, no_watch } => commands::serve::execute(&ctx, *full, !*no_watch),
        Commands::Validate => commands::validate::execute(&ctx),
        Commands::Audit { command } => commands::audit::execute(command, &ctx),
    }
}
