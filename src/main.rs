//! # ci-triage CLI
//!
//! ## Usage
//!
//! ```bash
//! ci-triage --config ./config/ci-triage.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ci-triage serve` | Start the HTTP server |
//! | `ci-triage analyze <file>` | Full triage report, including the model's answer |
//! | `ci-triage parse <file>` | Platform, failed step, and error context only |
//!
//! Pass `-` as the file to read the log from stdin.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::Level;

use ci_triage::{config, llm, pipeline, server, telemetry};

/// ci-triage: find out why a CI/CD job failed.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "ci-triage",
    about = "ci-triage: classify CI/CD logs and suggest fixes for failed jobs",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ci-triage.toml")]
    config: PathBuf,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` and serves `POST /analyze` and `GET /health`.
    Serve,

    /// Triage a log file and print the full report as JSON.
    ///
    /// Calls the configured language model. If the model cannot be reached
    /// the report is still printed, with the failure described in
    /// `root_cause`.
    Analyze {
        /// Log file to read, or `-` for stdin.
        path: PathBuf,
    },

    /// Extract platform, failed step, and error context without calling the model.
    Parse {
        /// Log file to read, or `-` for stdin.
        path: PathBuf,
    },
}

fn read_log(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut log = String::new();
        std::io::stdin()
            .read_to_string(&mut log)
            .context("Failed to read log from stdin")?;
        return Ok(log);
    }
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read log file: {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_json, Level::INFO);

    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Analyze { path } => {
            let log = read_log(&path)?;
            let client = llm::create_client(&cfg.llm)?;
            let report = pipeline::analyze_log(client.as_ref(), &log).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Parse { path } => {
            let log = read_log(&path)?;
            let parsed = pipeline::parse_log(&log);
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
    }

    Ok(())
}
