//! # triggerstate CLI
//!
//! Inspect and drive a trigger status file from the shell.
//!
//! ## Usage
//! ```bash
//! # Does anything under these paths need its hook re-run?
//! triggerstate check /etc/ld.so.conf /usr/lib/fonts || ldconfig
//!
//! # Record paths after their hook succeeded
//! triggerstate record /etc/ld.so.conf
//!
//! # Show what is tracked
//! triggerstate list --json
//!
//! # Rewrite the status file without vanished paths
//! triggerstate gc
//! ```
//!
//! Exit status: 0 on success, 1 when `check` found a path needing an update,
//! 2 on error.

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use colored::*;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use triggerstate::{StateTracker, TrackerConfig};

/// Change detection for post-install triggers
#[derive(Parser)]
#[command(name = "triggerstate")]
#[command(version)]
#[command(about = "Track modification times of trigger inputs between runs")]
#[command(long_about = None)]
struct Cli {
    /// Status file (defaults to /var/lib/triggerstate/status)
    #[arg(short, long, global = true, env = "TRIGGERSTATE_STATUS_FILE")]
    status_file: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report which paths need their hook re-run
    Check {
        /// Paths to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Treat every resolvable path as changed
        #[arg(short, long)]
        force: bool,
    },

    /// Record the current modification time of paths
    Record {
        /// Paths to record
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List tracked paths
    #[command(alias = "ls")]
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rewrite the status file, dropping paths that no longer exist
    #[command(alias = "garbage-collect")]
    Gc,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("TRIGGERSTATE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

/// Main command runner
fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config, cli.status_file)?;

    match cli.command {
        Commands::Check { paths, force } => cmd_check(config, paths, force),
        Commands::Record { paths } => cmd_record(config, paths),
        Commands::List { json } => cmd_list(config, json),
        Commands::Gc => cmd_gc(config),
    }
}

/// Build the tracker configuration from file and flags
fn load_config(config_file: Option<PathBuf>, status_file: Option<PathBuf>) -> Result<TrackerConfig> {
    let mut config = match config_file {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => TrackerConfig::default(),
    };

    if let Some(status_file) = status_file {
        config.status_file = status_file;
    }
    Ok(config)
}

fn open_tracker(config: TrackerConfig) -> Result<StateTracker> {
    let status_file = config.status_file.clone();
    StateTracker::open(config)
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .with_context(|| format!("loading {}", status_file.display()))
}

/// Check paths and report the reason for each decision
fn cmd_check(config: TrackerConfig, paths: Vec<PathBuf>, force: bool) -> Result<ExitCode> {
    let tracker = open_tracker(config)?;
    let mut any_stale = false;

    for path in &paths {
        let staleness = tracker.staleness(path, force);
        if staleness.needs_update() {
            any_stale = true;
            println!("{} {} ({})", "✗".yellow().bold(), path.display(), staleness);
        } else {
            println!("{} {} ({})", "✓".green().bold(), path.display(), staleness.to_string().dimmed());
        }
    }

    Ok(if any_stale { ExitCode::from(1) } else { ExitCode::SUCCESS })
}

/// Record paths and persist the status file
fn cmd_record(config: TrackerConfig, paths: Vec<PathBuf>) -> Result<ExitCode> {
    let mut tracker = open_tracker(config)?;

    for path in &paths {
        tracker
            .push_path(path)
            .with_context(|| format!("recording {}", path.display()))?;
    }

    let summary = tracker.write()?;
    println!(
        "{} Recorded {} paths ({} tracked)",
        "✓".green().bold(),
        paths.len(),
        summary.written
    );
    Ok(ExitCode::SUCCESS)
}

/// Print every tracked entry
fn cmd_list(config: TrackerConfig, json: bool) -> Result<ExitCode> {
    let tracker = open_tracker(config)?;

    if json {
        let entries: Vec<_> = tracker.entries().collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(ExitCode::SUCCESS);
    }

    if tracker.is_empty() {
        println!("{}", "No tracked paths".dimmed());
        return Ok(ExitCode::SUCCESS);
    }

    for entry in tracker.entries() {
        let when = DateTime::from_timestamp(entry.mtime, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| entry.mtime.to_string());
        println!("{}  {}", when.cyan(), entry.path);
    }
    Ok(ExitCode::SUCCESS)
}

/// Load and rewrite, reporting vanished paths
fn cmd_gc(config: TrackerConfig) -> Result<ExitCode> {
    let status_file = config.status_file.clone();
    let mut tracker = StateTracker::with_config(config);
    let loaded = tracker
        .load()
        .with_context(|| format!("loading {}", status_file.display()))?;
    let written = tracker.write()?;

    println!(
        "{} Kept {} entries, removed {}",
        "✓".green().bold(),
        written.written,
        loaded.discarded + written.dropped
    );
    Ok(ExitCode::SUCCESS)
}
