//! episort - keyword-rule media sorter for watched download folders.
//!
//! Usage:
//!   episort                  Watch all rule sources (ENTER = manual scan)
//!   episort scan             Scan every rule source once and exit
//!   episort init             Write an example rules file
//!   episort --help           Show help

use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use episort_core::{write_example_rules, RuleSet};
use episort_watch::{ScanCoordinator, SorterConfig, WatchService};

#[derive(Parser)]
#[command(
    name = "episort",
    version,
    about = "Sort arriving files into renamed episode copies",
    long_about = "episort watches the source folders named in your rules file, \
                  waits for each arriving file to finish writing, and copies it \
                  to its destination under a sequential episode name.\n\n\
                  Run with no subcommand to start watching; press ENTER for a \
                  manual scan of all watched folders."
)]
struct Cli {
    /// Path to the rules file
    #[arg(short, long, default_value = "rules.json")]
    rules: PathBuf,

    /// Seconds between file-stability samples
    #[arg(long, default_value = "3")]
    poll_interval: u64,

    /// Probe attempts before a file is skipped as not ready
    #[arg(long, default_value = "100")]
    max_attempts: u32,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Scan every rule source once and exit
    Scan,

    /// Write an example rules file and exit
    Init {
        /// Overwrite an existing rules file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Some(Command::Init { force }) = cli.command {
        return run_init(&cli.rules, force);
    }

    let config = SorterConfig::builder()
        .poll_interval(Duration::from_secs(cli.poll_interval))
        .max_attempts(cli.max_attempts)
        .build()
        .map_err(|e| eyre!("invalid sorter configuration: {e}"))?;

    let (rules, warnings) = RuleSet::load(&cli.rules)
        .with_context(|| format!("failed to load rules from {}", cli.rules.display()))?;
    for warning in &warnings {
        warn!("{warning}");
    }
    info!(rules = rules.len(), sources = rules.sources().count(), "rules loaded");

    match cli.command {
        Some(Command::Scan) => run_scan(&rules, &config).await,
        Some(Command::Init { .. }) => unreachable!("handled above"),
        None => run_watch(&rules, &config).await,
    }
}

/// Write the example rules file for first-run setup.
fn run_init(path: &PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(eyre!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }
    write_example_rules(path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    println!("Example rules file created at: {}", path.display());
    println!("Configure it with your own rules before watching.");
    Ok(())
}

/// One-shot scan of every rule source.
async fn run_scan(rules: &RuleSet, config: &SorterConfig) -> Result<()> {
    let coordinator = ScanCoordinator::new(episort_watch::build_guards(rules, config));
    let summary = tokio::task::spawn_blocking(move || coordinator.scan_all())
        .await
        .context("scan task failed")?;

    println!(
        "Scan complete: {} processed, {} skipped",
        summary.processed, summary.skipped
    );
    Ok(())
}

/// Watch all rule sources until Ctrl+C.
async fn run_watch(rules: &RuleSet, config: &SorterConfig) -> Result<()> {
    let service = WatchService::new(rules, config);
    let cancel = service.cancellation_token();
    let (scan_tx, scan_rx) = mpsc::channel(1);

    // ENTER triggers a manual scan, like the original console loop.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            if line.is_err() || scan_tx.blocking_send(()).is_err() {
                break;
            }
        }
    });

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    println!("Press ENTER to run a manual scan on all files. Ctrl+C to exit.");
    service.run(scan_rx).await.context("watch loop failed")?;
    Ok(())
}
