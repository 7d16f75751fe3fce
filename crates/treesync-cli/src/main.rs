//! treesync - one-way directory synchronization
//!
//! Brings a target directory in line with a source directory: files are
//! compared by SHA-256 content, size, modification time and permissions, the
//! differences are explained, and after confirmation they are applied by a
//! pool of concurrent workers.

mod display;
mod progress;
mod validate;

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::{style, Term};
use dialoguer::Confirm;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use treesync_config::{Config, ConfigLoader};
use treesync_sync::{
    write_explanation, NullSink, ProgressSink, SyncEngine, SyncOptions, SyncRequest,
};
use treesync_types::WorkerCount;

use crate::progress::{BarSink, LineSink};

/// treesync - one-way directory synchronization
#[derive(Parser, Debug)]
#[command(
    name = "treesync",
    version = env!("CARGO_PKG_VERSION"),
    about = "One-way directory synchronization with content checksums",
    long_about = "treesync brings TARGET in line with SOURCE.\n\
                  Files are compared by SHA-256 content, size, modification time\n\
                  and permissions; differences are explained before anything is written."
)]
struct Cli {
    /// Source directory
    source: PathBuf,

    /// Target directory
    target: PathBuf,

    /// Delete files in the target that are missing from the source
    #[arg(long)]
    delete_missing: bool,

    /// Apply without asking for confirmation
    #[arg(short = 'y', long)]
    yes: bool,

    /// Explain the differences and stop
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Number of apply workers (clamped to 2-8)
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Verbose mode - detailed output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", style("✗").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    init_logging(&cli, &config)?;

    info!("treesync v{} starting", env!("CARGO_PKG_VERSION"));

    if !validate::is_directory(&cli.source) {
        bail!("Source not a directory: {}", cli.source.display());
    }
    if !validate::is_directory(&cli.target) || !validate::is_writable(&cli.target) {
        bail!("Target not writeable: {}", cli.target.display());
    }

    let options = SyncOptions::from(&config.sync);
    info!(
        "Sync options: delete_missing={}, workers={}, progress_interval={:?}",
        options.delete_missing,
        options.workers.get(),
        options.progress_interval.get()
    );

    let engine = SyncEngine::new(options);
    let request = SyncRequest::new(&cli.source, &cli.target);
    let plan = engine.plan(&request).await.context("Scan failed")?;

    if !plan.is_sync_required() {
        println!("No sync required");
        return Ok(ExitCode::SUCCESS);
    }

    write_explanation(&mut std::io::stdout().lock(), &plan.actions)
        .context("Failed to write explanation")?;
    if !cli.quiet {
        display::display_plan_summary(&plan.summary(), plan.delete_missing);
    }

    if cli.dry_run {
        println!(
            "{} Dry run mode - no changes were made",
            style("ℹ").yellow()
        );
        return Ok(ExitCode::SUCCESS);
    }

    if !cli.yes && !confirm() {
        println!("Operation canceled.");
        return Ok(ExitCode::SUCCESS);
    }

    let total = plan.actions.len() as u64;
    let sink: Arc<dyn ProgressSink> = if cli.quiet {
        Arc::new(NullSink)
    } else if Term::stdout().is_term() {
        Arc::new(BarSink::new(total))
    } else {
        Arc::new(LineSink)
    };

    let report = engine.execute_with_sink(plan, sink).await?;
    if !report.is_clean() {
        warn!("{} of {} actions failed", report.failed, report.total);
    }
    if !cli.quiet {
        display::display_apply_report(&report);
    }

    println!("Done");
    Ok(ExitCode::SUCCESS)
}

/// Ask before writing to the target; defaults to yes
fn confirm() -> bool {
    match Confirm::new()
        .with_prompt("Do you want to proceed?")
        .default(true)
        .interact()
    {
        Ok(proceed) => proceed,
        Err(e) => {
            warn!(
                "Cannot prompt for confirmation ({}); pass --yes to skip the prompt",
                e
            );
            false
        }
    }
}

/// Layer config file, environment and flags
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)
            .map_err(treesync_types::Error::from)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ConfigLoader::load_default()
            .map_err(treesync_types::Error::from)
            .context("Failed to load configuration")?,
    };

    if cli.delete_missing {
        config.sync.delete_missing = true;
    }
    if let Some(workers) = cli.workers {
        config.sync.workers = Some(WorkerCount::clamped(workers).get());
    }

    Ok(config)
}

fn init_logging(cli: &Cli, config: &Config) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        config.logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log filter")?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    if config.logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}
