use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use clipvault::{
    bookmarks,
    config::{self, AnalyzerKind, Config},
    extractor::ContentExtractor,
    runs::{self, BatchEnd},
    vault::Vault,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "clipvault")]
#[command(version, about = "Clip saved bookmarks into a Markdown vault")]
struct Cli {
    /// Vault root the notes are written under
    #[arg(short, long, env = config::ENV_VAULT_PATH)]
    vault: Option<PathBuf>,

    /// Bookmark export (CSV)
    #[arg(short, long, default_value = "part_000000.csv")]
    csv: PathBuf,

    /// Process at most this many items
    #[arg(short, long)]
    limit: Option<usize>,

    /// Write run results here instead of a new timestamped run folder
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run the browser headless
    #[arg(long, value_parser = parse_headless)]
    headless: Option<bool>,

    /// Resume from a previous run: the given folder, or the latest one
    #[arg(short, long, num_args = 0..=1)]
    resume: Option<Option<PathBuf>>,

    /// Readable-content analyzer: defuddle or readability
    #[arg(long)]
    analyzer: Option<AnalyzerKind>,

    /// Navigation timeout in milliseconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_ms: Option<u64>,
}

fn parse_headless(raw: &str) -> Result<bool, config::ConfigError> {
    config::parse_bool("--headless", raw)
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("fatal: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(vault) = cli.vault {
        config.vault_path = Some(vault);
    }
    if let Some(headless) = cli.headless {
        config.headless = headless;
    }
    if let Some(analyzer) = cli.analyzer {
        config.analyzer = analyzer;
    }
    if let Some(ms) = cli.timeout_ms {
        config.navigation_timeout = Duration::from_millis(ms);
    }

    let Some(vault_path) = config.vault_path.clone() else {
        bail!(
            "vault path is required: set {} or pass --vault",
            config::ENV_VAULT_PATH
        );
    };
    let vault = Vault::new(std::path::absolute(&vault_path).unwrap_or(vault_path));
    info!(vault = %vault.root().display(), csv = %cli.csv.display(), "starting");

    let items = bookmarks::read_export(&cli.csv)
        .with_context(|| format!("reading {}", cli.csv.display()))?;

    let (mut pending, mut results) = match &cli.resume {
        Some(folder) => {
            let folder = match folder {
                Some(folder) => Some(folder.clone()),
                None => runs::find_latest_run(&config.outputs_dir)?,
            };
            match folder {
                Some(folder) => {
                    info!(folder = %folder.display(), "resuming");
                    let previous = runs::read_previous_results(&folder)?;
                    runs::plan_resume(items, &previous)
                }
                None => {
                    info!("no previous run found, processing all items");
                    (items, Vec::new())
                }
            }
        }
        None => (items, Vec::new()),
    };

    if let Some(limit) = cli.limit {
        pending.truncate(limit);
    }

    let output_dir = match cli.output {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating {}", dir.display()))?;
            dir
        }
        None => runs::create_run_folder(&config.outputs_dir)?,
    };
    info!(items = pending.len(), output = %output_dir.display(), "processing");

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal, finishing the current item...");
        shutdown_signal.cancel();
    });

    let mut extractor = ContentExtractor::from_config(&config);
    let end = runs::process_batch(&mut extractor, &vault, &pending, &mut results, &shutdown).await;

    if let Err(err) = extractor.close().await {
        warn!("browser did not shut down cleanly: {}", err);
    }
    let summary = runs::write_results(&results, &output_dir)?;
    info!(
        successful = summary.successful,
        failed = summary.failed,
        output = %output_dir.display(),
        "done"
    );

    match end {
        BatchEnd::Completed => Ok(()),
        BatchEnd::Cancelled { remaining } => {
            warn!(remaining, "stopped before finishing; rerun with --resume to continue");
            Ok(())
        }
        BatchEnd::Fatal(err) => Err(err).context("browser session failed"),
    }
}
