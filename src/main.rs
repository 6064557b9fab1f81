use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use codebase_index::paths::PlatformPaths;
use codebase_index::{ChunkRun, CodebaseIndexer, Config, IngestReport, chunk_repository};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

/// Chunk a repository and keep a vector index in sync with it
#[derive(Parser, Debug)]
#[command(name = "codebase-index", version, long_version = LONG_VERSION, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level: error, warn, info, debug or trace
    #[arg(long, global = true, default_value = "info", env = "CODEBASE_INDEX_LOG")]
    log_level: LevelFilter,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chunk the repository and synchronize the index
    Ingest {
        #[command(flatten)]
        run: RunArgs,

        /// Drop every stored entry and re-embed the whole chunk set
        #[arg(long)]
        rebuild: bool,
    },
    /// Chunk the repository and report counts without touching the index
    Chunk {
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Configuration file (defaults to the platform config location)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Repository root to ingest
    #[arg(long, short)]
    root: Option<PathBuf>,

    /// Number of chunking workers
    #[arg(long, short)]
    workers: Option<usize>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

impl RunArgs {
    /// Config file, then environment, then these flags
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(root) = &self.root {
            config.repository.root = root.clone();
        }
        if let Some(workers) = self.workers {
            config.chunking.workers = workers;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_logging(level: LevelFilter, log_file: Option<&PathBuf>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(level)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

/// Cancel the run on Ctrl-C
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling run");
            token.cancel();
        }
    });
    cancel
}

fn print_ingest(report: &IngestReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Collection:   {}", report.collection);
    println!("Root:         {}", report.root);
    println!(
        "Files:        {} seen, {} empty, {} failed, {} over size limit",
        report.files_seen,
        report.files_skipped_empty,
        report.files_failed,
        report.files_skipped_oversized
    );
    println!(
        "Chunks:       {} ({} duplicates dropped)",
        report.chunks, report.duplicates_dropped
    );
    println!(
        "Index:        {} added, {} deleted, {} unchanged in {} batches",
        report.sync.added, report.sync.deleted, report.sync.unchanged, report.sync.batches
    );
    println!("Duration:     {} ms", report.duration_ms);
    Ok(())
}

fn print_chunks(run: &ChunkRun, json: bool) -> Result<()> {
    let mut per_file: BTreeMap<&str, usize> = BTreeMap::new();
    let mut per_language: BTreeMap<&str, usize> = BTreeMap::new();
    for chunk in &run.chunks {
        *per_file.entry(&chunk.metadata.relative_path).or_default() += 1;
        *per_language.entry(&chunk.metadata.language).or_default() += 1;
    }

    if json {
        let value = serde_json::json!({
            "files_seen": run.files_seen,
            "files_skipped_empty": run.files_skipped_empty,
            "files_failed": run.files_failed,
            "files_skipped_oversized": run.files_skipped_oversized,
            "chunks": run.chunks.len(),
            "duplicates_dropped": run.duplicates_dropped,
            "per_file": per_file,
            "per_language": per_language,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for (path, count) in &per_file {
        println!("{:>6}  {}", count, path);
    }
    println!();
    for (language, count) in &per_language {
        println!("{:>6}  {}", count, language);
    }
    println!(
        "\n{} chunks from {} files ({} duplicates dropped, {} empty, {} failed, {} over size limit)",
        run.chunks.len(),
        run.files_seen,
        run.duplicates_dropped,
        run.files_skipped_empty,
        run.files_failed,
        run.files_skipped_oversized
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_file.as_ref())?;

    tracing::debug!(
        "Default LanceDB path: {}",
        PlatformPaths::default_lancedb_path().display()
    );

    match cli.command {
        Command::Ingest { run, rebuild } => {
            let mut config = run.load_config()?;
            config.index.rebuild |= rebuild;

            let indexer = CodebaseIndexer::open(config).await?;
            let report = indexer.ingest(cancel_on_interrupt()).await?;
            print_ingest(&report, run.json)?;
        }
        Command::Chunk { run } => {
            let config = run.load_config()?;
            let cancel = cancel_on_interrupt();
            let chunks =
                tokio::task::spawn_blocking(move || chunk_repository(&config, &cancel)).await??;
            print_chunks(&chunks, run.json)?;
        }
    }

    Ok(())
}
