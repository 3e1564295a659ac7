//! Nameswipe Ingest - operator CLI for name dataset ingestion

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use futures::StreamExt;
use nameswipe_common::logging::{init_logging, LogConfig, LogLevel};
use nameswipe_ingest::{
    IngestConfig, IngestionEvent, IngestionOrchestrator, MemoryNameCatalog, NameCatalog,
    PgNameCatalog, RunStatus, SUPPORTED_SOURCES,
};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "nameswipe-ingest")]
#[command(author, version, about = "Nameswipe name dataset ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest one or more sources and wait for them to finish
    Run {
        /// Source code to ingest (repeatable)
        #[arg(short, long = "source", required = true)]
        sources: Vec<String>,

        /// PostgreSQL connection string
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,

        /// Write into an in-memory catalog instead of the database
        #[arg(long)]
        dry_run: bool,
    },

    /// List supported sources
    Sources,
}

/// How a requested source ended up
#[derive(Debug)]
enum RunOutcome {
    Completed { processed: u64, total_seen: u64 },
    Failed(String),
    Rejected(String),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("nameswipe-ingest".to_string())
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    match cli.command {
        Command::Sources => {
            for source in SUPPORTED_SOURCES {
                println!("{}  {}", source.code, source.display_name);
            }
            Ok(())
        },
        Command::Run {
            sources,
            database_url,
            dry_run,
        } => run(sources, database_url, dry_run).await,
    }
}

async fn run(sources: Vec<String>, database_url: Option<String>, dry_run: bool) -> Result<()> {
    let config = IngestConfig::from_env()?;

    let catalog: Arc<dyn NameCatalog> = if dry_run {
        info!("Dry run, writing to an in-memory catalog");
        Arc::new(MemoryNameCatalog::new())
    } else {
        let url = database_url.context("DATABASE_URL is required unless --dry-run is set")?;
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .context("Failed to connect to database")?;
        Arc::new(PgNameCatalog::new(pool))
    };

    let orchestrator = IngestionOrchestrator::new(config, catalog)?;

    // Subscribe before starting so no event is missed
    let mut events = Box::pin(orchestrator.subscribe_all());

    let mut outcomes: BTreeMap<String, RunOutcome> = BTreeMap::new();
    let mut pending = Vec::new();

    for requested in &sources {
        match orchestrator.start_ingestion(requested) {
            Ok(outcome) if outcome.started => pending.push(outcome.source),
            Ok(outcome) => {
                warn!(source = %outcome.source, "Ingestion already running");
                outcomes.insert(
                    outcome.source,
                    RunOutcome::Rejected("already running".to_string()),
                );
            },
            Err(e) => {
                error!(source = %requested, "Cannot start ingestion: {}", e);
                outcomes.insert(requested.clone(), RunOutcome::Rejected(e.to_string()));
            },
        }
    }

    // Outcomes are read from the registry; events only feed the log
    let progress_log = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if let IngestionEvent::Progress { snapshot } = event {
                info!(
                    source = %snapshot.source,
                    batch = snapshot.current_batch_index,
                    total_seen = snapshot.total_seen,
                    processed = snapshot.processed_count,
                    "Progress"
                );
            }
        }
    });

    let registry = orchestrator.registry();
    let finished = join_all(pending.iter().map(|source| async move {
        (source.clone(), registry.wait_until_finished(source).await)
    }))
    .await;
    progress_log.abort();

    for (source, state) in finished {
        let outcome = match state {
            Some(state) if state.status == RunStatus::Completed => RunOutcome::Completed {
                processed: state.progress.processed_count,
                total_seen: state.progress.total_seen,
            },
            Some(state) => RunOutcome::Failed(state.error.unwrap_or_else(|| state.status.to_string())),
            None => RunOutcome::Failed("run state expired before it was read".to_string()),
        };
        outcomes.insert(source, outcome);
    }

    println!();
    println!("{:<8} {:<10} DETAILS", "SOURCE", "RESULT");
    let mut unsuccessful = 0;
    for (source, outcome) in &outcomes {
        match outcome {
            RunOutcome::Completed {
                processed,
                total_seen,
            } => println!(
                "{:<8} {:<10} {} inserted of {} accepted",
                source, "completed", processed, total_seen
            ),
            RunOutcome::Failed(message) => {
                unsuccessful += 1;
                println!("{:<8} {:<10} {}", source, "failed", message);
            },
            RunOutcome::Rejected(message) => {
                unsuccessful += 1;
                println!("{:<8} {:<10} {}", source, "rejected", message);
            },
        }
    }

    if unsuccessful > 0 {
        bail!("{} of {} source(s) did not complete", unsuccessful, sources.len());
    }

    info!("Ingestion complete");
    Ok(())
}
