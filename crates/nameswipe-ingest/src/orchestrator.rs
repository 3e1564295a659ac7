//! Ingestion orchestrator
//!
//! Entry point for callers. [`IngestionOrchestrator::start_ingestion`] checks
//! the source, registers a run and spawns the run loop as a background task:
//!
//! ```text
//! HTTP body -> LineReassembler -> CandidateRecord -> NameValidator -> BatchWriter -> catalog
//! ```
//!
//! Counters flow into the run's [`RunHandle`] as records are classified, and a
//! progress event is published after every batch flush and on the terminal
//! transition. A run failure never reaches the caller of `start_ingestion`;
//! it is visible through [`get_ingestion_status`](IngestionOrchestrator::get_ingestion_status)
//! and the `failed` event.

use std::collections::BTreeMap;
use std::pin::pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, Instrument};

use crate::batch::{BatchWriter, FlushOutcome};
use crate::catalog::NameCatalog;
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::fetch;
use crate::progress::{IngestionEvent, ProgressChannel, ProgressSnapshot};
use crate::registry::{RunHandle, RunStatus, SourceRunRegistry};
use crate::sources::{find_source, SUPPORTED_SOURCES};
use crate::validator::{CandidateRecord, NameValidator, RejectReason, Verdict};

/// Reply to a start request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
    /// Normalised source code
    pub source: String,
    /// False if a run for the source was already in progress
    pub started: bool,
}

/// Status report entry for one supported source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub source: String,
    pub display_name: String,
    /// Live catalog row count for the source's country
    pub loaded_count: i64,
    /// True while the registry holds an entry, including the grace window
    pub is_active: bool,
    pub status: Option<RunStatus>,
    pub progress: Option<ProgressSnapshot>,
    pub error: Option<String>,
}

/// Rejection counts by reason for one run
type ReasonTally = BTreeMap<RejectReason, u64>;

struct OrchestratorInner {
    config: IngestConfig,
    catalog: Arc<dyn NameCatalog>,
    registry: SourceRunRegistry,
    progress: ProgressChannel,
    validator: NameValidator,
    client: reqwest::Client,
}

/// Runs and tracks ingestion of supported sources; clones share all state
#[derive(Clone)]
pub struct IngestionOrchestrator {
    inner: Arc<OrchestratorInner>,
}

impl IngestionOrchestrator {
    pub fn new(config: IngestConfig, catalog: Arc<dyn NameCatalog>) -> Result<Self> {
        config.validate()?;

        let validator = config.country_blacklists.iter().fold(
            NameValidator::new()
                .map_err(|e| IngestError::Config(format!("Invalid name pattern: {}", e)))?,
            |validator, (country, names)| validator.with_country_blacklist(country, names),
        );
        let client = fetch::build_client(&config)?;

        Ok(Self {
            inner: Arc::new(OrchestratorInner {
                registry: SourceRunRegistry::new(config.cleanup_grace),
                progress: ProgressChannel::new(config.event_capacity),
                config,
                catalog,
                validator,
                client,
            }),
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &SourceRunRegistry {
        &self.inner.registry
    }

    pub fn progress(&self) -> &ProgressChannel {
        &self.inner.progress
    }

    /// Progress events for one source, from now on
    pub fn subscribe(&self, source: &str) -> impl Stream<Item = IngestionEvent> + Send + 'static {
        self.inner.progress.subscribe(source)
    }

    /// Progress events for all sources, from now on
    pub fn subscribe_all(&self) -> impl Stream<Item = IngestionEvent> + Send + 'static {
        self.inner.progress.subscribe_all()
    }

    /// Start ingesting `source` in the background.
    ///
    /// Returns as soon as the run is registered. An unknown source code is the
    /// only error; a run already in progress yields `started: false`.
    pub fn start_ingestion(&self, source: &str) -> Result<StartOutcome> {
        let supported =
            find_source(source).ok_or_else(|| IngestError::UnknownSource(source.trim().to_string()))?;
        let code = supported.code;

        let Some(handle) = self.inner.registry.try_register(code) else {
            info!(source = code, "Ingestion already in progress, start rejected");
            return Ok(StartOutcome {
                source: code.to_string(),
                started: false,
            });
        };

        let handle = handle.with_progress(self.inner.progress.clone());
        info!(source = code, run_id = handle.run_id(), "Ingestion started");

        let span = info_span!("ingestion", source = code, run_id = handle.run_id());
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run(handle).await }.instrument(span));

        Ok(StartOutcome {
            source: code.to_string(),
            started: true,
        })
    }

    /// Fresh status of every supported source
    pub async fn get_ingestion_status(&self) -> Result<Vec<SourceStatus>> {
        let mut statuses = Vec::with_capacity(SUPPORTED_SOURCES.len());

        for source in SUPPORTED_SOURCES {
            let loaded_count = self.inner.catalog.count_by_origin_country(source.code).await?;
            let run = self.inner.registry.get(source.code);

            statuses.push(SourceStatus {
                source: source.code.to_string(),
                display_name: source.display_name.to_string(),
                loaded_count,
                is_active: run.is_some(),
                status: run.as_ref().map(|r| r.status),
                progress: run.as_ref().map(|r| r.progress.clone()),
                error: run.and_then(|r| r.error),
            });
        }

        Ok(statuses)
    }
}

impl OrchestratorInner {
    async fn run(&self, handle: RunHandle) {
        let mut tally = ReasonTally::new();

        match self.stream_source(&handle, &mut tally).await {
            Ok(()) => {
                let state = handle.complete();
                info!(
                    total_seen = state.progress.total_seen,
                    processed = state.progress.processed_count,
                    filtered = state.filtered_count,
                    batches = state.progress.total_batches_so_far,
                    reasons = %format_tally(&tally),
                    "Ingestion completed"
                );
                self.progress.publish(IngestionEvent::Completed {
                    snapshot: state.progress,
                });
            },
            Err(e) => {
                let message = e.to_string();
                let state = handle.fail(message.clone());
                error!(
                    error = ?e,
                    total_seen = state.progress.total_seen,
                    processed = state.progress.processed_count,
                    filtered = state.filtered_count,
                    "Ingestion failed: {}",
                    message
                );
                self.progress.publish(IngestionEvent::Failed {
                    snapshot: state.progress,
                    error: message,
                });
            },
        }
    }

    async fn stream_source(&self, handle: &RunHandle, tally: &mut ReasonTally) -> Result<()> {
        let source = handle.source();
        let idle_timeout = self.config.idle_timeout;
        let url = self.config.url_for(source);

        let lines = fetch::open_lines(&self.client, &url, idle_timeout).await?;
        let mut lines = pin!(lines);
        let mut writer = BatchWriter::new(self.catalog.as_ref(), source, self.config.batch_size);

        loop {
            let line = match tokio::time::timeout(idle_timeout, lines.next()).await {
                Err(_) => return Err(IngestError::IdleTimeout(idle_timeout)),
                Ok(None) => break,
                Ok(Some(line)) => line?,
            };

            let Some(candidate) = CandidateRecord::parse_line(&line, source) else {
                continue;
            };

            match self.validator.validate(&candidate) {
                Verdict::Accepted(name) => {
                    handle.record_accepted();
                    if let Some(outcome) = writer.offer(name).await? {
                        self.after_flush(handle, outcome, tally);
                    }
                },
                Verdict::Rejected(reason) => {
                    handle.record_filtered();
                    *tally.entry(reason).or_insert(0) += 1;
                },
            }
        }

        if let Some(outcome) = writer.finish().await? {
            self.after_flush(handle, outcome, tally);
        }

        Ok(())
    }

    fn after_flush(&self, handle: &RunHandle, outcome: FlushOutcome, tally: &ReasonTally) {
        let before = handle.state().progress.processed_count;
        let snapshot = handle.record_flush(outcome.inserted);

        let every = self.config.progress_log_every;
        if snapshot.total_batches_so_far == 1 || snapshot.processed_count / every > before / every {
            let filtered: u64 = tally.values().sum();
            info!(
                batch = snapshot.current_batch_index,
                total_seen = snapshot.total_seen,
                processed = snapshot.processed_count,
                filtered = filtered,
                reasons = %format_tally(tally),
                "Ingestion progress"
            );
        }

        self.progress.publish(IngestionEvent::Progress { snapshot });
    }
}

/// `too_short=3 invalid_characters=1`, in reason order
fn format_tally(tally: &ReasonTally) -> String {
    if tally.is_empty() {
        return "none".to_string();
    }
    tally
        .iter()
        .map(|(reason, count)| format!("{}={}", reason, count))
        .collect::<Vec<_>>()
        .join(" ")
}
