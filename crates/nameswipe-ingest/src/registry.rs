//! Source run registry
//!
//! One entry per source with an active or recently finished run. Lifecycle of
//! an entry:
//!
//! ```text
//! absent -> streaming -> processing -> completed | failed -> (grace) -> absent
//! ```
//!
//! The registry lock is held only for the check-and-insert in
//! [`SourceRunRegistry::try_register`] and for snapshot reads. The running task
//! owns its state through a [`RunHandle`], which is the only writer; readers
//! see it through a [`watch`] receiver stored in the entry.
//!
//! When a run reaches a terminal status the handle schedules removal of the
//! entry after the grace period. The removal task only deletes the entry it
//! was scheduled for, and registering a new run for the same source aborts
//! any pending removal.
//!
//! [`SourceRunRegistry::wait_until_finished`] reads the same watch channel, so
//! a waiter sees the terminal state even when it missed progress events.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::progress::{IngestionEvent, ProgressChannel, ProgressSnapshot};

/// Error recorded for a run whose handle was dropped before it finished
pub const ABANDONED_RUN_ERROR: &str = "ingestion run ended unexpectedly";

/// Lifecycle status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Accepted, nothing persisted yet
    Streaming,
    /// At least one batch written
    Processing,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Streaming => "streaming",
            RunStatus::Processing => "processing",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-memory state of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRunState {
    pub progress: ProgressSnapshot,
    /// Candidates rejected by validation
    pub filtered_count: u64,
    pub status: RunStatus,
    /// Set only when `status` is `failed`
    pub error: Option<String>,
}

impl SourceRunState {
    fn new(source: &str) -> Self {
        Self {
            progress: ProgressSnapshot::new(source),
            filtered_count: 0,
            status: RunStatus::Streaming,
            error: None,
        }
    }
}

struct RunSlot {
    run_id: u64,
    state: watch::Receiver<SourceRunState>,
    cleanup: Option<AbortHandle>,
}

struct RegistryInner {
    runs: Mutex<HashMap<String, RunSlot>>,
    next_run_id: AtomicU64,
    grace: Duration,
}

impl RegistryInner {
    fn runs(&self) -> MutexGuard<'_, HashMap<String, RunSlot>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove `source` only if it still belongs to `run_id`
    fn remove_run(&self, source: &str, run_id: u64) -> bool {
        let mut runs = self.runs();
        if runs.get(source).is_some_and(|slot| slot.run_id == run_id) {
            runs.remove(source);
            true
        } else {
            false
        }
    }

    /// Arrange for the finished run's entry to disappear after the grace period
    fn schedule_cleanup(self: &Arc<Self>, source: &str, run_id: u64) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.remove_run(source, run_id);
            return;
        };

        let mut runs = self.runs();
        let Some(slot) = runs.get_mut(source).filter(|slot| slot.run_id == run_id) else {
            return;
        };

        let inner = Arc::clone(self);
        let key = source.to_string();
        let grace = self.grace;
        let task = runtime.spawn(async move {
            tokio::time::sleep(grace).await;
            if inner.remove_run(&key, run_id) {
                debug!(source = %key, run_id, "Removed finished run from registry");
            }
        });

        if let Some(previous) = slot.cleanup.replace(task.abort_handle()) {
            previous.abort();
        }
    }
}

/// Registry of per-source runs; cheap to clone, all clones share state
#[derive(Clone)]
pub struct SourceRunRegistry {
    inner: Arc<RegistryInner>,
}

impl SourceRunRegistry {
    /// `grace` is how long a finished run stays visible
    pub fn new(grace: Duration) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                runs: Mutex::new(HashMap::new()),
                next_run_id: AtomicU64::new(1),
                grace,
            }),
        }
    }

    pub fn grace(&self) -> Duration {
        self.inner.grace
    }

    /// Register a new run for `source`.
    ///
    /// Returns `None` if a run for the source is still streaming or
    /// processing. A terminal entry still inside its grace window is replaced,
    /// and its pending removal is cancelled.
    pub fn try_register(&self, source: &str) -> Option<RunHandle> {
        let mut runs = self.inner.runs();

        if let Some(slot) = runs.get(source) {
            if !slot.state.borrow().status.is_terminal() {
                return None;
            }
        }

        let run_id = self.inner.next_run_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = watch::channel(SourceRunState::new(source));
        let previous = runs.insert(
            source.to_string(),
            RunSlot {
                run_id,
                state: receiver,
                cleanup: None,
            },
        );

        if let Some(cleanup) = previous.and_then(|slot| slot.cleanup) {
            cleanup.abort();
        }

        Some(RunHandle {
            source: source.to_string(),
            run_id,
            sender: Some(sender),
            registry: Arc::clone(&self.inner),
            progress: None,
        })
    }

    /// Current state of the source's run, if the registry holds one
    pub fn get(&self, source: &str) -> Option<SourceRunState> {
        self.inner
            .runs()
            .get(source)
            .map(|slot| slot.state.borrow().clone())
    }

    /// Wait for the source's current run to reach a terminal status.
    ///
    /// Returns `None` if the registry holds no entry for the source.
    pub async fn wait_until_finished(&self, source: &str) -> Option<SourceRunState> {
        let mut receiver = self.inner.runs().get(source).map(|slot| slot.state.clone())?;

        let finished = receiver
            .wait_for(|state| state.status.is_terminal())
            .await
            .map(|state| SourceRunState::clone(&state));
        Some(finished.unwrap_or_else(|_| receiver.borrow().clone()))
    }

    /// True while the registry holds an entry for the source
    pub fn is_active(&self, source: &str) -> bool {
        self.inner.runs().contains_key(source)
    }

    /// Every entry currently held, in no particular order
    pub fn snapshot(&self) -> Vec<SourceRunState> {
        self.inner
            .runs()
            .values()
            .map(|slot| slot.state.borrow().clone())
            .collect()
    }
}

/// Exclusive write access to one run's state.
///
/// Consumed by [`complete`](Self::complete) or [`fail`](Self::fail), so a run
/// reaches a terminal status exactly once. Dropping an unfinished handle marks
/// the run failed, and publishes a `failed` event if a progress channel is
/// attached.
pub struct RunHandle {
    source: String,
    run_id: u64,
    sender: Option<watch::Sender<SourceRunState>>,
    registry: Arc<RegistryInner>,
    progress: Option<ProgressChannel>,
}

impl RunHandle {
    /// Channel to report on if the handle is dropped unfinished
    pub fn with_progress(mut self, channel: ProgressChannel) -> Self {
        self.progress = Some(channel);
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn state(&self) -> SourceRunState {
        match &self.sender {
            Some(sender) => sender.borrow().clone(),
            None => SourceRunState::new(&self.source),
        }
    }

    fn modify(&self, f: impl FnOnce(&mut SourceRunState)) {
        if let Some(sender) = &self.sender {
            sender.send_modify(f);
        }
    }

    /// An accepted candidate was handed to the batch writer
    pub fn record_accepted(&self) {
        self.modify(|state| state.progress.total_seen += 1);
    }

    /// A candidate was rejected by validation
    pub fn record_filtered(&self) {
        self.modify(|state| state.filtered_count += 1);
    }

    /// A batch was written; returns the updated counters
    pub fn record_flush(&self, inserted: u64) -> ProgressSnapshot {
        self.modify(|state| {
            state.progress.processed_count += inserted;
            state.progress.total_batches_so_far += 1;
            state.progress.current_batch_index = state.progress.total_batches_so_far;
            state.status = RunStatus::Processing;
        });
        self.state().progress
    }

    pub fn complete(mut self) -> SourceRunState {
        self.finish(RunStatus::Completed, None)
    }

    pub fn fail(mut self, error: impl Into<String>) -> SourceRunState {
        self.finish(RunStatus::Failed, Some(error.into()))
    }

    fn finish(&mut self, status: RunStatus, error: Option<String>) -> SourceRunState {
        let Some(sender) = self.sender.take() else {
            return SourceRunState::new(&self.source);
        };

        sender.send_modify(|state| {
            state.status = status;
            state.error = error;
        });
        let final_state = sender.borrow().clone();

        self.registry.schedule_cleanup(&self.source, self.run_id);
        final_state
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if self.sender.is_some() {
            warn!(source = %self.source, run_id = self.run_id, "Run ended without a terminal status");
            let state = self.finish(RunStatus::Failed, Some(ABANDONED_RUN_ERROR.to_string()));
            if let Some(progress) = &self.progress {
                progress.publish(IngestionEvent::Failed {
                    snapshot: state.progress,
                    error: ABANDONED_RUN_ERROR.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use futures::StreamExt;

    const GRACE: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_second_register_rejected_while_running() {
        let registry = SourceRunRegistry::new(GRACE);

        let us = registry.try_register("US").unwrap();
        assert!(registry.try_register("US").is_none());

        // Other sources are independent
        let fr = registry.try_register("FR").unwrap();
        assert_ne!(us.run_id(), fr.run_id());
        assert_eq!(registry.snapshot().len(), 2);

        us.complete();
        fr.complete();
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let registry = SourceRunRegistry::new(GRACE);
        let handle = registry.try_register("DE").unwrap();
        assert_eq!(registry.get("DE").unwrap().status, RunStatus::Streaming);

        handle.record_accepted();
        handle.record_accepted();
        handle.record_filtered();
        let snapshot = handle.record_flush(1);
        assert_eq!(snapshot.total_seen, 2);
        assert_eq!(snapshot.processed_count, 1);
        assert_eq!(snapshot.current_batch_index, 1);

        let state = registry.get("DE").unwrap();
        assert_eq!(state.status, RunStatus::Processing);
        assert_eq!(state.filtered_count, 1);

        let final_state = handle.fail("connection reset");
        assert_eq!(final_state.status, RunStatus::Failed);
        assert_eq!(registry.get("DE").unwrap().error.as_deref(), Some("connection reset"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_entry_removed_after_grace() {
        let registry = SourceRunRegistry::new(GRACE);
        registry.try_register("IT").unwrap().complete();

        tokio::time::sleep(GRACE - Duration::from_millis(100)).await;
        assert!(registry.is_active("IT"));
        assert_eq!(registry.get("IT").unwrap().status, RunStatus::Completed);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!registry.is_active("IT"));
        assert!(registry.get("IT").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_run_cancels_stale_cleanup() {
        let registry = SourceRunRegistry::new(GRACE);
        registry.try_register("ES").unwrap().fail("boom");

        tokio::time::sleep(Duration::from_secs(1)).await;
        let second = registry.try_register("ES").unwrap();

        // Past the first run's removal deadline
        tokio::time::sleep(GRACE * 2).await;
        let state = registry.get("ES").unwrap();
        assert_eq!(state.status, RunStatus::Streaming);
        assert!(state.error.is_none());

        second.complete();
    }

    #[tokio::test]
    async fn test_dropped_handle_marks_run_failed() {
        let registry = SourceRunRegistry::new(GRACE);
        drop(registry.try_register("IE").unwrap());

        let state = registry.get("IE").unwrap();
        assert_eq!(state.status, RunStatus::Failed);
        assert!(state.error.is_some());
        assert!(registry.try_register("IE").is_some());
    }

    #[tokio::test]
    async fn test_panicked_run_reports_failure() {
        let registry = SourceRunRegistry::new(GRACE);
        let channel = ProgressChannel::new(8);
        let mut events = Box::pin(channel.subscribe("US"));

        let handle = registry.try_register("US").unwrap().with_progress(channel.clone());
        let task = tokio::spawn(async move {
            handle.record_accepted();
            panic!("parser bug");
        });
        assert!(task.await.unwrap_err().is_panic());

        let state = registry.wait_until_finished("US").await.unwrap();
        assert_eq!(state.status, RunStatus::Failed);
        assert_eq!(state.error.as_deref(), Some(ABANDONED_RUN_ERROR));

        let IngestionEvent::Failed { snapshot, error } = events.next().await.unwrap() else {
            panic!("expected a failed event");
        };
        assert_eq!(error, ABANDONED_RUN_ERROR);
        assert_eq!(snapshot.total_seen, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_finished() {
        let registry = SourceRunRegistry::new(GRACE);
        assert!(registry.wait_until_finished("FR").await.is_none());

        let handle = registry.try_register("FR").unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            handle.record_flush(3);
            handle.complete();
        });

        let state = registry.wait_until_finished("FR").await.unwrap();
        assert_eq!(state.status, RunStatus::Completed);
        assert_eq!(state.progress.processed_count, 3);

        // Still answers inside the grace window
        let again = registry.wait_until_finished("FR").await.unwrap();
        assert_eq!(again, state);
    }

    #[test]
    fn test_finish_outside_runtime_removes_immediately() {
        let registry = SourceRunRegistry::new(GRACE);
        registry.try_register("GB").unwrap().complete();
        assert!(!registry.is_active("GB"));
    }
}
