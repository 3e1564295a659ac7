//! Progress events and their broadcast channel
//!
//! Publishing never blocks: events go into a bounded [`broadcast`] buffer and a
//! subscriber that falls behind silently loses the oldest ones. Subscriptions
//! start from "now"; there is no replay.

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::trace;

/// Counters of one run at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub source: String,
    /// Accepted candidates seen so far
    pub total_seen: u64,
    /// Rows actually inserted, duplicates excluded
    pub processed_count: u64,
    /// 1-based number of the batch most recently flushed, 0 before the first
    pub current_batch_index: u64,
    pub total_batches_so_far: u64,
}

impl ProgressSnapshot {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }
}

/// Event published after every batch flush and on the terminal transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestionEvent {
    Progress {
        #[serde(flatten)]
        snapshot: ProgressSnapshot,
    },
    Completed {
        #[serde(flatten)]
        snapshot: ProgressSnapshot,
    },
    Failed {
        #[serde(flatten)]
        snapshot: ProgressSnapshot,
        error: String,
    },
}

impl IngestionEvent {
    /// Topic the event belongs to
    pub fn source(&self) -> &str {
        &self.snapshot().source
    }

    pub fn snapshot(&self) -> &ProgressSnapshot {
        match self {
            IngestionEvent::Progress { snapshot }
            | IngestionEvent::Completed { snapshot }
            | IngestionEvent::Failed { snapshot, .. } => snapshot,
        }
    }

    /// Wire name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            IngestionEvent::Progress { .. } => "progress",
            IngestionEvent::Completed { .. } => "completed",
            IngestionEvent::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, IngestionEvent::Progress { .. })
    }
}

/// Fire-and-forget fan-out of [`IngestionEvent`]s, one topic per source
#[derive(Debug, Clone)]
pub struct ProgressChannel {
    sender: broadcast::Sender<IngestionEvent>,
}

impl ProgressChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event; having no subscribers is not an error
    pub fn publish(&self, event: IngestionEvent) {
        if self.sender.send(event).is_err() {
            trace!("No progress subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Events for every source, starting from now
    pub fn subscribe_all(&self) -> impl Stream<Item = IngestionEvent> + Send + 'static {
        BroadcastStream::new(self.sender.subscribe()).filter_map(|item| async move {
            match item {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    trace!(skipped, "Progress subscriber lagged");
                    None
                },
            }
        })
    }

    /// Events for one source, starting from now
    pub fn subscribe(&self, topic: &str) -> impl Stream<Item = IngestionEvent> + Send + 'static {
        let topic = topic.to_string();
        self.subscribe_all().filter(move |event: &IngestionEvent| {
            let matches = event.source() == topic;
            async move { matches }
        })
    }
}
