//! Advisory engine events.
//!
//! The engine reports decisions through an [`EventSink`] it does not
//! own. Sinks must never block the caller: a full buffer drops the
//! event and counts the drop.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Structured event emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// A variant was chosen for a task.
    VariantSelected {
        task_id: String,
        variant_id: String,
        feasible_count: usize,
        window_start_ms: i64,
        window_end_ms: i64,
    },
    /// No variant of a task can run in the requested window.
    VariantInfeasible {
        task_id: String,
        rejected: usize,
        window_start_ms: i64,
        window_end_ms: i64,
    },
    /// An insertion pushed a resource over its concurrency limit.
    AllocationConflictDetected {
        resource_id: String,
        record_id: String,
        affected_ids: Vec<String>,
        peak_concurrency: u32,
        limit: u32,
    },
}

impl EngineEvent {
    /// Stable event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineEvent::VariantSelected { .. } => "VariantSelected",
            EngineEvent::VariantInfeasible { .. } => "VariantInfeasible",
            EngineEvent::AllocationConflictDetected { .. } => "AllocationConflictDetected",
        }
    }
}

/// Receives engine events. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, event: EngineEvent) {
        debug!(event = event.as_str(), "NoOpEventSink: event skipped");
    }
}

/// Writes every event to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: EngineEvent) {
        match &event {
            EngineEvent::AllocationConflictDetected {
                resource_id,
                record_id,
                peak_concurrency,
                limit,
                ..
            } => warn!(
                resource_id = %resource_id,
                record_id = %record_id,
                peak_concurrency,
                limit,
                "allocation conflict detected"
            ),
            other => info!(event = other.as_str(), ?other, "engine event"),
        }
    }
}

/// Bounded non-blocking sink backed by a sync channel.
///
/// The consumer side is taken once with [`take_receiver`](Self::take_receiver),
/// or polled in place with [`drain`](Self::drain).
#[derive(Debug)]
pub struct BufferedEventSink {
    sender: SyncSender<EngineEvent>,
    receiver: Mutex<Option<Receiver<EngineEvent>>>,
    dropped: AtomicU64,
}

impl BufferedEventSink {
    /// Creates a sink buffering at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
            dropped: AtomicU64::new(0),
        }
    }

    /// Events dropped because the buffer was full or the consumer gone.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Hands the receiving end to an external consumer.
    pub fn take_receiver(&self) -> Option<Receiver<EngineEvent>> {
        self.receiver.lock().ok().and_then(|mut r| r.take())
    }

    /// Removes and returns buffered events. Empty once the receiver is taken.
    pub fn drain(&self) -> Vec<EngineEvent> {
        match self.receiver.lock() {
            Ok(guard) => guard
                .as_ref()
                .map(|r| r.try_iter().collect())
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }
}

impl EventSink for BufferedEventSink {
    fn emit(&self, event: EngineEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) | Err(TrySendError::Disconnected(event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(event = event.as_str(), dropped, "event buffer full, event dropped");
            }
        }
    }
}

/// Optional sink wrapper; emits nothing when unset.
#[derive(Clone, Default)]
pub struct OptionalEventSink {
    inner: Option<Arc<dyn EventSink>>,
}

impl OptionalEventSink {
    pub fn with_sink(sink: Arc<dyn EventSink>) -> Self {
        Self { inner: Some(sink) }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }

    pub fn emit(&self, event: EngineEvent) {
        match &self.inner {
            Some(sink) => sink.emit(event),
            None => debug!(event = event.as_str(), "no event sink configured"),
        }
    }
}

impl std::fmt::Debug for OptionalEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionalEventSink")
            .field("configured", &self.is_configured())
            .finish()
    }
}
