//! Structured trace events emitted by the consensus core, and the
//! handler-registry that dispatches them. Mirrors the teacher's
//! `tracing::tracers` module: a closed `TraceEvent` enum plus a `Tracer`
//! that fans each event out to every registered handler, rather than
//! formatting a string up front.

use std::fmt;
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// One observable event in the life of the consensus core. Kept as data
/// (not a pre-formatted string) so handlers can route on event kind —
/// the default handler (installed by [`crate::tracing::init`]) renders
/// these through the `tracing` crate's structured fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A vote batch was applied to the ledger.
    VoteApplied { delegate: u64, net_delta: i128 },
    /// A vote batch was rejected because it would exceed the concentration cap.
    CapRejected { delegate: u64 },
    /// A delegate registered.
    DelegateRegistered { id: u64, name: String },
    /// A delegate renewed its registration.
    DelegateRenewed { id: u64, expires_at: u64 },
    /// A delegate resigned.
    DelegateResigned { id: u64 },
    /// A delegate entry was garbage-collected.
    DelegateGarbageCollected { id: u64 },
    /// The ranking index was rebuilt.
    RankingRebuilt { eligible_count: usize },
    /// A scheduler identity woke up for its scheduled slot.
    SchedulerWakeup(u64, u64),
    /// A scheduler identity stopped (fell out of `top(100)`).
    SchedulerStopped(u64),
    /// A block was accepted.
    BlockAccepted { height: u64, producer: u64 },
    /// A block was rejected during validation.
    BlockRejected { height: u64, reason: String },
    /// A block arrived too late to be considered.
    SlotMissed { slot: u64 },
    /// A delegate's local score observation was updated.
    ScoreUpdated { delegate: u64, score: f64 },
    /// The process is starting up.
    Startup { version: &'static str },
    /// The process is shutting down.
    Shutdown,
    /// A configuration source was loaded.
    ConfigLoaded { source: &'static str },
    /// A snapshot was persisted at `height`.
    SnapshotWritten { height: u64 },
    /// State was restored from a snapshot at `height`.
    SnapshotLoaded { height: u64 },
}

impl TraceEvent {
    /// Short human-readable description, used by the default log handler.
    pub fn description(&self) -> String {
        match self {
            TraceEvent::VoteApplied { delegate, net_delta } => {
                format!("vote applied to delegate {delegate} (net delta {net_delta})")
            }
            TraceEvent::CapRejected { delegate } => {
                format!("vote batch rejected: delegate {delegate} would exceed concentration cap")
            }
            TraceEvent::DelegateRegistered { id, name } => format!("delegate {id} registered as '{name}'"),
            TraceEvent::DelegateRenewed { id, expires_at } => {
                format!("delegate {id} renewed, now expiring at height {expires_at}")
            }
            TraceEvent::DelegateResigned { id } => format!("delegate {id} resigned"),
            TraceEvent::DelegateGarbageCollected { id } => format!("delegate {id} garbage-collected"),
            TraceEvent::RankingRebuilt { eligible_count } => {
                format!("ranking index rebuilt, {eligible_count} eligible delegates")
            }
            TraceEvent::SchedulerWakeup(id, slot) => format!("delegate {id} woke for slot {slot}"),
            TraceEvent::SchedulerStopped(id) => format!("delegate {id} scheduler stopped"),
            TraceEvent::BlockAccepted { height, producer } => {
                format!("block {height} accepted, produced by delegate {producer}")
            }
            TraceEvent::BlockRejected { height, reason } => format!("block {height} rejected: {reason}"),
            TraceEvent::SlotMissed { slot } => format!("slot {slot} missed"),
            TraceEvent::ScoreUpdated { delegate, score } => {
                format!("delegate {delegate} score updated to {score:.4}")
            }
            TraceEvent::Startup { version } => format!("starting up (version {version})"),
            TraceEvent::Shutdown => "shutting down".to_string(),
            TraceEvent::ConfigLoaded { source } => format!("configuration loaded from {source}"),
            TraceEvent::SnapshotWritten { height } => format!("snapshot written at height {height}"),
            TraceEvent::SnapshotLoaded { height } => format!("snapshot loaded at height {height}"),
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("handler registry lock poisoned")]
    LockPoisoned,
}

type Handler = Box<dyn Fn(&TraceEvent) + Send + Sync>;

/// Dispatches [`TraceEvent`]s to every registered handler. Cloning a
/// `Tracer` shares the same handler list (it's an `Arc` underneath), so
/// every component in a coordinator can hold its own clone.
#[derive(Clone)]
pub struct Tracer {
    handlers: Arc<Mutex<Vec<Handler>>>,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn register_tracer<F>(&self, handler: F) -> Result<(), TracingError>
    where
        F: Fn(&TraceEvent) + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .map_err(|_| TracingError::LockPoisoned)?
            .push(Box::new(handler));
        Ok(())
    }

    pub fn clear_handlers(&self) -> Result<(), TracingError> {
        self.handlers.lock().map_err(|_| TracingError::LockPoisoned)?.clear();
        Ok(())
    }

    pub fn trace(&self, event: TraceEvent) {
        let Ok(handlers) = self.handlers.lock() else {
            return;
        };
        for handler in handlers.iter() {
            handler(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dispatches_to_every_registered_handler() {
        let tracer = Tracer::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let count = count.clone();
            tracer
                .register_tracer(move |_event| {
                    count.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        tracer.trace(TraceEvent::Shutdown);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn clear_handlers_stops_dispatch() {
        let tracer = Tracer::new();
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        tracer.register_tracer(move |_| { inner.fetch_add(1, Ordering::SeqCst); }).unwrap();
        tracer.clear_handlers().unwrap();
        tracer.trace(TraceEvent::Shutdown);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
