//! Transparency statistics.
//!
//! Counts what the tracker did with the input it was given, so a host can
//! show the user exactly how much was recorded and forwarded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current process.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Keyboard events recorded into the session
    keyboard_events: AtomicU64,
    /// Pointer events recorded into the session
    pointer_events: AtomicU64,
    /// Events dropped (inactive, disabled source, out of order)
    ignored_events: AtomicU64,
    /// Events handed to the classifier channel
    forwarded_events: AtomicU64,
    /// Sends that failed or were skipped for lack of a channel
    forward_failures: AtomicU64,
    /// Snapshots handed to the sink
    snapshots_published: AtomicU64,
    /// Valid predictions received
    predictions_received: AtomicU64,
    started_at: DateTime<Utc>,
}

impl TransparencyLog {
    pub fn new() -> Self {
        Self {
            keyboard_events: AtomicU64::new(0),
            pointer_events: AtomicU64::new(0),
            ignored_events: AtomicU64::new(0),
            forwarded_events: AtomicU64::new(0),
            forward_failures: AtomicU64::new(0),
            snapshots_published: AtomicU64::new(0),
            predictions_received: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn record_keyboard_event(&self) {
        self.keyboard_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pointer_event(&self) {
        self.pointer_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored_event(&self) {
        self.ignored_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forwarded_event(&self) {
        self.forwarded_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forward_failure(&self) {
        self.forward_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_published(&self) {
        self.snapshots_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_prediction(&self) {
        self.predictions_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            keyboard_events: self.keyboard_events.load(Ordering::Relaxed),
            pointer_events: self.pointer_events.load(Ordering::Relaxed),
            ignored_events: self.ignored_events.load(Ordering::Relaxed),
            forwarded_events: self.forwarded_events.load(Ordering::Relaxed),
            forward_failures: self.forward_failures.load(Ordering::Relaxed),
            snapshots_published: self.snapshots_published.load(Ordering::Relaxed),
            predictions_received: self.predictions_received.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Tracking Statistics:\n\
             - Keyboard events recorded: {}\n\
             - Pointer events recorded: {}\n\
             - Events ignored: {}\n\
             - Events forwarded to classifier: {}\n\
             - Forwarding failures: {}\n\
             - Snapshots published: {}\n\
             - Predictions received: {}\n\
             - Uptime: {} seconds",
            stats.keyboard_events,
            stats.pointer_events,
            stats.ignored_events,
            stats.forwarded_events,
            stats.forward_failures,
            stats.snapshots_published,
            stats.predictions_received,
            stats.uptime_secs
        )
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.keyboard_events.store(0, Ordering::Relaxed);
        self.pointer_events.store(0, Ordering::Relaxed);
        self.ignored_events.store(0, Ordering::Relaxed);
        self.forwarded_events.store(0, Ordering::Relaxed);
        self.forward_failures.store(0, Ordering::Relaxed);
        self.snapshots_published.store(0, Ordering::Relaxed);
        self.predictions_received.store(0, Ordering::Relaxed);
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub keyboard_events: u64,
    pub pointer_events: u64,
    pub ignored_events: u64,
    pub forwarded_events: u64,
    pub forward_failures: u64,
    pub snapshots_published: u64,
    pub predictions_received: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

/// Create a new shared transparency log.
pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}
