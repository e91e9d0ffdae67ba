//! Rendering sinks.
//!
//! A sink accepts computed snapshots and forwarded predictions for display.
//! Nothing it returns is consumed by the tracker.

use crate::channel::message::PredictionPayload;
use crate::core::snapshot::FeatureSnapshot;
use std::sync::{Arc, Mutex, MutexGuard};

/// Consumer of feature snapshots and classifier predictions.
pub trait RenderSink: Send {
    fn on_snapshot(&mut self, snapshot: &FeatureSnapshot);
    fn on_prediction(&mut self, prediction: &PredictionPayload);
}

/// Logs everything it receives.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl RenderSink for TracingSink {
    fn on_snapshot(&mut self, snapshot: &FeatureSnapshot) {
        tracing::info!(
            wpm = snapshot.typing_speed_wpm,
            backspace_ratio = snapshot.backspace_ratio,
            mouse_randomness = snapshot.mouse_randomness,
            click_frequency = snapshot.click_frequency,
            average_pressure = snapshot.average_pressure,
            total_distance = snapshot.total_distance,
            "Feature snapshot"
        );
    }

    fn on_prediction(&mut self, prediction: &PredictionPayload) {
        tracing::info!(
            level = %prediction.level,
            confidence = prediction.confidence,
            "Stress prediction"
        );
    }
}

#[derive(Debug, Default)]
struct MemorySinkState {
    latest_snapshot: Option<FeatureSnapshot>,
    latest_prediction: Option<PredictionPayload>,
    snapshots: u64,
    predictions: u64,
}

/// Keeps the most recent snapshot and prediction. Clones share state, so one
/// clone can be handed to a tracker while another is read elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemorySinkState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemorySinkState> {
        // A panic while holding the lock cannot leave the plain data invalid.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn latest_snapshot(&self) -> Option<FeatureSnapshot> {
        self.lock().latest_snapshot
    }

    pub fn latest_prediction(&self) -> Option<PredictionPayload> {
        self.lock().latest_prediction.clone()
    }

    pub fn snapshot_count(&self) -> u64 {
        self.lock().snapshots
    }

    pub fn prediction_count(&self) -> u64 {
        self.lock().predictions
    }
}

impl RenderSink for MemorySink {
    fn on_snapshot(&mut self, snapshot: &FeatureSnapshot) {
        let mut state = self.lock();
        state.latest_snapshot = Some(*snapshot);
        state.snapshots += 1;
    }

    fn on_prediction(&mut self, prediction: &PredictionPayload) {
        let mut state = self.lock();
        state.latest_prediction = Some(prediction.clone());
        state.predictions += 1;
    }
}
