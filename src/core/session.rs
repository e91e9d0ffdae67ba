//! Tracking session lifecycle.
//!
//! A [`TrackingSession`] owns the keyboard and pointer extractors (and with
//! them both event buffers and every running counter). It is the single
//! source of truth for whether tracking is active.
//!
//! ```text
//!          start()            pause()
//!   Idle ──────────▶ Active ──────────▶ Paused
//!    ▲                 ▲                  │
//!    │                 └──── start() ─────┘
//!    └──────── reset() (from any state)
//! ```

use crate::collector::types::{InputEvent, KeyEvent, Modality};
use crate::config::{BufferLimits, SourceConfig};
use crate::core::feedback::StressLevelSource;
use crate::core::keyboard::KeyboardSignalExtractor;
use crate::core::pointer::{PointerSignalExtractor, PressureSimulator};
use crate::core::snapshot::FeatureSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Active,
    Paused,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Active => "active",
            SessionState::Paused => "paused",
        };
        write!(f, "{name}")
    }
}

/// Why an event was not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Session is not Active
    Inactive,
    /// The event's modality is switched off
    SourceDisabled,
    /// Timestamp earlier than the newest buffered event of that modality
    OutOfOrder,
}

/// An event as it was stored, with values derived while recording it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Stored event (clicks carry their simulated pressure)
    pub event: InputEvent,
    /// Pixels per millisecond since the previous move (moves only)
    pub movement_speed: Option<f64>,
}

/// Result of [`TrackingSession::record_event`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Recorded(RecordedEvent),
    Ignored(IgnoreReason),
}

impl RecordOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, RecordOutcome::Recorded(_))
    }
}

/// Options for building a [`TrackingSession`].
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub buffers: BufferLimits,
    pub sources: SourceConfig,
    /// Fill missing click pressure from the stress feedback
    pub simulate_pressure: bool,
    /// Fixed RNG seed for pressure simulation
    pub pressure_seed: Option<u64>,
}

/// Owns both extractors and governs the start/pause/reset lifecycle.
#[derive(Debug)]
pub struct TrackingSession {
    state: SessionState,
    session_id: Uuid,
    sources: SourceConfig,
    keyboard: KeyboardSignalExtractor,
    pointer: PointerSignalExtractor,
}

impl TrackingSession {
    /// Create an idle session.
    ///
    /// `stress` supplies the classifier's last stress index for pressure
    /// simulation; it is read, never written, by the session.
    pub fn new(options: SessionOptions, stress: Arc<dyn StressLevelSource>) -> Self {
        let pressure = options.simulate_pressure.then(|| match options.pressure_seed {
            Some(seed) => PressureSimulator::with_seed(stress, seed),
            None => PressureSimulator::new(stress),
        });

        Self {
            state: SessionState::Idle,
            session_id: Uuid::new_v4(),
            sources: options.sources,
            keyboard: KeyboardSignalExtractor::new(options.buffers.keyboard_max_events),
            pointer: PointerSignalExtractor::new(options.buffers.pointer_max_events, pressure),
        }
    }

    /// Start or resume tracking.
    ///
    /// Starting from Idle clears everything and begins a new session id;
    /// resuming from Paused keeps the accumulated data.
    pub fn start(&mut self) {
        match self.state {
            SessionState::Active => {}
            SessionState::Idle => {
                self.clear_data();
                self.session_id = Uuid::new_v4();
                self.state = SessionState::Active;
                tracing::debug!(session_id = %self.session_id, "Tracking started");
            }
            SessionState::Paused => {
                self.state = SessionState::Active;
                tracing::debug!(session_id = %self.session_id, "Tracking resumed");
            }
        }
    }

    /// Pause tracking, keeping buffers and counters.
    pub fn pause(&mut self) {
        if self.state == SessionState::Active {
            self.state = SessionState::Paused;
            tracing::debug!(session_id = %self.session_id, "Tracking paused");
        }
    }

    /// Return to Idle, dropping all buffered events and counters.
    pub fn reset(&mut self) {
        self.clear_data();
        self.state = SessionState::Idle;
        tracing::debug!(session_id = %self.session_id, "Tracking reset");
    }

    fn clear_data(&mut self) {
        self.keyboard.clear();
        self.pointer.clear();
    }

    /// Record one input event. No-op unless Active.
    pub fn record_event(&mut self, event: InputEvent) -> RecordOutcome {
        if self.state != SessionState::Active {
            return RecordOutcome::Ignored(IgnoreReason::Inactive);
        }

        let modality = event.modality();
        let enabled = match modality {
            Modality::Keyboard => self.sources.keyboard,
            Modality::Pointer => self.sources.mouse,
        };
        if !enabled {
            return RecordOutcome::Ignored(IgnoreReason::SourceDisabled);
        }

        let latest = match modality {
            Modality::Keyboard => self.keyboard.buffer().latest_timestamp_ms(),
            Modality::Pointer => self.pointer.buffer().latest_timestamp_ms(),
        };
        if let Some(latest) = latest {
            if event.timestamp_ms() < latest {
                tracing::warn!(
                    ?modality,
                    timestamp_ms = event.timestamp_ms(),
                    latest_ms = latest,
                    "Dropping out-of-order event"
                );
                return RecordOutcome::Ignored(IgnoreReason::OutOfOrder);
            }
        }

        let recorded = match event {
            InputEvent::Key(key) => self.record_key(key),
            InputEvent::Pointer(pointer) => {
                let record = self.pointer.record(pointer);
                RecordedEvent {
                    event: InputEvent::Pointer(record.event),
                    movement_speed: record.movement_speed,
                }
            }
        };
        RecordOutcome::Recorded(recorded)
    }

    fn record_key(&mut self, key: KeyEvent) -> RecordedEvent {
        self.keyboard.record(key.clone());
        RecordedEvent {
            event: InputEvent::Key(key),
            movement_speed: None,
        }
    }

    /// Assemble a feature snapshot from the current buffers and counters.
    pub fn snapshot(&self) -> FeatureSnapshot {
        FeatureSnapshot::assemble(&self.keyboard, &self.pointer)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn sources(&self) -> &SourceConfig {
        &self.sources
    }

    pub fn keyboard(&self) -> &KeyboardSignalExtractor {
        &self.keyboard
    }

    pub fn pointer(&self) -> &PointerSignalExtractor {
        &self.pointer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::PointerEvent;
    use crate::core::feedback::FixedStressLevel;

    fn session() -> TrackingSession {
        TrackingSession::new(
            SessionOptions {
                simulate_pressure: true,
                pressure_seed: Some(42),
                ..SessionOptions::default()
            },
            Arc::new(FixedStressLevel(0)),
        )
    }

    #[test]
    fn test_starts_idle_and_ignores_events() {
        let mut session = session();
        assert_eq!(session.state(), SessionState::Idle);

        let outcome = session.record_event(KeyEvent::down("a", "KeyA", 0).into());
        assert_eq!(outcome, RecordOutcome::Ignored(IgnoreReason::Inactive));
        assert_eq!(session.keyboard().total_key_presses(), 0);
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut session = session();
        session.start();
        let id = session.session_id();
        session.record_event(KeyEvent::down("a", "KeyA", 0).into());

        session.start();
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.session_id(), id);
        assert_eq!(session.keyboard().total_key_presses(), 1);
    }

    #[test]
    fn test_pause_preserves_and_blocks() {
        let mut session = session();
        session.pause();
        assert_eq!(session.state(), SessionState::Idle);

        session.start();
        session.record_event(PointerEvent::movement(0.0, 0.0, 0).into());
        session.record_event(PointerEvent::movement(3.0, 4.0, 10).into());
        session.pause();
        assert_eq!(session.state(), SessionState::Paused);

        let outcome = session.record_event(PointerEvent::movement(100.0, 4.0, 20).into());
        assert_eq!(outcome, RecordOutcome::Ignored(IgnoreReason::Inactive));

        session.start();
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.pointer().total_distance(), 5.0);
        assert_eq!(session.pointer().buffer().len(), 2);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = session();
        session.start();
        session.record_event(KeyEvent::down("Backspace", "Backspace", 0).into());
        session.record_event(PointerEvent::movement(1.0, 1.0, 0).into());
        session.record_event(PointerEvent::movement(2.0, 2.0, 5).into());
        session.record_event(PointerEvent::click(2.0, 2.0, 0, 6).into());

        session.reset();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.keyboard().buffer().is_empty());
        assert!(session.pointer().buffer().is_empty());
        assert_eq!(session.keyboard().total_key_presses(), 0);
        assert_eq!(session.keyboard().backspace_count(), 0);
        assert_eq!(session.keyboard().last_key_timestamp(), None);
        assert_eq!(session.pointer().click_count(), 0);
        assert_eq!(session.pointer().total_distance(), 0.0);
        assert_eq!(session.pointer().last_position(), None);
        assert_eq!(session.pointer().last_move_timestamp(), None);

        session.start();
        assert_eq!(session.state(), SessionState::Active);
        assert!(session.keyboard().buffer().is_empty());
    }

    #[test]
    fn test_fresh_start_after_reset_gets_new_id() {
        let mut session = session();
        session.start();
        let first = session.session_id();
        session.reset();
        session.start();
        assert_ne!(session.session_id(), first);
    }

    #[test]
    fn test_out_of_order_events_are_dropped() {
        let mut session = session();
        session.start();
        session.record_event(KeyEvent::down("a", "KeyA", 100).into());

        let outcome = session.record_event(KeyEvent::down("b", "KeyB", 50).into());
        assert_eq!(outcome, RecordOutcome::Ignored(IgnoreReason::OutOfOrder));

        // Ordering is per modality.
        let outcome = session.record_event(PointerEvent::movement(0.0, 0.0, 10).into());
        assert!(outcome.is_recorded());
    }

    #[test]
    fn test_disabled_source_is_ignored() {
        let mut session = TrackingSession::new(
            SessionOptions {
                sources: SourceConfig::from_csv("keyboard"),
                ..SessionOptions::default()
            },
            Arc::new(FixedStressLevel(0)),
        );
        session.start();

        let outcome = session.record_event(PointerEvent::movement(0.0, 0.0, 0).into());
        assert_eq!(outcome, RecordOutcome::Ignored(IgnoreReason::SourceDisabled));
        assert!(session
            .record_event(KeyEvent::down("a", "KeyA", 0).into())
            .is_recorded());
    }

    #[test]
    fn test_recorded_click_carries_simulated_pressure() {
        let mut session = session();
        session.start();

        match session.record_event(PointerEvent::click(0.0, 0.0, 0, 0).into()) {
            RecordOutcome::Recorded(RecordedEvent {
                event: InputEvent::Pointer(PointerEvent::Click { pressure, .. }),
                ..
            }) => {
                let pressure = pressure.expect("simulated pressure");
                assert!((0.8..0.9).contains(&pressure));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
