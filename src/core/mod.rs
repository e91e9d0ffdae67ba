//! Core signal extraction.
//!
//! This module contains:
//! - Bounded per-modality event buffers
//! - Keyboard and pointer feature extractors with their running counters
//! - The tracking session state machine
//! - Feature snapshot assembly

pub mod buffer;
pub mod feedback;
pub mod keyboard;
pub mod pointer;
pub mod session;
pub mod snapshot;

// Re-export commonly used types
pub use buffer::EventBuffer;
pub use feedback::{FixedStressLevel, SharedStressLevel, StressLevelSource, MAX_STRESS_INDEX};
pub use keyboard::KeyboardSignalExtractor;
pub use pointer::{
    PointerRecord, PointerSignalExtractor, PressureSimulator, NEUTRAL_PRESSURE, RANDOMNESS_FLOOR,
};
pub use session::{
    IgnoreReason, RecordOutcome, RecordedEvent, SessionOptions, SessionState, TrackingSession,
};
pub use snapshot::FeatureSnapshot;
