//! Feedback channel from the external classifier into pressure simulation.
//!
//! The classifier's last reported stress index is written into a
//! [`SharedStressLevel`] by whoever receives predictions; the pointer
//! extractor only ever reads it through [`StressLevelSource`].

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Highest stress index the classifier reports.
pub const MAX_STRESS_INDEX: u8 = 4;

/// Read-only accessor for the last known external stress index (0-4).
pub trait StressLevelSource: Send + Sync {
    fn last_stress_index(&self) -> u8;
}

/// Constant source, mostly useful in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedStressLevel(pub u8);

impl StressLevelSource for FixedStressLevel {
    fn last_stress_index(&self) -> u8 {
        self.0.min(MAX_STRESS_INDEX)
    }
}

/// Cloneable, thread-safe stress index cell. Starts at 0.
#[derive(Debug, Clone, Default)]
pub struct SharedStressLevel {
    index: Arc<AtomicU8>,
}

impl SharedStressLevel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new index. Values above the scale are clamped.
    pub fn set(&self, index: u8) {
        self.index.store(index.min(MAX_STRESS_INDEX), Ordering::Relaxed);
    }

    pub fn get(&self) -> u8 {
        self.index.load(Ordering::Relaxed)
    }
}

impl StressLevelSource for SharedStressLevel {
    fn last_stress_index(&self) -> u8 {
        self.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_level_defaults_to_zero() {
        let level = SharedStressLevel::new();
        assert_eq!(level.last_stress_index(), 0);
    }

    #[test]
    fn test_shared_level_clones_share_state() {
        let level = SharedStressLevel::new();
        let reader = level.clone();
        level.set(3);
        assert_eq!(reader.last_stress_index(), 3);

        level.set(9);
        assert_eq!(reader.last_stress_index(), MAX_STRESS_INDEX);
    }
}
