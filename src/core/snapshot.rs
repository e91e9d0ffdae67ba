//! Feature snapshot assembly.

use crate::core::keyboard::KeyboardSignalExtractor;
use crate::core::pointer::PointerSignalExtractor;
use serde::{Deserialize, Serialize};

/// One immutable bundle of derived signals at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSnapshot {
    /// Whole-buffer typing speed, rounded WPM
    pub typing_speed_wpm: f64,
    /// `backspace_ratio * 0.3`; a heuristic, not a timing variance
    pub key_press_variance_proxy: f64,
    /// Corrections per key press (running counters)
    pub backspace_ratio: f64,
    /// Move-path curvature randomness in [0, 1]
    pub mouse_randomness: f64,
    /// Clicks per second over buffered clicks
    pub click_frequency: f64,
    /// Mean click pressure, 1.0 when none
    pub average_pressure: f64,
    /// Variance of move-to-move speed (px/ms) over buffered moves
    pub mouse_speed_variance: f64,
    /// Cumulative pointer travel
    pub total_distance: f64,
    pub move_count: u64,
    pub click_count: u64,
    pub scroll_count: u64,
}

impl FeatureSnapshot {
    /// Compute every feature from the current extractor state.
    ///
    /// Pure read: calling this twice without intervening events yields
    /// identical snapshots.
    pub fn assemble(keyboard: &KeyboardSignalExtractor, pointer: &PointerSignalExtractor) -> Self {
        Self {
            typing_speed_wpm: keyboard.typing_speed_wpm(),
            key_press_variance_proxy: keyboard.key_press_variance_proxy(),
            backspace_ratio: keyboard.backspace_ratio(),
            mouse_randomness: pointer.mouse_randomness(),
            click_frequency: pointer.click_frequency(),
            average_pressure: pointer.average_pressure(),
            mouse_speed_variance: pointer.mouse_speed_variance(),
            total_distance: pointer.total_distance(),
            move_count: pointer.move_count(),
            click_count: pointer.click_count(),
            scroll_count: pointer.scroll_count(),
        }
    }

    /// Features in the order and naming the remote classifier expects.
    pub fn classifier_features(&self) -> [(&'static str, f64); 6] {
        [
            ("typing_speed", self.typing_speed_wpm),
            ("key_press_variance", self.key_press_variance_proxy),
            ("mouse_randomness", self.mouse_randomness),
            ("click_frequency", self.click_frequency),
            ("backspace_ratio", self.backspace_ratio),
            ("mouse_speed_variance", self.mouse_speed_variance),
        ]
    }
}
