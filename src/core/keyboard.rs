//! Keyboard signal extraction: typing cadence and error correction.

use crate::collector::types::KeyEvent;
use crate::core::buffer::EventBuffer;

/// Characters per word for WPM normalisation.
const CHARS_PER_WORD: f64 = 5.0;

/// Scale applied to the backspace ratio to form the key-press variance proxy.
const VARIANCE_PROXY_SCALE: f64 = 0.3;

/// Keyboard event window plus running counters.
#[derive(Debug, Clone)]
pub struct KeyboardSignalExtractor {
    buffer: EventBuffer<KeyEvent>,
    total_key_presses: u64,
    backspace_count: u64,
    last_key_timestamp: Option<u64>,
}

impl KeyboardSignalExtractor {
    pub fn new(max_events: Option<usize>) -> Self {
        Self {
            buffer: EventBuffer::new(max_events),
            total_key_presses: 0,
            backspace_count: 0,
            last_key_timestamp: None,
        }
    }

    /// Append an event and update the running counters.
    pub fn record(&mut self, event: KeyEvent) {
        if event.is_down() {
            self.total_key_presses += 1;
            if event.is_correction() {
                self.backspace_count += 1;
            }
        }
        self.last_key_timestamp = Some(event.timestamp_ms);
        self.buffer.append(event);
    }

    /// Clear the window and zero every counter.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.total_key_presses = 0;
        self.backspace_count = 0;
        self.last_key_timestamp = None;
    }

    /// Whole-buffer typing speed in words per minute, rounded.
    ///
    /// Averages over the span between the first and last key press in the
    /// buffer, so bursts are under-represented and lulls over-represented.
    pub fn typing_speed_wpm(&self) -> f64 {
        let mut downs = self.buffer.snapshot().filter(|e| e.is_down());
        let first = match downs.next() {
            Some(event) => event.timestamp_ms,
            None => return 0.0,
        };
        let (count, last) = downs.fold((1usize, first), |(n, _), e| (n + 1, e.timestamp_ms));
        if count < 2 {
            return 0.0;
        }

        let span_secs = last.saturating_sub(first) as f64 / 1000.0;
        if span_secs == 0.0 {
            return 0.0;
        }

        let chars_per_minute = count as f64 / span_secs * 60.0;
        (chars_per_minute / CHARS_PER_WORD).round()
    }

    /// Corrections per key press, from the running counters.
    pub fn backspace_ratio(&self) -> f64 {
        self.backspace_count as f64 / self.total_key_presses.max(1) as f64
    }

    /// Heuristic stand-in for key-press timing variance.
    ///
    /// This is NOT a statistical variance: no inter-key intervals are
    /// measured. It is `backspace_ratio * 0.3`, the value the downstream
    /// classifier is fed under the `key_press_variance` name.
    pub fn key_press_variance_proxy(&self) -> f64 {
        self.backspace_ratio() * VARIANCE_PROXY_SCALE
    }

    pub fn total_key_presses(&self) -> u64 {
        self.total_key_presses
    }

    pub fn backspace_count(&self) -> u64 {
        self.backspace_count
    }

    pub fn last_key_timestamp(&self) -> Option<u64> {
        self.last_key_timestamp
    }

    pub fn buffer(&self) -> &EventBuffer<KeyEvent> {
        &self.buffer
    }
}

impl Default for KeyboardSignalExtractor {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(extractor: &mut KeyboardSignalExtractor, key: &str, at: u64) {
        extractor.record(KeyEvent::down(key, key, at));
        extractor.record(KeyEvent::up(key, key, at + 40));
    }

    #[test]
    fn test_wpm_needs_two_presses() {
        let mut extractor = KeyboardSignalExtractor::default();
        assert_eq!(extractor.typing_speed_wpm(), 0.0);

        press(&mut extractor, "a", 0);
        assert_eq!(extractor.typing_speed_wpm(), 0.0);
    }

    #[test]
    fn test_wpm_five_presses_in_800ms() {
        let mut extractor = KeyboardSignalExtractor::default();
        for at in [0, 200, 400, 600, 800] {
            extractor.record(KeyEvent::down("a", "KeyA", at));
        }
        // 5 / 0.8s * 60 = 375 cpm, / 5 = 75 wpm
        assert_eq!(extractor.typing_speed_wpm(), 75.0);
    }

    #[test]
    fn test_wpm_zero_span() {
        let mut extractor = KeyboardSignalExtractor::default();
        extractor.record(KeyEvent::down("a", "KeyA", 100));
        extractor.record(KeyEvent::down("b", "KeyB", 100));
        assert_eq!(extractor.typing_speed_wpm(), 0.0);
    }

    #[test]
    fn test_wpm_ignores_key_up() {
        let mut extractor = KeyboardSignalExtractor::default();
        extractor.record(KeyEvent::down("a", "KeyA", 0));
        extractor.record(KeyEvent::up("a", "KeyA", 5_000));
        assert_eq!(extractor.typing_speed_wpm(), 0.0);
    }

    #[test]
    fn test_wpm_monotonic_in_count() {
        let mut sparse = KeyboardSignalExtractor::default();
        let mut dense = KeyboardSignalExtractor::default();
        for at in [0, 500, 1000] {
            sparse.record(KeyEvent::down("a", "KeyA", at));
        }
        for at in [0, 250, 500, 750, 1000] {
            dense.record(KeyEvent::down("a", "KeyA", at));
        }
        assert!(dense.typing_speed_wpm() >= sparse.typing_speed_wpm());
    }

    #[test]
    fn test_backspace_ratio_and_proxy() {
        let mut extractor = KeyboardSignalExtractor::default();
        assert_eq!(extractor.backspace_ratio(), 0.0);

        press(&mut extractor, "a", 0);
        press(&mut extractor, "b", 100);
        press(&mut extractor, "Backspace", 200);
        press(&mut extractor, "Delete", 300);

        assert_eq!(extractor.total_key_presses(), 4);
        assert_eq!(extractor.backspace_count(), 2);
        assert_eq!(extractor.backspace_ratio(), 0.5);
        assert!((extractor.key_press_variance_proxy() - 0.15).abs() < 1e-12);
        assert_eq!(extractor.last_key_timestamp(), Some(340));
    }

    #[test]
    fn test_clear_zeroes_counters() {
        let mut extractor = KeyboardSignalExtractor::default();
        press(&mut extractor, "Backspace", 0);
        extractor.clear();

        assert!(extractor.buffer().is_empty());
        assert_eq!(extractor.total_key_presses(), 0);
        assert_eq!(extractor.backspace_count(), 0);
        assert_eq!(extractor.last_key_timestamp(), None);
    }
}
