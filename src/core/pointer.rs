//! Pointer signal extraction: movement randomness, distance, click
//! frequency and simulated pressure.

use crate::collector::types::PointerEvent;
use crate::core::buffer::EventBuffer;
use crate::core::feedback::{StressLevelSource, MAX_STRESS_INDEX};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::statistics::Statistics;
use std::sync::Arc;

/// Returned by [`PointerSignalExtractor::mouse_randomness`] when there are
/// not enough moves to measure curvature.
pub const RANDOMNESS_FLOOR: f64 = 0.1;

/// Maps typical angle variances into [0, 1].
const RANDOMNESS_SCALE: f64 = 10.0;

/// Pressure reported when no click carries one.
pub const NEUTRAL_PRESSURE: f64 = 1.0;

/// Lowest simulated pressure.
const PRESSURE_BASE: f64 = 0.8;
/// Spread at stress index 0.
const PRESSURE_BASE_VARIATION: f64 = 0.1;
/// Extra spread added at the top of the stress scale.
const PRESSURE_STRESS_VARIATION: f64 = 0.3;

/// Simulates click pressure in the absence of pressure-sensing hardware.
///
/// The spread widens with the classifier's last reported stress index, so a
/// stressed user produces noisier pressure readings.
pub struct PressureSimulator {
    rng: StdRng,
    stress: Arc<dyn StressLevelSource>,
}

impl PressureSimulator {
    pub fn new(stress: Arc<dyn StressLevelSource>) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            stress,
        }
    }

    /// Deterministic simulator for reproducible runs.
    pub fn with_seed(stress: Arc<dyn StressLevelSource>, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            stress,
        }
    }

    /// Current pressure spread: `0.1 + (stress / 4) * 0.3`.
    pub fn variation(&self) -> f64 {
        let index = self.stress.last_stress_index().min(MAX_STRESS_INDEX);
        PRESSURE_BASE_VARIATION
            + (index as f64 / MAX_STRESS_INDEX as f64) * PRESSURE_STRESS_VARIATION
    }

    /// Draw one pressure reading in `[0.8, 0.8 + variation)`.
    pub fn sample(&mut self) -> f64 {
        let variation = self.variation();
        PRESSURE_BASE + self.rng.gen::<f64>() * variation
    }
}

impl std::fmt::Debug for PressureSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PressureSimulator")
            .field("stress_index", &self.stress.last_stress_index())
            .finish()
    }
}

/// A pointer event as stored, plus values derived while recording it.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerRecord {
    /// The stored event (clicks carry their simulated pressure)
    pub event: PointerEvent,
    /// Pixels per millisecond since the previous move
    pub movement_speed: Option<f64>,
}

/// Pointer event window plus running counters.
#[derive(Debug)]
pub struct PointerSignalExtractor {
    buffer: EventBuffer<PointerEvent>,
    total_distance: f64,
    move_count: u64,
    click_count: u64,
    scroll_count: u64,
    last_position: Option<(f64, f64)>,
    last_move_timestamp: Option<u64>,
    /// `None` disables pressure simulation
    pressure: Option<PressureSimulator>,
}

impl PointerSignalExtractor {
    pub fn new(max_events: Option<usize>, pressure: Option<PressureSimulator>) -> Self {
        Self {
            buffer: EventBuffer::new(max_events),
            total_distance: 0.0,
            move_count: 0,
            click_count: 0,
            scroll_count: 0,
            last_position: None,
            last_move_timestamp: None,
            pressure,
        }
    }

    /// Append an event and update the running counters.
    pub fn record(&mut self, mut event: PointerEvent) -> PointerRecord {
        let mut movement_speed = None;

        match &mut event {
            PointerEvent::Move { x, y, timestamp_ms } => {
                // The first move has no prior position and adds no distance.
                if let Some((last_x, last_y)) = self.last_position {
                    let distance = (*x - last_x).hypot(*y - last_y);
                    self.total_distance += distance;

                    if let Some(last_ts) = self.last_move_timestamp {
                        let dt = timestamp_ms.saturating_sub(last_ts);
                        movement_speed = Some(if dt > 0 { distance / dt as f64 } else { 0.0 });
                    }
                }
                self.last_position = Some((*x, *y));
                self.last_move_timestamp = Some(*timestamp_ms);
                self.move_count += 1;
            }
            PointerEvent::Click { pressure, .. } => {
                if pressure.is_none() {
                    if let Some(simulator) = self.pressure.as_mut() {
                        *pressure = Some(simulator.sample());
                    }
                }
                self.click_count += 1;
            }
            PointerEvent::Release { .. } => {}
            PointerEvent::Scroll { .. } => {
                self.scroll_count += 1;
            }
        }

        let evicted = self.buffer.append(event.clone());
        if evicted > 0 {
            tracing::trace!(evicted, "Pointer buffer at capacity");
        }

        PointerRecord {
            event,
            movement_speed,
        }
    }

    /// Clear the window, counters and last-position state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.total_distance = 0.0;
        self.move_count = 0;
        self.click_count = 0;
        self.scroll_count = 0;
        self.last_position = None;
        self.last_move_timestamp = None;
    }

    fn move_positions(&self) -> Vec<(f64, f64, u64)> {
        self.buffer
            .snapshot()
            .filter_map(|e| match e {
                PointerEvent::Move { x, y, timestamp_ms } => Some((*x, *y, *timestamp_ms)),
                _ => None,
            })
            .collect()
    }

    /// Curvature randomness of the buffered move path, in [0, 1].
    ///
    /// Takes the turning angle at every interior point of the move path
    /// (skipping zero-length segments), and maps the population variance of
    /// those angles through `min(variance * 10, 1)`. Returns
    /// [`RANDOMNESS_FLOOR`] when fewer than three moves (or no measurable
    /// angle) are buffered.
    pub fn mouse_randomness(&self) -> f64 {
        let moves = self.move_positions();
        if moves.len() < 3 {
            return RANDOMNESS_FLOOR;
        }

        let angles: Vec<f64> = moves
            .windows(3)
            .filter_map(|w| {
                let v1 = (w[1].0 - w[0].0, w[1].1 - w[0].1);
                let v2 = (w[2].0 - w[1].0, w[2].1 - w[1].1);
                let norm1 = v1.0.hypot(v1.1);
                let norm2 = v2.0.hypot(v2.1);
                if norm1 == 0.0 || norm2 == 0.0 {
                    return None;
                }
                let cos = (v1.0 * v2.0 + v1.1 * v2.1) / (norm1 * norm2);
                Some(cos.clamp(-1.0, 1.0).acos())
            })
            .collect();

        if angles.is_empty() {
            return RANDOMNESS_FLOOR;
        }

        let variance = angles.iter().population_variance();
        (variance * RANDOMNESS_SCALE).min(1.0)
    }

    /// Clicks per second across the buffered clicks.
    pub fn click_frequency(&self) -> f64 {
        let clicks: Vec<u64> = self
            .buffer
            .snapshot()
            .filter(|e| e.is_click())
            .map(PointerEvent::timestamp_ms)
            .collect();

        let (first, last) = match (clicks.first(), clicks.last()) {
            (Some(first), Some(last)) if clicks.len() >= 2 => (*first, *last),
            _ => return 0.0,
        };

        let span_secs = last.saturating_sub(first) as f64 / 1000.0;
        if span_secs == 0.0 {
            return 0.0;
        }
        clicks.len() as f64 / span_secs
    }

    /// Mean pressure over buffered clicks that carry one.
    pub fn average_pressure(&self) -> f64 {
        let pressures: Vec<f64> = self
            .buffer
            .snapshot()
            .filter_map(|e| match e {
                PointerEvent::Click {
                    pressure: Some(p), ..
                } => Some(*p),
                _ => None,
            })
            .collect();

        if pressures.is_empty() {
            NEUTRAL_PRESSURE
        } else {
            pressures.iter().sum::<f64>() / pressures.len() as f64
        }
    }

    /// Population variance of move-to-move speeds (px/ms) in the buffer.
    pub fn mouse_speed_variance(&self) -> f64 {
        let speeds: Vec<f64> = self
            .move_positions()
            .windows(2)
            .map(|w| {
                let distance = (w[1].0 - w[0].0).hypot(w[1].1 - w[0].1);
                let dt = w[1].2.saturating_sub(w[0].2);
                if dt > 0 {
                    distance / dt as f64
                } else {
                    0.0
                }
            })
            .collect();

        if speeds.len() < 2 {
            return 0.0;
        }
        speeds.iter().population_variance()
    }

    /// Cumulative path length over every recorded move, surviving eviction.
    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn move_count(&self) -> u64 {
        self.move_count
    }

    pub fn click_count(&self) -> u64 {
        self.click_count
    }

    pub fn scroll_count(&self) -> u64 {
        self.scroll_count
    }

    pub fn last_position(&self) -> Option<(f64, f64)> {
        self.last_position
    }

    pub fn last_move_timestamp(&self) -> Option<u64> {
        self.last_move_timestamp
    }

    pub fn buffer(&self) -> &EventBuffer<PointerEvent> {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::feedback::{FixedStressLevel, SharedStressLevel};

    fn extractor() -> PointerSignalExtractor {
        PointerSignalExtractor::new(Some(1000), None)
    }

    fn simulator(level: u8, seed: u64) -> PressureSimulator {
        PressureSimulator::with_seed(Arc::new(FixedStressLevel(level)), seed)
    }

    #[test]
    fn test_randomness_floor() {
        let mut pointer = extractor();
        assert_eq!(pointer.mouse_randomness(), RANDOMNESS_FLOOR);

        pointer.record(PointerEvent::movement(0.0, 0.0, 0));
        pointer.record(PointerEvent::movement(5.0, 5.0, 10));
        assert_eq!(pointer.mouse_randomness(), RANDOMNESS_FLOOR);
    }

    #[test]
    fn test_randomness_straight_line_is_zero() {
        let mut pointer = extractor();
        pointer.record(PointerEvent::movement(0.0, 0.0, 0));
        pointer.record(PointerEvent::movement(10.0, 0.0, 10));
        pointer.record(PointerEvent::movement(20.0, 0.0, 20));
        assert_eq!(pointer.mouse_randomness(), 0.0);
    }

    #[test]
    fn test_randomness_zigzag_is_bounded() {
        let mut pointer = extractor();
        let path = [
            (0.0, 0.0),
            (10.0, 0.0),
            (20.0, 0.0),
            (20.0, 10.0),
            (10.0, 10.0),
            (15.0, 2.0),
        ];
        for (i, (x, y)) in path.iter().enumerate() {
            pointer.record(PointerEvent::movement(*x, *y, i as u64 * 10));
        }

        let randomness = pointer.mouse_randomness();
        assert!(randomness > 0.0);
        assert!(randomness <= 1.0);
    }

    #[test]
    fn test_randomness_skips_zero_length_segments() {
        let mut pointer = extractor();
        pointer.record(PointerEvent::movement(0.0, 0.0, 0));
        pointer.record(PointerEvent::movement(0.0, 0.0, 10));
        pointer.record(PointerEvent::movement(0.0, 0.0, 20));
        assert_eq!(pointer.mouse_randomness(), RANDOMNESS_FLOOR);
    }

    #[test]
    fn test_total_distance_skips_first_move() {
        let mut pointer = extractor();
        pointer.record(PointerEvent::movement(100.0, 100.0, 0));
        assert_eq!(pointer.total_distance(), 0.0);

        pointer.record(PointerEvent::movement(103.0, 104.0, 10));
        pointer.record(PointerEvent::movement(103.0, 110.0, 20));
        assert!((pointer.total_distance() - 11.0).abs() < 1e-9);
        assert_eq!(pointer.move_count(), 3);
        assert_eq!(pointer.last_position(), Some((103.0, 110.0)));
        assert_eq!(pointer.last_move_timestamp(), Some(20));
    }

    #[test]
    fn test_movement_speed() {
        let mut pointer = extractor();
        let first = pointer.record(PointerEvent::movement(0.0, 0.0, 0));
        assert_eq!(first.movement_speed, None);

        let second = pointer.record(PointerEvent::movement(3.0, 4.0, 10));
        assert_eq!(second.movement_speed, Some(0.5));

        let same_instant = pointer.record(PointerEvent::movement(6.0, 8.0, 10));
        assert_eq!(same_instant.movement_speed, Some(0.0));
    }

    #[test]
    fn test_click_frequency() {
        let mut pointer = extractor();
        pointer.record(PointerEvent::click(0.0, 0.0, 0, 1000));
        assert_eq!(pointer.click_frequency(), 0.0);

        pointer.record(PointerEvent::release(0.0, 0.0, 0, 1100));
        pointer.record(PointerEvent::click(0.0, 0.0, 0, 1500));
        pointer.record(PointerEvent::click(0.0, 0.0, 0, 2000));
        // 3 clicks over 1s
        assert!((pointer.click_frequency() - 3.0).abs() < 1e-9);
        assert_eq!(pointer.click_count(), 3);
    }

    #[test]
    fn test_click_frequency_zero_span() {
        let mut pointer = extractor();
        pointer.record(PointerEvent::click(0.0, 0.0, 0, 500));
        pointer.record(PointerEvent::click(0.0, 0.0, 2, 500));
        assert_eq!(pointer.click_frequency(), 0.0);
    }

    #[test]
    fn test_average_pressure_defaults_to_neutral() {
        let mut pointer = extractor();
        assert_eq!(pointer.average_pressure(), NEUTRAL_PRESSURE);

        // Simulation disabled: clicks stay pressure-less.
        pointer.record(PointerEvent::click(0.0, 0.0, 0, 0));
        assert_eq!(pointer.average_pressure(), NEUTRAL_PRESSURE);
    }

    #[test]
    fn test_real_pressure_is_kept() {
        let mut pointer = PointerSignalExtractor::new(None, Some(simulator(4, 7)));
        let record = pointer.record(PointerEvent::Click {
            x: 0.0,
            y: 0.0,
            button: 0,
            pressure: Some(0.42),
            timestamp_ms: 0,
        });
        assert_eq!(
            record.event,
            PointerEvent::Click {
                x: 0.0,
                y: 0.0,
                button: 0,
                pressure: Some(0.42),
                timestamp_ms: 0,
            }
        );
        assert_eq!(pointer.average_pressure(), 0.42);
    }

    #[test]
    fn test_simulated_pressure_range_follows_stress() {
        assert!((simulator(0, 1).variation() - 0.1).abs() < 1e-12);
        assert!((simulator(2, 1).variation() - 0.25).abs() < 1e-12);
        assert!((simulator(4, 1).variation() - 0.4).abs() < 1e-12);

        let mut calm = simulator(0, 11);
        let mut extreme = simulator(4, 11);
        for _ in 0..200 {
            let p = calm.sample();
            assert!((0.8..0.9).contains(&p));
            let p = extreme.sample();
            assert!((0.8..1.2).contains(&p));
        }
    }

    #[test]
    fn test_simulated_pressure_reads_live_feedback() {
        let level = SharedStressLevel::new();
        let simulator = PressureSimulator::with_seed(Arc::new(level.clone()), 3);
        assert!((simulator.variation() - 0.1).abs() < 1e-12);

        level.set(4);
        assert!((simulator.variation() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_simulated_pressure_fills_clicks() {
        let mut pointer = PointerSignalExtractor::new(None, Some(simulator(1, 5)));
        let record = pointer.record(PointerEvent::click(1.0, 1.0, 0, 0));
        match record.event {
            PointerEvent::Click {
                pressure: Some(p), ..
            } => assert!((0.8..0.9 + 0.075).contains(&p)),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(pointer.average_pressure() < NEUTRAL_PRESSURE);
    }

    #[test]
    fn test_mouse_speed_variance() {
        let mut pointer = extractor();
        pointer.record(PointerEvent::movement(0.0, 0.0, 0));
        pointer.record(PointerEvent::movement(10.0, 0.0, 10));
        assert_eq!(pointer.mouse_speed_variance(), 0.0);

        // speeds 1.0 then 3.0 px/ms -> population variance 1.0
        pointer.record(PointerEvent::movement(40.0, 0.0, 20));
        assert!((pointer.mouse_speed_variance() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_clear_resets_state() {
        let mut pointer = extractor();
        pointer.record(PointerEvent::movement(0.0, 0.0, 0));
        pointer.record(PointerEvent::movement(5.0, 0.0, 5));
        pointer.record(PointerEvent::scroll(0.0, 3.0, 6));
        pointer.clear();

        assert!(pointer.buffer().is_empty());
        assert_eq!(pointer.total_distance(), 0.0);
        assert_eq!(pointer.move_count(), 0);
        assert_eq!(pointer.scroll_count(), 0);
        assert_eq!(pointer.last_position(), None);
        assert_eq!(pointer.last_move_timestamp(), None);
    }
}
