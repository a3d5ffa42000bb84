//! Live per-sensor throughput tracking.
//!
//! Counts samples per IMU over fixed wall-clock windows; the last completed
//! window is published as the current rate. Windowing is driven by the
//! client's clock, not the device's tick clock: the tracker reports observed
//! throughput, not device-side sampling precision.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::client::BatchListener;
use crate::types::SampleBatch;

/// Default window length; a count per window is then samples per second
pub const RATE_WINDOW: Duration = Duration::from_secs(1);

/// Point-in-time view of rates and totals, for the UI's 1 Hz poll
#[derive(Debug, Clone, Default, Serialize)]
pub struct RateSnapshot {
    /// Samples per sensor in the last completed window
    pub rates: HashMap<u8, u32>,
    /// Samples per sensor since the tracker was created
    pub totals: HashMap<u8, u64>,
}

struct WindowState {
    window: Duration,
    window_started: Instant,
    current: HashMap<u8, u32>,
    published: HashMap<u8, u32>,
    totals: HashMap<u8, u64>,
}

impl WindowState {
    fn new(window: Duration) -> Self {
        Self {
            window,
            window_started: Instant::now(),
            current: HashMap::new(),
            published: HashMap::new(),
            totals: HashMap::new(),
        }
    }

    /// Close out any windows that have fully elapsed. If more than one
    /// window passed, the most recently completed one saw no samples.
    fn roll(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.window_started);
        if elapsed < self.window {
            return;
        }
        let windows = (elapsed.as_nanos() / self.window.as_nanos()) as u32;
        if windows == 1 {
            self.published = std::mem::take(&mut self.current);
        } else {
            self.current.clear();
            self.published.clear();
        }
        self.window_started += self.window * windows;
    }

    fn record(&mut self, batch: &SampleBatch, now: Instant) {
        self.roll(now);
        for sample in &batch.samples {
            *self.current.entry(sample.sensor_id).or_insert(0) += 1;
            *self.totals.entry(sample.sensor_id).or_insert(0) += 1;
        }
    }
}

/// Per-sensor sampling-rate tracker. Cheap to clone; clones share state, so
/// one handle can feed from the stream while another serves UI reads.
#[derive(Clone)]
pub struct RateTracker {
    inner: Arc<Mutex<WindowState>>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::with_window(RATE_WINDOW)
    }

    /// Tracker with a custom window length
    pub fn with_window(window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(WindowState::new(window))),
        }
    }

    pub fn record_batch(&self, batch: &SampleBatch) {
        if let Ok(mut state) = self.inner.lock() {
            state.record(batch, Instant::now());
        }
    }

    /// Samples per sensor counted in the last completed window
    pub fn current_rates(&self) -> HashMap<u8, u32> {
        self.inner
            .lock()
            .map(|mut state| {
                state.roll(Instant::now());
                state.published.clone()
            })
            .unwrap_or_default()
    }

    /// Samples per sensor across the tracker's lifetime
    pub fn cumulative_totals(&self) -> HashMap<u8, u64> {
        self.inner
            .lock()
            .map(|state| state.totals.clone())
            .unwrap_or_default()
    }

    /// Rate for one sensor; 0 when the sensor was silent last window
    pub fn rate_for(&self, sensor_id: u8) -> u32 {
        self.current_rates().get(&sensor_id).copied().unwrap_or(0)
    }

    pub fn total_for(&self, sensor_id: u8) -> u64 {
        self.cumulative_totals()
            .get(&sensor_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> RateSnapshot {
        RateSnapshot {
            rates: self.current_rates(),
            totals: self.cumulative_totals(),
        }
    }
}

impl Default for RateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchListener for RateTracker {
    fn on_batch(&self, batch: &SampleBatch) {
        self.record_batch(batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CalibrationStatus, Quaternion, SensorSample};
    use std::thread;

    const WINDOW: Duration = Duration::from_millis(200);
    const MARGIN: Duration = Duration::from_millis(50);

    fn batch_for(sensor_id: u8, count: usize) -> SampleBatch {
        let samples = (0..count)
            .map(|i| {
                SensorSample::new(
                    sensor_id,
                    i as u64,
                    Quaternion::new(1.0, 0.0, 0.0, 0.0),
                    CalibrationStatus::new(3, 3, 3, 3),
                )
            })
            .collect();
        SampleBatch::new(samples)
    }

    #[test]
    fn test_window_publishes_on_boundary() {
        let tracker = RateTracker::with_window(WINDOW);

        tracker.record_batch(&batch_for(7, 1));
        tracker.record_batch(&batch_for(7, 1));
        tracker.record_batch(&batch_for(7, 1));

        // window still open, nothing published yet
        assert_eq!(tracker.rate_for(7), 0);
        assert_eq!(tracker.total_for(7), 3);

        thread::sleep(WINDOW + MARGIN);
        assert_eq!(tracker.rate_for(7), 3);
        assert_eq!(tracker.total_for(7), 3);
    }

    #[test]
    fn test_totals_grow_across_windows() {
        let tracker = RateTracker::with_window(WINDOW);

        tracker.record_batch(&batch_for(7, 3));
        thread::sleep(WINDOW + MARGIN);
        tracker.record_batch(&batch_for(7, 2));
        thread::sleep(WINDOW + MARGIN);

        assert_eq!(tracker.rate_for(7), 2);
        assert_eq!(tracker.total_for(7), 5);
    }

    #[test]
    fn test_idle_gap_zeroes_rates() {
        let tracker = RateTracker::with_window(WINDOW);

        tracker.record_batch(&batch_for(1, 4));
        thread::sleep(WINDOW + MARGIN);
        assert_eq!(tracker.rate_for(1), 4);

        // two full windows with no samples
        thread::sleep(WINDOW * 2 + MARGIN);
        assert!(tracker.current_rates().is_empty());
        assert_eq!(tracker.total_for(1), 4);
    }

    #[test]
    fn test_sensors_counted_independently() {
        let tracker = RateTracker::with_window(WINDOW);

        let mut mixed = batch_for(1, 2);
        mixed.samples.extend(batch_for(2, 1).samples);
        tracker.record_batch(&mixed);
        tracker.record_batch(&batch_for(2, 1));

        thread::sleep(WINDOW + MARGIN);
        let rates = tracker.current_rates();
        assert_eq!(rates.get(&1), Some(&2));
        assert_eq!(rates.get(&2), Some(&2));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.totals.get(&1), Some(&2));
        assert_eq!(snapshot.totals.get(&2), Some(&2));
    }
}
