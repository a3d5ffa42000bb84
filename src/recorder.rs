//! Recording aggregation and export.
//!
//! While a recording window is open, every arriving batch is appended to a
//! private buffer in arrival order. Ending the window leaves the buffer
//! intact for export; starting a new one clears it.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::BatchListener;
use crate::error::{TelemetryError, TelemetryResult};
use crate::types::{SampleBatch, SensorSample};

/// Header row of the export artifact
pub const CSV_HEADER: &str = "IMU ID,Timestamp,W,X,Y,Z,Sys Cal,Gyro Cal,Accel Cal,Mag Cal";

/// Recording window states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordingState {
    Idle,
    Recording,
}

/// Summary of one recording window, serialized next to the CSV export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub label: String,
    pub started_at: Option<String>,
    pub duration_seconds: i64,
    pub batch_count: usize,
    pub sample_count: usize,
    pub samples_per_sensor: BTreeMap<u8, u64>,
}

impl RecordingSummary {
    pub fn to_json(&self) -> TelemetryResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

struct RecorderInner {
    state: RecordingState,
    batches: Vec<SampleBatch>,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
}

/// Buffers batches for the duration of one recording window and serializes
/// them on demand. Cheap to clone; clones share the same buffer.
#[derive(Clone)]
pub struct RecordingAggregator {
    inner: Arc<Mutex<RecorderInner>>,
}

impl RecordingAggregator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RecorderInner {
                state: RecordingState::Idle,
                batches: Vec::new(),
                started_at: None,
                stopped_at: None,
            })),
        }
    }

    fn lock(&self) -> TelemetryResult<std::sync::MutexGuard<'_, RecorderInner>> {
        self.inner
            .lock()
            .map_err(|_| TelemetryError::Internal("Failed to acquire recorder lock".to_string()))
    }

    /// Open a recording window (Idle -> Recording). Clears any prior buffer.
    pub fn start_recording(&self) -> TelemetryResult<()> {
        let mut inner = self.lock()?;
        match inner.state {
            RecordingState::Recording => Err(TelemetryError::AlreadyRecording),
            RecordingState::Idle => {
                inner.batches.clear();
                inner.started_at = Some(Utc::now());
                inner.stopped_at = None;
                inner.state = RecordingState::Recording;
                Ok(())
            }
        }
    }

    /// Close the recording window (Recording -> Idle). The buffer stays
    /// available for export until the next start.
    pub fn stop_recording(&self) -> TelemetryResult<()> {
        let mut inner = self.lock()?;
        match inner.state {
            RecordingState::Idle => Err(TelemetryError::NotRecording),
            RecordingState::Recording => {
                inner.stopped_at = Some(Utc::now());
                inner.state = RecordingState::Idle;
                Ok(())
            }
        }
    }

    pub fn state(&self) -> RecordingState {
        self.inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or(RecordingState::Idle)
    }

    pub fn is_recording(&self) -> bool {
        self.state() == RecordingState::Recording
    }

    /// Append a batch in arrival order. Batches arriving outside an open
    /// window are ignored.
    pub fn record_batch(&self, batch: &SampleBatch) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.state == RecordingState::Recording {
                inner.batches.push(batch.clone());
            }
        }
    }

    pub fn batch_count(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.batches.len())
            .unwrap_or(0)
    }

    pub fn sample_count(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.batches.iter().map(SampleBatch::len).sum())
            .unwrap_or(0)
    }

    /// Serialize the buffered window: header plus one row per sample, rows
    /// grouped by originating batch then in-batch order. Never consumes the
    /// buffer.
    pub fn export_csv(&self) -> String {
        let mut out = String::from(CSV_HEADER);
        if let Ok(inner) = self.inner.lock() {
            for sample in inner.batches.iter().flat_map(|batch| &batch.samples) {
                out.push('\n');
                push_csv_row(&mut out, sample);
            }
        }
        out
    }

    /// Write the CSV export to disk. I/O failure leaves the buffer intact.
    pub fn write_csv(&self, path: &Path) -> TelemetryResult<()> {
        fs::write(path, self.export_csv())?;
        Ok(())
    }

    /// Summary of the current buffer for the given label
    pub fn summary(&self, label: &str) -> RecordingSummary {
        let mut summary = RecordingSummary {
            label: label.to_string(),
            started_at: None,
            duration_seconds: 0,
            batch_count: 0,
            sample_count: 0,
            samples_per_sensor: BTreeMap::new(),
        };
        if let Ok(inner) = self.inner.lock() {
            summary.started_at = inner.started_at.map(|t| t.to_rfc3339());
            if let Some(started) = inner.started_at {
                let end = inner.stopped_at.unwrap_or_else(Utc::now);
                summary.duration_seconds = end.signed_duration_since(started).num_seconds().max(0);
            }
            summary.batch_count = inner.batches.len();
            for sample in inner.batches.iter().flat_map(|batch| &batch.samples) {
                summary.sample_count += 1;
                *summary
                    .samples_per_sensor
                    .entry(sample.sensor_id)
                    .or_insert(0) += 1;
            }
        }
        summary
    }
}

impl Default for RecordingAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchListener for RecordingAggregator {
    fn on_batch(&self, batch: &SampleBatch) {
        self.record_batch(batch);
    }
}

fn push_csv_row(out: &mut String, sample: &SensorSample) {
    let _ = write!(
        out,
        "{},{},{},{},{},{},{},{},{},{}",
        sample.sensor_id,
        sample.timestamp_ticks,
        sample.orientation.w,
        sample.orientation.x,
        sample.orientation.y,
        sample.orientation.z,
        sample.calibration.system,
        sample.calibration.gyro,
        sample.calibration.accel,
        sample.calibration.mag,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode_line;
    use crate::types::{CalibrationStatus, Quaternion};

    fn sample(sensor_id: u8, ticks: u64) -> SensorSample {
        SensorSample::new(
            sensor_id,
            ticks,
            Quaternion::new(0.1, 0.2, 0.3, 0.4),
            CalibrationStatus::new(3, 2, 1, 0),
        )
    }

    fn batch(samples: Vec<SensorSample>) -> SampleBatch {
        SampleBatch::new(samples)
    }

    #[test]
    fn test_state_transitions() {
        let recorder = RecordingAggregator::new();
        assert_eq!(recorder.state(), RecordingState::Idle);

        recorder.start_recording().unwrap();
        assert!(recorder.is_recording());

        recorder.stop_recording().unwrap();
        assert_eq!(recorder.state(), RecordingState::Idle);
    }

    #[test]
    fn test_invalid_transitions() {
        let recorder = RecordingAggregator::new();

        assert!(matches!(
            recorder.stop_recording(),
            Err(TelemetryError::NotRecording)
        ));

        recorder.start_recording().unwrap();
        assert!(matches!(
            recorder.start_recording(),
            Err(TelemetryError::AlreadyRecording)
        ));
    }

    #[test]
    fn test_appends_only_while_recording() {
        let recorder = RecordingAggregator::new();

        recorder.record_batch(&batch(vec![sample(1, 1)]));
        assert_eq!(recorder.sample_count(), 0);

        recorder.start_recording().unwrap();
        recorder.record_batch(&batch(vec![sample(1, 2), sample(2, 2)]));
        assert_eq!(recorder.batch_count(), 1);
        assert_eq!(recorder.sample_count(), 2);

        recorder.stop_recording().unwrap();
        recorder.record_batch(&batch(vec![sample(1, 3)]));
        assert_eq!(recorder.sample_count(), 2);
    }

    #[test]
    fn test_start_clears_prior_buffer() {
        let recorder = RecordingAggregator::new();

        recorder.start_recording().unwrap();
        recorder.record_batch(&batch(vec![sample(1, 1)]));
        recorder.stop_recording().unwrap();
        assert_eq!(recorder.sample_count(), 1);

        recorder.start_recording().unwrap();
        assert_eq!(recorder.sample_count(), 0);
    }

    #[test]
    fn test_export_row_count_and_order() {
        let recorder = RecordingAggregator::new();
        recorder.start_recording().unwrap();
        recorder.record_batch(&batch(vec![sample(1, 10), sample(2, 11)]));
        recorder.record_batch(&batch(vec![sample(3, 12)]));
        recorder.stop_recording().unwrap();

        let csv = recorder.export_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4); // header + 3 samples
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("1,10,"));
        assert!(lines[2].starts_with("2,11,"));
        assert!(lines[3].starts_with("3,12,"));
    }

    #[test]
    fn test_export_keeps_buffer() {
        let recorder = RecordingAggregator::new();
        recorder.start_recording().unwrap();
        recorder.record_batch(&batch(vec![sample(1, 1)]));
        recorder.stop_recording().unwrap();

        let first = recorder.export_csv();
        let second = recorder.export_csv();
        assert_eq!(first, second);
        assert_eq!(recorder.sample_count(), 1);
    }

    #[test]
    fn test_csv_row_round_trips_through_decoder() {
        let original = SensorSample::new(
            7,
            123456,
            Quaternion::new(0.7071, -0.001, 0.5, 0.4999),
            CalibrationStatus::new(3, 3, 2, 1),
        );
        let recorder = RecordingAggregator::new();
        recorder.start_recording().unwrap();
        recorder.record_batch(&batch(vec![original.clone()]));
        recorder.stop_recording().unwrap();

        let csv = recorder.export_csv();
        let row = csv.lines().nth(1).unwrap();
        let reparsed = decode_line(&row.replace(',', " ")).unwrap();
        assert_eq!(reparsed, original);
    }

    #[test]
    fn test_summary_totals() {
        let recorder = RecordingAggregator::new();
        recorder.start_recording().unwrap();
        recorder.record_batch(&batch(vec![sample(1, 1), sample(1, 2), sample(2, 1)]));
        recorder.record_batch(&batch(vec![sample(2, 2)]));
        recorder.stop_recording().unwrap();

        let summary = recorder.summary("Bench Press");
        assert_eq!(summary.label, "Bench Press");
        assert_eq!(summary.batch_count, 2);
        assert_eq!(summary.sample_count, 4);
        assert_eq!(summary.samples_per_sensor.get(&1), Some(&2));
        assert_eq!(summary.samples_per_sensor.get(&2), Some(&2));
        assert!(summary.started_at.is_some());

        let json = summary.to_json().unwrap();
        assert!(json.contains("Bench Press"));
    }
}
