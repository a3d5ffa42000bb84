use serde::{Deserialize, Serialize};

/// Orientation quaternion reported by one IMU (w, x, y, z)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Euclidean norm. Ingestion does not enforce unit norm; consumers that
    /// care can check how far a reported sample drifts from 1.0.
    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Per-subsystem calibration confidence, each typically 0-3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationStatus {
    pub system: u8,
    pub gyro: u8,
    pub accel: u8,
    pub mag: u8,
}

impl CalibrationStatus {
    pub fn new(system: u8, gyro: u8, accel: u8, mag: u8) -> Self {
        Self {
            system,
            gyro,
            accel,
            mag,
        }
    }

    /// All four subsystems report full confidence
    pub fn is_fully_calibrated(&self) -> bool {
        self.system >= 3 && self.gyro >= 3 && self.accel >= 3 && self.mag >= 3
    }
}

/// One decoded telemetry reading from a single IMU.
///
/// `timestamp_ticks` is the device-local monotonic clock, not wall time, and
/// is not synchronized across sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub sensor_id: u8,
    pub timestamp_ticks: u64,
    pub orientation: Quaternion,
    pub calibration: CalibrationStatus,
}

impl SensorSample {
    pub fn new(
        sensor_id: u8,
        timestamp_ticks: u64,
        orientation: Quaternion,
        calibration: CalibrationStatus,
    ) -> Self {
        Self {
            sensor_id,
            timestamp_ticks,
            orientation,
            calibration,
        }
    }
}

/// Samples that arrived together in one socket delivery, in payload order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleBatch {
    pub samples: Vec<SensorSample>,
}

impl SampleBatch {
    pub fn new(samples: Vec<SensorSample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
