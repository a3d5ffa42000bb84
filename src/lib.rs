//! Real-time ingestion core for an IMU workout tracker: a line-oriented
//! telemetry decoder, a reconnecting socket client, live sampling-rate
//! tracking, and recording aggregation with CSV export.

pub mod catalog;
pub mod client;
pub mod decoder;
pub mod device;
pub mod error;
pub mod rate_tracker;
pub mod recorder;
pub mod types;

pub use client::{BatchListener, ConnectionState, StreamClient};
pub use device::DeviceAddress;
pub use error::{TelemetryError, TelemetryResult};
pub use rate_tracker::{RateSnapshot, RateTracker};
pub use recorder::{RecordingAggregator, RecordingState, RecordingSummary};
pub use types::{CalibrationStatus, Quaternion, SampleBatch, SensorSample};
