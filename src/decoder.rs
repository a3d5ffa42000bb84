//! Line-oriented telemetry decoding.
//!
//! Each record is ten whitespace-separated numeric tokens in fixed order:
//! `id timestamp w x y z sys_cal gyro_cal accel_cal mag_cal`. A record with
//! the wrong field count or any unparsable token is dropped without touching
//! the rest of the payload; a corrupt line must never stall the stream.

use crate::types::{CalibrationStatus, Quaternion, SensorSample};

/// Decode a raw payload holding zero or more newline-terminated records.
/// Output order matches input line order; blank and malformed lines yield
/// nothing.
pub fn decode_payload(payload: &str) -> Vec<SensorSample> {
    payload.lines().filter_map(decode_line).collect()
}

/// Decode a single record line. Returns `None` for blank or malformed lines.
pub fn decode_line(line: &str) -> Option<SensorSample> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let mut tokens = line.split_whitespace();
    let sensor_id = tokens.next()?.parse().ok()?;
    let timestamp_ticks = tokens.next()?.parse().ok()?;
    let w = tokens.next()?.parse().ok()?;
    let x = tokens.next()?.parse().ok()?;
    let y = tokens.next()?.parse().ok()?;
    let z = tokens.next()?.parse().ok()?;
    let system = tokens.next()?.parse().ok()?;
    let gyro = tokens.next()?.parse().ok()?;
    let accel = tokens.next()?.parse().ok()?;
    let mag = tokens.next()?.parse().ok()?;
    if tokens.next().is_some() {
        return None;
    }

    Some(SensorSample::new(
        sensor_id,
        timestamp_ticks,
        Quaternion::new(w, x, y, z),
        CalibrationStatus::new(system, gyro, accel, mag),
    ))
}
