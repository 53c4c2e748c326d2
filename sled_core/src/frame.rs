//! Tolerant parsing of transport frames.
//!
//! Sensor frames arrive as comma-separated fields, e.g.
//! `12.5,0.0,ERROR,3.25`. Lines without a comma are status traffic, not
//! sensor data.

use crate::types::SENSOR_COUNT;
use sled_traits::RawFrame;

/// Parse one transport line into sensor values.
///
/// Returns `None` for lines that are not sensor data (no comma). Fields that
/// read `ERROR` or fail to parse map to 0.0; frames shorter than four values
/// are padded with 0.0. Longer frames are returned in full, the consumer
/// keeps the first four.
pub fn parse_line(line: &str) -> Option<Vec<f64>> {
    if !line.contains(',') {
        return None;
    }
    let mut values: Vec<f64> = line
        .split(',')
        .map(|part| {
            let part = part.trim();
            if part == "ERROR" {
                0.0
            } else {
                part.parse::<f64>().unwrap_or(0.0)
            }
        })
        .collect();
    while values.len() < SENSOR_COUNT {
        values.push(0.0);
    }
    Some(values)
}

/// First four values as a raw frame, `None` when fewer are present.
pub fn first_four(values: &[f64]) -> Option<RawFrame> {
    match values {
        [a, b, c, d, ..] => Some([*a, *b, *c, *d]),
        _ => None,
    }
}
