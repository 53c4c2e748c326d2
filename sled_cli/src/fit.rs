//! The `fit` command: points CSV in, versioned profile JSON out.

use eyre::{Result, WrapErr};
use sled_core::calibration::{CalibrationPoint, CalibrationProfile};
use std::path::Path;

use crate::cli::json_mode;

pub fn run_fit(points: &Path, out: &Path) -> Result<()> {
    let per_sensor = sled_config::load_points_csv(points)?;

    let mut profile = CalibrationProfile::new();
    for (index, sensor) in per_sensor.iter().enumerate() {
        if sensor.points.is_empty() {
            tracing::warn!(sensor = index, "no points recorded, sensor stays identity");
            continue;
        }
        let pts: Vec<CalibrationPoint> = sensor
            .points
            .iter()
            .map(|&(raw, weight)| CalibrationPoint::new(raw, weight, sensor.unit.clone()))
            .collect();
        profile
            .fit(index, &pts)
            .wrap_err_with(|| format!("fit sensor {index}"))?;
    }
    profile
        .save_to_file(out)
        .wrap_err_with(|| format!("write profile {out:?}"))?;

    if json_mode() {
        let sensors: Vec<serde_json::Value> = profile
            .sensors()
            .iter()
            .enumerate()
            .map(|(i, cal)| {
                serde_json::json!({
                    "sensor": i,
                    "slope": cal.slope,
                    "intercept": cal.intercept,
                    "r_squared": cal.r_squared,
                    "points": cal.calibration_points.len(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::json!({ "sensors": sensors, "file": out.display().to_string() })
        );
    } else {
        for (i, cal) in profile.sensors().iter().enumerate() {
            if cal.calibration_points.is_empty() {
                println!("sensor {i}: identity (no points)");
            } else {
                println!(
                    "sensor {i}: slope {:.6}, intercept {:.6}, r2 {:.4} ({} points)",
                    cal.slope,
                    cal.intercept,
                    cal.r_squared,
                    cal.calibration_points.len()
                );
            }
        }
        println!("wrote {}", out.display());
    }
    Ok(())
}
