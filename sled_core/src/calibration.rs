//! Per-sensor linear calibration: fitting, application, persistence.
//!
//! Each of the four load cells carries a `weight_g = slope * raw + intercept`
//! model fitted by ordinary least squares from recorded calibration points.
//! Profiles round-trip through a versioned JSON file; the loader also accepts
//! the v1 layout that predates the slope/intercept form.

use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CalibrationError, Result};
use crate::types::SENSOR_COUNT;
use crate::units;

/// Current on-disk format version.
pub const FORMAT_VERSION: &str = "2.0";

/// One recorded calibration point: a raw reading against the known weight in
/// the unit it was entered with.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationPoint {
    pub raw: f64,
    pub weight: f64,
    pub unit: String,
}

impl CalibrationPoint {
    pub fn new(raw: f64, weight: f64, unit: impl Into<String>) -> Self {
        Self {
            raw,
            weight,
            unit: unit.into(),
        }
    }
}

/// Linear raw-to-grams model for one sensor plus the points it was fitted
/// from. Freshly fitted sensors always store `unit` "g"; legacy files may
/// carry another unit, kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorCalibration {
    pub slope: f64,
    pub intercept: f64,
    pub unit: String,
    /// Fit quality, informational only. Not persisted; 0 after a load.
    pub r_squared: f64,
    pub calibration_points: Vec<CalibrationPoint>,
}

impl Default for SensorCalibration {
    fn default() -> Self {
        Self::identity()
    }
}

impl SensorCalibration {
    /// The do-nothing model: slope 1, intercept 0, no points.
    pub fn identity() -> Self {
        Self {
            slope: 1.0,
            intercept: 0.0,
            unit: "g".to_string(),
            r_squared: 0.0,
            calibration_points: Vec::new(),
        }
    }

    fn from_record(rec: SensorRecord) -> Self {
        Self {
            slope: rec.slope,
            intercept: rec.intercept,
            unit: rec.unit,
            r_squared: 0.0,
            calibration_points: rec
                .calibration_points
                .into_iter()
                .map(|(raw, weight, unit)| CalibrationPoint { raw, weight, unit })
                .collect(),
        }
    }

    fn from_legacy(entry: LegacyEntry) -> Self {
        let (zero_offset, scale_factor, unit) = entry.into_parts();
        // (raw - offset) * scale rewritten as slope * raw + intercept
        Self {
            slope: scale_factor,
            intercept: -zero_offset * scale_factor,
            unit,
            r_squared: 0.0,
            calibration_points: Vec::new(),
        }
    }
}

/// The full four-sensor calibration set with file bookkeeping.
#[derive(Debug, Clone)]
pub struct CalibrationProfile {
    sensors: [SensorCalibration; SENSOR_COUNT],
    filename: Option<String>,
    loaded: bool,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationProfile {
    pub fn new() -> Self {
        Self {
            sensors: std::array::from_fn(|_| SensorCalibration::identity()),
            filename: None,
            loaded: false,
        }
    }

    pub fn sensor(&self, index: usize) -> Option<&SensorCalibration> {
        self.sensors.get(index)
    }

    pub fn sensors(&self) -> &[SensorCalibration; SENSOR_COUNT] {
        &self.sensors
    }

    /// Base name of the file this profile was last saved to or loaded from.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Apply each sensor's linear model and convert the result from grams
    /// into `unit`. Indices past the four calibrated sensors pass through
    /// the linear step unchanged; the unit conversion still applies. Output
    /// length always matches input length.
    pub fn apply(&self, values: &[f64], unit: &str) -> Vec<f64> {
        values
            .iter()
            .enumerate()
            .map(|(i, &raw)| {
                let grams = match self.sensors.get(i) {
                    Some(cal) => cal.slope * raw + cal.intercept,
                    None => raw,
                };
                units::from_grams(grams, unit)
            })
            .collect()
    }

    /// Fit sensor `index` by least squares over `points`.
    ///
    /// Fewer than two points, or a degenerate regression, resets the sensor
    /// to the identity calibration before the error is returned. On success
    /// the point list is stored verbatim for later re-fits.
    pub fn fit(&mut self, index: usize, points: &[CalibrationPoint]) -> Result<&SensorCalibration> {
        if index >= self.sensors.len() {
            eyre::bail!(
                "sensor index {index} out of range 0..={}",
                self.sensors.len() - 1
            );
        }
        if points.len() < 2 {
            self.sensors[index] = SensorCalibration::identity();
            tracing::warn!(
                sensor = index,
                got = points.len(),
                "not enough calibration points, sensor reset to identity"
            );
            return Err(CalibrationError::InsufficientPoints { got: points.len() }.into());
        }

        match fit_line(points) {
            Ok((slope, intercept, r_squared)) => {
                tracing::debug!(sensor = index, slope, intercept, r_squared, "sensor fitted");
                self.sensors[index] = SensorCalibration {
                    slope,
                    intercept,
                    unit: "g".to_string(),
                    r_squared,
                    calibration_points: points.to_vec(),
                };
                Ok(&self.sensors[index])
            }
            Err(e) => {
                self.sensors[index] = SensorCalibration::identity();
                tracing::warn!(
                    sensor = index,
                    error = %e,
                    "regression failed, sensor reset to identity"
                );
                Err(e.into())
            }
        }
    }

    /// True once a profile has been loaded from a file, or any sensor
    /// deviates from identity, or any sensor has recorded points.
    pub fn is_calibrated(&self) -> bool {
        if self.loaded {
            return true;
        }
        self.sensors
            .iter()
            .any(|c| c.slope != 1.0 || c.intercept != 0.0 || !c.calibration_points.is_empty())
    }

    /// Write the profile as version 2.0 JSON. `r_squared` is intentionally
    /// left out of the file.
    pub fn save_to_file(&mut self, path: &Path) -> Result<()> {
        let records: Vec<SensorRecord> = self
            .sensors
            .iter()
            .map(|c| SensorRecord {
                slope: c.slope,
                intercept: c.intercept,
                unit: c.unit.clone(),
                calibration_points: c
                    .calibration_points
                    .iter()
                    .map(|p| (p.raw, p.weight, p.unit.clone()))
                    .collect(),
            })
            .collect();
        let file = ProfileFile {
            version: FORMAT_VERSION.to_string(),
            calibrations: records,
        };

        let f = std::fs::File::create(path)
            .map_err(|e| eyre::eyre!("create calibration file {:?}: {}", path, e))?;
        serde_json::to_writer_pretty(f, &file)
            .map_err(|e| eyre::eyre!("write calibration file {:?}: {}", path, e))?;

        self.filename = base_name(path);
        tracing::debug!(file = ?path, "calibration saved");
        Ok(())
    }

    /// Load a profile from JSON text, accepting the current versioned layout
    /// and the legacy v1 forms (a bare list, or a versioned dict whose
    /// entries are `{zero_offset|offset, scale_factor|scale, unit}` records
    /// or positional `[offset, scale(, unit)]` arrays). The result is padded
    /// or truncated to exactly four sensors.
    pub fn load_from_str(&mut self, text: &str) -> Result<()> {
        let data: serde_json::Value =
            serde_json::from_str(text).map_err(|e| eyre::eyre!("parse calibration JSON: {e}"))?;

        let sensors = match &data {
            serde_json::Value::Object(map) if map.contains_key("version") => {
                let version = map
                    .get("version")
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| eyre::eyre!("version must be a string"))?;
                let calibrations = map
                    .get("calibrations")
                    .cloned()
                    .unwrap_or_else(|| serde_json::Value::Array(Vec::new()));
                if version.starts_with('2') {
                    let records: Vec<SensorRecord> = serde_json::from_value(calibrations)
                        .map_err(|e| eyre::eyre!("bad v2 calibrations: {e}"))?;
                    records
                        .into_iter()
                        .map(SensorCalibration::from_record)
                        .collect()
                } else {
                    let entries: Vec<serde_json::Value> = serde_json::from_value(calibrations)
                        .map_err(|e| eyre::eyre!("bad v1 calibrations: {e}"))?;
                    legacy_sensors(entries)
                }
            }
            serde_json::Value::Array(items) => legacy_sensors(items.clone()),
            _ => eyre::bail!("unknown calibration format"),
        };

        self.sensors = ensure_four(sensors);
        self.loaded = true;
        Ok(())
    }

    /// `load_from_str` plus the file bookkeeping: reads `path`, records its
    /// base name as the profile's filename.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("read calibration file {:?}: {}", path, e))?;
        self.load_from_str(&text)
            .wrap_err_with(|| format!("calibration file {path:?}"))?;
        self.filename = base_name(path);
        tracing::debug!(file = ?path, "calibration loaded");
        Ok(())
    }
}

/// Ordinary least squares over points converted to grams. Returns
/// (slope, intercept, r_squared); all-equal weights define r_squared as 0.
fn fit_line(
    points: &[CalibrationPoint],
) -> std::result::Result<(f64, f64, f64), CalibrationError> {
    let pts: Vec<(f64, f64)> = points
        .iter()
        .map(|p| (p.raw, units::to_grams(p.weight, &p.unit)))
        .collect();
    for &(x, y) in &pts {
        if !x.is_finite() || !y.is_finite() {
            return Err(CalibrationError::Fit(format!(
                "non-finite calibration point ({x}, {y})"
            )));
        }
    }

    let n = pts.len() as f64;
    let mean_x = pts.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pts.iter().map(|p| p.1).sum::<f64>() / n;

    let mut sxx = 0.0f64;
    let mut sxy = 0.0f64;
    for &(x, y) in &pts {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
    }
    if !sxx.is_finite() || sxx == 0.0 {
        return Err(CalibrationError::Fit(
            "cannot determine slope (degenerate raw variance)".to_string(),
        ));
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    if !slope.is_finite() || !intercept.is_finite() {
        return Err(CalibrationError::Fit(
            "regression produced non-finite parameters".to_string(),
        ));
    }

    let mut ss_tot = 0.0f64;
    let mut ss_res = 0.0f64;
    for &(x, y) in &pts {
        let pred = slope * x + intercept;
        ss_tot += (y - mean_y) * (y - mean_y);
        ss_res += (y - pred) * (y - pred);
    }
    let r_squared = if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    };

    Ok((slope, intercept, r_squared))
}

fn legacy_sensors(entries: Vec<serde_json::Value>) -> Vec<SensorCalibration> {
    entries
        .into_iter()
        .map(|v| match serde_json::from_value::<LegacyEntry>(v) {
            Ok(entry) => SensorCalibration::from_legacy(entry),
            // entries in no recognized shape fall back to identity
            Err(_) => SensorCalibration::identity(),
        })
        .collect()
}

/// Pad with identity entries or drop extras so exactly four sensors remain.
fn ensure_four(sensors: Vec<SensorCalibration>) -> [SensorCalibration; SENSOR_COUNT] {
    if sensors.len() > SENSOR_COUNT {
        tracing::warn!(got = sensors.len(), "trimming excess calibration entries");
    }
    let mut out: [SensorCalibration; SENSOR_COUNT] =
        std::array::from_fn(|_| SensorCalibration::identity());
    for (slot, cal) in out.iter_mut().zip(sensors) {
        *slot = cal;
    }
    out
}

fn base_name(path: &Path) -> Option<String> {
    path.file_name().map(|s| s.to_string_lossy().into_owned())
}

#[derive(Debug, Serialize, Deserialize)]
struct ProfileFile {
    version: String,
    #[serde(default)]
    calibrations: Vec<SensorRecord>,
}

/// v2 on-disk sensor record; missing fields fall back to identity values.
#[derive(Debug, Serialize, Deserialize)]
struct SensorRecord {
    #[serde(default = "default_slope")]
    slope: f64,
    #[serde(default)]
    intercept: f64,
    #[serde(default = "default_unit")]
    unit: String,
    #[serde(default)]
    calibration_points: Vec<(f64, f64, String)>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyEntry {
    Triple(f64, f64, String),
    Pair(f64, f64),
    Record {
        #[serde(default, alias = "offset")]
        zero_offset: f64,
        #[serde(default = "default_slope", alias = "scale")]
        scale_factor: f64,
        #[serde(default = "default_unit")]
        unit: String,
    },
}

impl LegacyEntry {
    /// (zero_offset, scale_factor, unit) regardless of spelling.
    fn into_parts(self) -> (f64, f64, String) {
        match self {
            LegacyEntry::Triple(offset, scale, unit) => (offset, scale, unit),
            LegacyEntry::Pair(offset, scale) => (offset, scale, "g".to_string()),
            LegacyEntry::Record {
                zero_offset,
                scale_factor,
                unit,
            } => (zero_offset, scale_factor, unit),
        }
    }
}

fn default_slope() -> f64 {
    1.0
}

fn default_unit() -> String {
    "g".to_string()
}
