#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Settings schemas and calibration-point parsing for the sled engine.
//!
//! - `Settings` and sub-structs are deserialized from TOML and validated.
//! - Calibration-point CSV loader enforces headers and groups rows per
//!   sensor for downstream fitting.
use serde::Deserialize;
use serde::de::Deserializer;

/// Calibration-point CSV schema.
///
/// Expected headers:
/// sensor,raw,weight,unit
///
/// Example:
/// sensor,raw,weight,unit
/// 0,102.4,0.0,g
/// 0,455.1,500.0,g
#[derive(Debug, Deserialize, Clone)]
pub struct PointRow {
    pub sensor: usize,
    pub raw: f64,
    pub weight: f64,
    pub unit: String,
}

/// Sled geometry: where the four load cells sit and where the balanced
/// center of mass should be, both in platform centimeters.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Geometry {
    /// Load cell centers. Accepts either array-of-pairs
    /// `[[19.0, 0.0], ...]` or array-of-tables `[{ x = 19.0, y = 0.0 }, ...]`.
    #[serde(deserialize_with = "de_points")]
    pub sensor_positions: Vec<(f64, f64)>,
    pub ideal_com: (f64, f64),
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            sensor_positions: vec![(19.0, 0.0), (-19.0, 0.0), (-19.0, 26.5), (19.0, 26.5)],
            ideal_com: (0.0, 13.25),
        }
    }
}

/// One ballast tray: a rows x columns grid of cells, each able to hold a
/// single fixed-mass unit.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct TrayCfg {
    /// Disabled trays contribute no candidate slots.
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub rows: usize,
    pub columns: usize,
    /// Vertical offset of the tray's center row (cm).
    pub y_position: f64,
    pub cell_width: f64,
    pub cell_height: f64,
    pub wall_thickness: f64,
}

fn default_true() -> bool {
    true
}

impl TrayCfg {
    fn front_default() -> Self {
        Self {
            enabled: true,
            rows: 7,
            columns: 8,
            y_position: 24.5,
            cell_width: 3.5,
            cell_height: 2.2,
            wall_thickness: 0.3,
        }
    }

    fn back_default() -> Self {
        Self {
            enabled: true,
            rows: 6,
            columns: 8,
            y_position: 2.0,
            cell_width: 3.5,
            cell_height: 2.2,
            wall_thickness: 0.3,
        }
    }

    pub fn validate(&self, name: &str) -> eyre::Result<()> {
        if self.rows == 0 {
            eyre::bail!("trays.{name}.rows must be >= 1");
        }
        if self.columns == 0 {
            eyre::bail!("trays.{name}.columns must be >= 1");
        }
        if !self.cell_width.is_finite() || self.cell_width <= 0.0 {
            eyre::bail!("trays.{name}.cell_width must be > 0");
        }
        if !self.cell_height.is_finite() || self.cell_height <= 0.0 {
            eyre::bail!("trays.{name}.cell_height must be > 0");
        }
        if !self.wall_thickness.is_finite() || self.wall_thickness < 0.0 {
            eyre::bail!("trays.{name}.wall_thickness must be >= 0");
        }
        if !self.y_position.is_finite() {
            eyre::bail!("trays.{name}.y_position must be finite");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TraysCfg {
    #[serde(default = "TrayCfg::front_default")]
    pub front: TrayCfg,
    #[serde(default = "TrayCfg::back_default")]
    pub back: TrayCfg,
}

impl Default for TraysCfg {
    fn default() -> Self {
        Self {
            front: TrayCfg::front_default(),
            back: TrayCfg::back_default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OptimizerCfg {
    /// Operator bias added to the ideal COM before optimizing (cm).
    pub bias_x: f64,
    pub bias_y: f64,
    /// Total weight budget (sled plus ballast) in `max_weight_unit`.
    pub max_weight: f64,
    pub max_weight_unit: String,
    pub threshold_enabled: bool,
    /// Candidates below this percentage of the best improvement are dropped
    /// when `threshold_enabled` is set.
    pub threshold_percent: f64,
}

impl Default for OptimizerCfg {
    fn default() -> Self {
        Self {
            bias_x: 0.0,
            bias_y: 0.0,
            max_weight: 350.0,
            max_weight_unit: "lb".to_string(),
            threshold_enabled: false,
            threshold_percent: 2.5,
        }
    }
}

impl OptimizerCfg {
    /// Effect threshold as a fraction of the best improvement, or `None`
    /// when thresholding is disabled.
    pub fn threshold_fraction(&self) -> Option<f64> {
        self.threshold_enabled
            .then(|| self.threshold_percent / 100.0)
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Settings {
    pub geometry: Geometry,
    pub trays: TraysCfg,
    pub optimizer: OptimizerCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Settings, toml::de::Error> {
    toml::from_str::<Settings>(s)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PointToml {
    Pair((f64, f64)),
    Table { x: f64, y: f64 },
}

fn de_points<'de, D>(deserializer: D) -> Result<Vec<(f64, f64)>, D::Error>
where
    D: Deserializer<'de>,
{
    let items: Vec<PointToml> = Vec::deserialize(deserializer)?;
    Ok(items
        .into_iter()
        .map(|p| match p {
            PointToml::Pair(xy) => xy,
            PointToml::Table { x, y } => (x, y),
        })
        .collect())
}

impl Settings {
    pub fn validate(&self) -> eyre::Result<()> {
        // Geometry
        if self.geometry.sensor_positions.len() != 4 {
            eyre::bail!(
                "geometry.sensor_positions must list exactly 4 load cells, got {}",
                self.geometry.sensor_positions.len()
            );
        }
        for (i, (x, y)) in self.geometry.sensor_positions.iter().enumerate() {
            if !x.is_finite() || !y.is_finite() {
                eyre::bail!("geometry.sensor_positions[{i}] must be finite");
            }
        }
        if !self.geometry.ideal_com.0.is_finite() || !self.geometry.ideal_com.1.is_finite() {
            eyre::bail!("geometry.ideal_com must be finite");
        }

        // Trays
        self.trays.front.validate("front")?;
        self.trays.back.validate("back")?;

        // Optimizer
        if !self.optimizer.bias_x.is_finite() || !self.optimizer.bias_y.is_finite() {
            eyre::bail!("optimizer.bias_x/bias_y must be finite");
        }
        if !self.optimizer.max_weight.is_finite() || self.optimizer.max_weight <= 0.0 {
            eyre::bail!("optimizer.max_weight must be > 0");
        }
        if !matches!(
            self.optimizer.max_weight_unit.as_str(),
            "g" | "kg" | "oz" | "lb" | "lbs"
        ) {
            eyre::bail!(
                "optimizer.max_weight_unit must be one of g|kg|oz|lb, got {:?}",
                self.optimizer.max_weight_unit
            );
        }
        if !self.optimizer.threshold_percent.is_finite()
            || self.optimizer.threshold_percent <= 0.0
            || self.optimizer.threshold_percent > 100.0
        {
            eyre::bail!("optimizer.threshold_percent must be in (0, 100]");
        }

        // Logging: rotation strings are resolved by the consumer; unknown
        // values fall back to no rotation with a warning there.

        Ok(())
    }
}

/// Calibration points for one sensor, weights still in the unit recorded
/// in the file.
#[derive(Debug, Clone)]
pub struct SensorPoints {
    pub unit: String,
    /// (raw, weight) pairs in file order.
    pub points: Vec<(f64, f64)>,
}

impl Default for SensorPoints {
    fn default() -> Self {
        Self {
            unit: "g".to_string(),
            points: Vec::new(),
        }
    }
}

/// Load a calibration-point CSV and group rows by sensor index.
///
/// Rows for one sensor must share a unit; a sensor with no rows comes back
/// with an empty point list.
pub fn load_points_csv(path: &std::path::Path) -> eyre::Result<[SensorPoints; 4]> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open points CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["sensor", "raw", "weight", "unit"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "points CSV must have headers 'sensor,raw,weight,unit', got: {}",
            actual.join(",")
        );
    }

    let mut out: [SensorPoints; 4] = Default::default();
    for (idx, rec) in rdr.deserialize::<PointRow>().enumerate() {
        let row = match rec {
            Ok(row) => row,
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        };
        if row.sensor >= out.len() {
            eyre::bail!(
                "CSV row {}: sensor index {} out of range 0..=3",
                idx + 2,
                row.sensor
            );
        }
        if !row.raw.is_finite() || !row.weight.is_finite() {
            eyre::bail!("CSV row {}: raw/weight must be finite", idx + 2);
        }
        let slot = &mut out[row.sensor];
        if slot.points.is_empty() {
            slot.unit = row.unit;
        } else if slot.unit != row.unit {
            eyre::bail!(
                "CSV row {}: sensor {} mixes units {:?} and {:?}",
                idx + 2,
                row.sensor,
                slot.unit,
                row.unit
            );
        }
        slot.points.push((row.raw, row.weight));
    }
    Ok(out)
}
