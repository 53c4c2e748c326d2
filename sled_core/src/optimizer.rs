//! Greedy ballast placement over the tray slot grids.
//!
//! Every slot is scored by simulating one ballast unit at its center and
//! measuring how much the COM displacement shrinks. Candidates are taken
//! best-first until the next unit would blow the weight budget; the search
//! never backtracks. Deterministic for identical inputs: the sort is stable
//! and ties keep enumeration order (front tray before back, rows outer,
//! columns inner).

use serde::Serialize;
use sled_config::TrayCfg;

use crate::error::{LayoutError, Result};
use crate::types::Point;
use crate::units;

/// Mass of one ballast unit; every tray slot holds exactly one.
pub const EFFECT_WEIGHT_GRAMS: f64 = 113.0;

/// Snapshot of everything one layout computation needs. Owned by value so a
/// worker thread can run it without touching engine state.
#[derive(Debug, Clone)]
pub struct LayoutParams {
    pub sensor_weights: Vec<f64>,
    pub sensor_positions: Vec<Point>,
    pub ideal_com: Point,
    /// Operator bias added to the ideal COM before optimizing.
    pub bias: Point,
    pub front_tray: TrayCfg,
    pub back_tray: TrayCfg,
    pub max_weight: f64,
    pub max_weight_unit: String,
    /// Keep only candidates within this fraction of the best improvement.
    pub threshold: Option<f64>,
}

/// Result of one layout computation. Grids are rows x columns; disabled
/// trays and the no-budget early return leave them empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrayLayoutResult {
    pub front_tray: Vec<Vec<u8>>,
    pub back_tray: Vec<Vec<u8>>,
    pub final_com: Point,
    /// Euclidean distance from the (biased) ideal COM.
    pub displacement: f64,
    /// Initial sensor weight plus everything placed, grams.
    pub total_weight: f64,
    pub effect_map: EffectMaps,
}

/// Per-slot importance of the placed units, scaled to [0, 1] over the
/// occupied cells. Unoccupied cells stay 0.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EffectMaps {
    pub front: Vec<Vec<f64>>,
    pub back: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrayId {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    tray: TrayId,
    row: usize,
    col: usize,
    pos: Point,
    percent: f64,
}

/// Compute a ballast layout that minimizes COM displacement within the
/// weight budget.
pub fn compute_optimal_layout(params: &LayoutParams) -> Result<TrayLayoutResult> {
    validate(params)?;

    let ideal = Point::new(
        params.ideal_com.x + params.bias.x,
        params.ideal_com.y + params.bias.y,
    );
    let max_weight_g = units::to_grams(params.max_weight, &params.max_weight_unit);
    let initial_weight: f64 = params.sensor_weights.iter().sum();
    let available = max_weight_g - initial_weight;
    tracing::debug!(initial_weight, max_weight_g, available, "layout requested");

    if available <= 0.0 {
        tracing::warn!(
            initial_weight,
            max_weight_g,
            "at or over the weight budget, nothing to place"
        );
        let com = weighted_com(&params.sensor_weights, &params.sensor_positions);
        return Ok(TrayLayoutResult {
            front_tray: Vec::new(),
            back_tray: Vec::new(),
            final_com: com,
            displacement: com.distance_to(ideal),
            total_weight: initial_weight,
            effect_map: EffectMaps::default(),
        });
    }

    let original_com = weighted_com(&params.sensor_weights, &params.sensor_positions);
    let original_disp = original_com.distance_to(ideal);

    let mut front_grid = grid::<u8>(&params.front_tray);
    let mut back_grid = grid::<u8>(&params.back_tray);
    let mut effects = EffectMaps {
        front: grid::<f64>(&params.front_tray),
        back: grid::<f64>(&params.back_tray),
    };

    let mut slots: Vec<Slot> = Vec::new();
    for (tray_id, tray) in [
        (TrayId::Front, &params.front_tray),
        (TrayId::Back, &params.back_tray),
    ] {
        if tray.enabled {
            enumerate_slots(tray_id, tray, &mut slots);
        }
    }

    // Score every slot by simulating one unit there.
    let mut candidates: Vec<Slot> = Vec::new();
    let mut max_improvement = 0.0f64;
    for mut slot in slots {
        let test_com = com_with_unit(&params.sensor_weights, &params.sensor_positions, slot.pos);
        let new_disp = test_com.distance_to(ideal);
        let improvement = original_disp - new_disp;
        let percent = if original_disp == 0.0 {
            0.0
        } else {
            improvement / original_disp
        };
        if percent > max_improvement {
            max_improvement = percent;
        }
        if percent > 0.0 {
            slot.percent = percent;
            candidates.push(slot);
        }
    }

    // Stable descending sort keeps enumeration order as the tie-break.
    candidates.sort_by(|a, b| b.percent.total_cmp(&a.percent));

    if let Some(threshold) = params.threshold
        && threshold > 0.0
        && max_improvement > 0.0
    {
        let cutoff = max_improvement * threshold;
        let before = candidates.len();
        candidates.retain(|s| s.percent >= cutoff);
        tracing::debug!(
            cutoff,
            dropped = before - candidates.len(),
            "effect threshold applied"
        );
    }

    let max_units = (available / EFFECT_WEIGHT_GRAMS) as i64;
    tracing::debug!(max_units, available, "unit budget before placement");

    let mut added_weight = 0.0f64;
    let mut used: Vec<Slot> = Vec::new();
    for slot in candidates {
        if added_weight + EFFECT_WEIGHT_GRAMS > available {
            tracing::debug!(placed = used.len(), "weight budget reached");
            break;
        }
        match slot.tray {
            TrayId::Front => {
                front_grid[slot.row][slot.col] = 1;
                effects.front[slot.row][slot.col] = slot.percent;
            }
            TrayId::Back => {
                back_grid[slot.row][slot.col] = 1;
                effects.back[slot.row][slot.col] = slot.percent;
            }
        }
        added_weight += EFFECT_WEIGHT_GRAMS;
        used.push(slot);
    }

    // Normalize occupied cells against the strongest placed slot.
    let max_effect = used.iter().map(|s| s.percent).fold(0.0f64, f64::max);
    if max_effect > 0.0 {
        for slot in &used {
            let cell = match slot.tray {
                TrayId::Front => &mut effects.front[slot.row][slot.col],
                TrayId::Back => &mut effects.back[slot.row][slot.col],
            };
            if *cell > 0.0 {
                *cell /= max_effect;
            }
        }
    }

    let final_com = com_with_units(&params.sensor_weights, &params.sensor_positions, &used);
    let final_disp = final_com.distance_to(ideal);
    let total_weight = initial_weight + added_weight;
    tracing::debug!(
        placed = used.len(),
        total_weight,
        displacement = final_disp,
        "layout computed"
    );

    Ok(TrayLayoutResult {
        front_tray: front_grid,
        back_tray: back_grid,
        final_com,
        displacement: final_disp,
        total_weight,
        effect_map: effects,
    })
}

fn validate(params: &LayoutParams) -> Result<()> {
    if params.sensor_weights.is_empty()
        || params.sensor_weights.len() != params.sensor_positions.len()
    {
        return Err(LayoutError::Configuration(format!(
            "sensor weights ({}) and positions ({}) must be non-empty and equal length",
            params.sensor_weights.len(),
            params.sensor_positions.len()
        ))
        .into());
    }
    for (name, tray) in [("front", &params.front_tray), ("back", &params.back_tray)] {
        // only enabled trays contribute geometry
        if tray.enabled {
            tray_geometry(name, tray)?;
        }
    }
    Ok(())
}

fn tray_geometry(name: &str, tray: &TrayCfg) -> Result<()> {
    if tray.rows == 0 || tray.columns == 0 {
        return Err(
            LayoutError::Configuration(format!("{name} tray grid must be at least 1x1")).into(),
        );
    }
    if !tray.cell_width.is_finite()
        || tray.cell_width <= 0.0
        || !tray.cell_height.is_finite()
        || tray.cell_height <= 0.0
    {
        return Err(LayoutError::Configuration(format!(
            "{name} tray cell dimensions must be positive"
        ))
        .into());
    }
    if !tray.wall_thickness.is_finite() || tray.wall_thickness < 0.0 {
        return Err(LayoutError::Configuration(format!(
            "{name} tray wall thickness must be non-negative"
        ))
        .into());
    }
    if !tray.y_position.is_finite() {
        return Err(
            LayoutError::Configuration(format!("{name} tray y position must be finite")).into(),
        );
    }
    Ok(())
}

fn grid<T: Clone + Default>(tray: &TrayCfg) -> Vec<Vec<T>> {
    if tray.enabled {
        vec![vec![T::default(); tray.columns]; tray.rows]
    } else {
        Vec::new()
    }
}

/// Slot centers on a grid spaced by cell size plus wall thickness, centered
/// on the tray's middle row and column, shifted vertically by `y_position`.
fn enumerate_slots(tray_id: TrayId, tray: &TrayCfg, out: &mut Vec<Slot>) {
    let x_spacing = tray.cell_width + tray.wall_thickness;
    let y_spacing = tray.cell_height + tray.wall_thickness;
    let center_row = (tray.rows as f64 - 1.0) / 2.0;
    let center_col = (tray.columns as f64 - 1.0) / 2.0;
    for row in 0..tray.rows {
        for col in 0..tray.columns {
            let x = (col as f64 - center_col) * x_spacing;
            let y = tray.y_position + (row as f64 - center_row) * y_spacing;
            out.push(Slot {
                tray: tray_id,
                row,
                col,
                pos: Point::new(x, y),
                percent: 0.0,
            });
        }
    }
}

/// Weighted centroid as the optimizer sees it. Zero total weight maps to
/// the origin, unlike the live engine's geometric-centroid fallback.
fn weighted_com(weights: &[f64], positions: &[Point]) -> Point {
    let total: f64 = weights.iter().sum();
    if total == 0.0 {
        return Point::ORIGIN;
    }
    let x = weights
        .iter()
        .zip(positions)
        .map(|(w, p)| w * p.x)
        .sum::<f64>()
        / total;
    let y = weights
        .iter()
        .zip(positions)
        .map(|(w, p)| w * p.y)
        .sum::<f64>()
        / total;
    Point::new(x, y)
}

/// Centroid with one extra ballast unit at `extra`.
fn com_with_unit(weights: &[f64], positions: &[Point], extra: Point) -> Point {
    let total: f64 = weights.iter().sum::<f64>() + EFFECT_WEIGHT_GRAMS;
    if total == 0.0 {
        return Point::ORIGIN;
    }
    let x = (weights
        .iter()
        .zip(positions)
        .map(|(w, p)| w * p.x)
        .sum::<f64>()
        + EFFECT_WEIGHT_GRAMS * extra.x)
        / total;
    let y = (weights
        .iter()
        .zip(positions)
        .map(|(w, p)| w * p.y)
        .sum::<f64>()
        + EFFECT_WEIGHT_GRAMS * extra.y)
        / total;
    Point::new(x, y)
}

/// Centroid with every placed unit included.
fn com_with_units(weights: &[f64], positions: &[Point], used: &[Slot]) -> Point {
    let mut total: f64 = weights.iter().sum();
    let mut wx: f64 = weights.iter().zip(positions).map(|(w, p)| w * p.x).sum();
    let mut wy: f64 = weights.iter().zip(positions).map(|(w, p)| w * p.y).sum();
    for slot in used {
        total += EFFECT_WEIGHT_GRAMS;
        wx += EFFECT_WEIGHT_GRAMS * slot.pos.x;
        wy += EFFECT_WEIGHT_GRAMS * slot.pos.y;
    }
    if total == 0.0 {
        return Point::ORIGIN;
    }
    Point::new(wx / total, wy / total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tray(rows: usize, columns: usize, y_position: f64) -> TrayCfg {
        TrayCfg {
            enabled: true,
            rows,
            columns,
            y_position,
            cell_width: 3.5,
            cell_height: 2.2,
            wall_thickness: 0.3,
        }
    }

    #[test]
    fn slot_grid_is_centered_on_the_tray() {
        let mut slots = Vec::new();
        enumerate_slots(TrayId::Front, &tray(3, 3, 10.0), &mut slots);
        assert_eq!(slots.len(), 9);

        // rows outer, columns inner
        assert_eq!((slots[0].row, slots[0].col), (0, 0));
        assert_eq!((slots[1].row, slots[1].col), (0, 1));
        assert_eq!((slots[3].row, slots[3].col), (1, 0));

        // the middle slot sits on the tray reference point
        let center = slots[4];
        assert!((center.pos.x - 0.0).abs() < 1e-12);
        assert!((center.pos.y - 10.0).abs() < 1e-12);

        // spacing is cell size plus wall thickness
        assert!((slots[1].pos.x - slots[0].pos.x - 3.8).abs() < 1e-12);
        assert!((slots[3].pos.y - slots[0].pos.y - 2.5).abs() < 1e-12);
    }

    #[test]
    fn optimizer_com_maps_zero_weight_to_origin() {
        let com = weighted_com(&[0.0, 0.0], &[Point::new(1.0, 1.0), Point::new(3.0, 3.0)]);
        assert_eq!(com, Point::ORIGIN);
    }

    #[test]
    fn mismatched_inputs_are_a_configuration_error() {
        let params = LayoutParams {
            sensor_weights: vec![1.0, 2.0],
            sensor_positions: vec![Point::ORIGIN],
            ideal_com: Point::ORIGIN,
            bias: Point::ORIGIN,
            front_tray: tray(2, 2, 24.5),
            back_tray: tray(2, 2, 2.0),
            max_weight: 1000.0,
            max_weight_unit: "g".to_string(),
            threshold: None,
        };
        let err = compute_optimal_layout(&params).unwrap_err();
        assert!(err.downcast_ref::<LayoutError>().is_some());
    }
}
