//! Live weight-distribution state: tare, COM, displacement, notifications.
//!
//! The engine is single-writer. Every mutation runs synchronously and emits
//! its notifications before returning; subscribers on other threads receive
//! them in order over a crossbeam channel. Within one logical update the COM
//! event always precedes the displacement event, and a geometry change is
//! announced after both.

use crossbeam_channel as xch;
use sled_config::{Geometry, OptimizerCfg, TraysCfg};

use crate::calibration::CalibrationProfile;
use crate::error::{EngineError, Result};
use crate::events::EngineEvent;
use crate::frame;
use crate::optimizer::LayoutParams;
use crate::types::{Point, SENSOR_COUNT};
use crate::view::{self, ViewTransform};
use crate::worker::{self, LayoutJob};

/// Weight-distribution engine over four load cells.
///
/// Holds the calibrated weights, the cell positions, the ideal COM and the
/// derived actual COM and displacement. All geometry is injected; there are
/// no built-in positions.
#[derive(Debug)]
pub struct DistributionEngine {
    calibration: Option<CalibrationProfile>,
    weights: [f64; SENSOR_COUNT],
    positions: [Point; SENSOR_COUNT],
    ideal_com: Point,
    actual_com: Point,
    displacement: Point,
    /// Calibrated grams of the most recent accepted sample, pre-tare.
    last_calibrated: [f64; SENSOR_COUNT],
    /// Stored tare baseline. `None` until the first capture; cleared tare is
    /// the zero vector, not `None`.
    tare: Option<[f64; SENSOR_COUNT]>,
    subscribers: Vec<xch::Sender<EngineEvent>>,
}

impl Default for DistributionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DistributionEngine {
    /// An engine with zeroed state. Positions and the ideal COM arrive via
    /// `with_geometry` or the setters.
    pub fn new() -> Self {
        Self {
            calibration: None,
            weights: [0.0; SENSOR_COUNT],
            positions: [Point::ORIGIN; SENSOR_COUNT],
            ideal_com: Point::ORIGIN,
            actual_com: Point::ORIGIN,
            displacement: Point::ORIGIN,
            last_calibrated: [0.0; SENSOR_COUNT],
            tare: None,
            subscribers: Vec::new(),
        }
    }

    /// An engine seeded from validated geometry settings. No events fire;
    /// the first sample update triggers the initial COM computation.
    pub fn with_geometry(geometry: &Geometry) -> Result<Self> {
        if geometry.sensor_positions.len() != SENSOR_COUNT {
            eyre::bail!(
                "geometry must provide exactly {SENSOR_COUNT} sensor positions, got {}",
                geometry.sensor_positions.len()
            );
        }
        let mut engine = Self::new();
        for (slot, &(x, y)) in engine.positions.iter_mut().zip(&geometry.sensor_positions) {
            *slot = Point::new(x, y);
        }
        engine.ideal_com = Point::from(geometry.ideal_com);
        Ok(engine)
    }

    pub fn set_calibration(&mut self, profile: CalibrationProfile) {
        self.calibration = Some(profile);
    }

    pub fn calibration(&self) -> Option<&CalibrationProfile> {
        self.calibration.as_ref()
    }

    /// Register a listener for engine events. The channel is unbounded;
    /// dropped receivers are pruned on the next broadcast.
    pub fn subscribe(&mut self) -> xch::Receiver<EngineEvent> {
        let (tx, rx) = xch::unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn weights(&self) -> &[f64; SENSOR_COUNT] {
        &self.weights
    }

    pub fn positions(&self) -> &[Point; SENSOR_COUNT] {
        &self.positions
    }

    pub fn ideal_com(&self) -> Point {
        self.ideal_com
    }

    pub fn actual_com(&self) -> Point {
        self.actual_com
    }

    pub fn displacement(&self) -> Point {
        self.displacement
    }

    pub fn tare(&self) -> Option<&[f64; SENSOR_COUNT]> {
        self.tare.as_ref()
    }

    pub fn last_calibrated(&self) -> &[f64; SENSOR_COUNT] {
        &self.last_calibrated
    }

    /// Replace the cell positions. The COM is recomputed even when the
    /// weights have not changed; the geometry event fires last.
    pub fn set_sensor_positions(&mut self, positions: [Point; SENSOR_COUNT]) {
        self.positions = positions;
        self.calculate_com();
        self.broadcast(&EngineEvent::GeometryChanged);
    }

    /// Replace the ideal COM. Only the displacement is recomputed, and only
    /// once an actual COM exists.
    pub fn set_ideal_com(&mut self, pos: Point) {
        self.ideal_com = pos;
        if self.actual_com != Point::ORIGIN {
            self.calculate_displacement();
        }
    }

    /// Feed one sensor sample.
    ///
    /// Fewer than four values is a logged no-op. `pre_calibrated` values are
    /// taken as grams; otherwise the calibration profile converts them (or
    /// they pass through when none is set). An explicit `tare` of length >= 4
    /// wins over the stored baseline; a shorter one is ignored. With a tare
    /// in effect, `weight = max(0, calibrated - tare)`. Without one,
    /// pre-calibrated values are sign-folded with `abs` while raw-path values
    /// are clamped at zero. The asymmetry is intentional and pinned by tests.
    pub fn update_sensor_data(
        &mut self,
        values: &[f64],
        tare: Option<&[f64]>,
        pre_calibrated: bool,
    ) {
        if values.len() < SENSOR_COUNT {
            let err = EngineError::InputSize {
                got: values.len(),
                want: SENSOR_COUNT,
            };
            tracing::warn!(%err, "sample dropped");
            return;
        }

        let mut calibrated = [0.0f64; SENSOR_COUNT];
        if pre_calibrated {
            calibrated.copy_from_slice(&values[..SENSOR_COUNT]);
        } else if let Some(profile) = &self.calibration {
            let grams = profile.apply(&values[..SENSOR_COUNT], "g");
            calibrated.copy_from_slice(&grams);
        } else {
            calibrated.copy_from_slice(&values[..SENSOR_COUNT]);
        }
        self.last_calibrated = calibrated;

        let effective = tare.and_then(frame::first_four).or(self.tare);
        match effective {
            Some(t) => {
                for (w, (cal, base)) in self.weights.iter_mut().zip(calibrated.iter().zip(&t)) {
                    *w = (cal - base).max(0.0);
                }
            }
            None => {
                for (w, cal) in self.weights.iter_mut().zip(&calibrated) {
                    *w = if pre_calibrated { cal.abs() } else { cal.max(0.0) };
                }
            }
        }

        self.calculate_com();
    }

    /// Snapshot the last calibrated grams vector as the tare baseline and
    /// return it.
    pub fn capture_tare(&mut self) -> [f64; SENSOR_COUNT] {
        self.tare = Some(self.last_calibrated);
        tracing::debug!(tare = ?self.last_calibrated, "tare captured");
        self.last_calibrated
    }

    /// Reset the tare baseline to the zero vector.
    pub fn clear_tare(&mut self) {
        self.tare = Some([0.0; SENSOR_COUNT]);
        tracing::debug!("tare cleared");
    }

    /// Recompute the actual COM from the current weights and positions.
    ///
    /// Zero (or negative) total weight falls back to the geometric center of
    /// the cell positions. Both paths emit the COM event and then recompute
    /// the displacement.
    pub fn calculate_com(&mut self) {
        let total: f64 = self.weights.iter().sum();
        if total <= 0.0 {
            let n = SENSOR_COUNT as f64;
            let cx = self.positions.iter().map(|p| p.x).sum::<f64>() / n;
            let cy = self.positions.iter().map(|p| p.y).sum::<f64>() / n;
            self.actual_com = Point::new(cx, cy);
            tracing::trace!(com = ?self.actual_com, "no load, geometric center used");
            self.broadcast(&EngineEvent::ComUpdated(self.actual_com));
            self.calculate_displacement();
            return;
        }

        let wx: f64 = self
            .weights
            .iter()
            .zip(&self.positions)
            .map(|(w, p)| w * p.x)
            .sum();
        let wy: f64 = self
            .weights
            .iter()
            .zip(&self.positions)
            .map(|(w, p)| w * p.y)
            .sum();
        self.actual_com = Point::new(wx / total, wy / total);
        tracing::trace!(com = ?self.actual_com, total, "com updated");
        self.broadcast(&EngineEvent::ComUpdated(self.actual_com));
        self.calculate_displacement();
    }

    /// Recompute displacement = actual COM - ideal COM and emit it.
    pub fn calculate_displacement(&mut self) {
        self.displacement = Point::new(
            self.actual_com.x - self.ideal_com.x,
            self.actual_com.y - self.ideal_com.y,
        );
        self.broadcast(&EngineEvent::DisplacementUpdated(self.displacement));
    }

    /// Fit the known points (cells, plus each COM when non-origin) into a
    /// view of the given size.
    pub fn display_scaling(
        &self,
        view_width: f64,
        view_height: f64,
        margin_percent: f64,
    ) -> ViewTransform {
        let mut points: Vec<Point> = self.positions.to_vec();
        if self.actual_com != Point::ORIGIN {
            points.push(self.actual_com);
        }
        if self.ideal_com != Point::ORIGIN {
            points.push(self.ideal_com);
        }
        view::fit_view(&points, view_width, view_height, margin_percent)
    }

    /// Snapshot current state plus tray/optimizer settings into the value
    /// bundle the optimizer consumes.
    pub fn layout_params(&self, trays: &TraysCfg, optimizer: &OptimizerCfg) -> LayoutParams {
        LayoutParams {
            sensor_weights: self.weights.to_vec(),
            sensor_positions: self.positions.to_vec(),
            ideal_com: self.ideal_com,
            bias: Point::new(optimizer.bias_x, optimizer.bias_y),
            front_tray: trays.front,
            back_tray: trays.back,
            max_weight: optimizer.max_weight,
            max_weight_unit: optimizer.max_weight_unit.clone(),
            threshold: optimizer.threshold_fraction(),
        }
    }

    /// Run the optimizer on a worker thread. Current subscribers receive
    /// `LayoutReady` on success; the returned job yields the result either
    /// way.
    pub fn request_layout(&self, params: LayoutParams) -> LayoutJob {
        tracing::debug!("layout requested");
        worker::spawn_layout_notifying(params, self.subscribers.clone())
    }

    fn broadcast(&mut self, event: &EngineEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_engine() -> DistributionEngine {
        let mut engine = DistributionEngine::new();
        engine.set_sensor_positions([
            Point::new(19.0, 0.0),
            Point::new(-19.0, 0.0),
            Point::new(-19.0, 26.5),
            Point::new(19.0, 26.5),
        ]);
        engine
    }

    #[test]
    fn zero_weight_com_is_the_geometric_center() {
        let engine = square_engine();
        let com = engine.actual_com();
        assert!((com.x - 0.0).abs() < 1e-12);
        assert!((com.y - 13.25).abs() < 1e-12);
    }

    #[test]
    fn com_event_precedes_displacement_event() {
        let mut engine = square_engine();
        let rx = engine.subscribe();
        engine.update_sensor_data(&[1.0, 1.0, 1.0, 1.0], None, true);
        let events: Vec<EngineEvent> = rx.try_iter().collect();
        assert!(matches!(events[0], EngineEvent::ComUpdated(_)));
        assert!(matches!(events[1], EngineEvent::DisplacementUpdated(_)));
    }

    #[test]
    fn geometry_event_fires_after_com_and_displacement() {
        let mut engine = DistributionEngine::new();
        let rx = engine.subscribe();
        engine.set_sensor_positions([Point::new(1.0, 1.0); SENSOR_COUNT]);
        let events: Vec<EngineEvent> = rx.try_iter().collect();
        assert!(matches!(events[0], EngineEvent::ComUpdated(_)));
        assert!(matches!(events[1], EngineEvent::DisplacementUpdated(_)));
        assert_eq!(events[2], EngineEvent::GeometryChanged);
    }

    #[test]
    fn short_samples_are_dropped_without_events() {
        let mut engine = square_engine();
        let before = engine.actual_com();
        let rx = engine.subscribe();
        engine.update_sensor_data(&[5.0, 5.0, 5.0], None, true);
        assert_eq!(engine.actual_com(), before);
        assert!(rx.try_iter().next().is_none());
    }

    #[test]
    fn ideal_com_update_skips_displacement_until_a_com_exists() {
        let mut engine = DistributionEngine::new();
        let rx = engine.subscribe();
        // actual COM is still the origin, nothing to recompute
        engine.set_ideal_com(Point::new(0.0, 13.25));
        assert!(rx.try_iter().next().is_none());

        engine.set_sensor_positions([
            Point::new(19.0, 0.0),
            Point::new(-19.0, 0.0),
            Point::new(-19.0, 26.5),
            Point::new(19.0, 26.5),
        ]);
        let _ = rx.try_iter().count();
        engine.set_ideal_com(Point::new(1.0, 1.0));
        let events: Vec<EngineEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], EngineEvent::DisplacementUpdated(_)));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut engine = square_engine();
        let rx = engine.subscribe();
        drop(rx);
        let rx2 = engine.subscribe();
        engine.update_sensor_data(&[1.0, 1.0, 1.0, 1.0], None, true);
        assert_eq!(engine.subscribers.len(), 1);
        assert!(rx2.try_iter().next().is_some());
    }
}
