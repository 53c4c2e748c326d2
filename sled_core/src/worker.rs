//! Background execution of layout computations.
//!
//! The optimizer itself is pure and synchronous; this module moves one call
//! onto its own thread and hands back a join handle. Inputs are snapshotted
//! by value, so the worker shares no state with the engine.

use crossbeam_channel as xch;
use std::thread;

use crate::error::Result;
use crate::events::EngineEvent;
use crate::optimizer::{self, LayoutParams, TrayLayoutResult};

/// Handle to one layout computation running on a dedicated thread.
pub struct LayoutJob {
    handle: thread::JoinHandle<Result<TrayLayoutResult>>,
}

impl LayoutJob {
    /// Block until the computation finishes and yield its result.
    pub fn wait(self) -> Result<TrayLayoutResult> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(eyre::eyre!("layout worker panicked")),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawn a layout computation with no event listeners.
pub fn spawn_layout(params: LayoutParams) -> LayoutJob {
    spawn_layout_notifying(params, Vec::new())
}

/// Spawn a layout computation that sends `LayoutReady` to `listeners` on
/// success. Disconnected listeners are skipped here; the engine prunes them
/// on its next broadcast.
pub(crate) fn spawn_layout_notifying(
    params: LayoutParams,
    listeners: Vec<xch::Sender<EngineEvent>>,
) -> LayoutJob {
    let handle = thread::spawn(move || {
        let result = optimizer::compute_optimal_layout(&params);
        match &result {
            Ok(layout) => {
                for tx in &listeners {
                    let _ = tx.send(EngineEvent::LayoutReady(layout.clone()));
                }
            }
            Err(e) => tracing::warn!(error = %e, "layout computation failed"),
        }
        result
    });
    LayoutJob { handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;
    use sled_config::TraysCfg;

    fn params() -> LayoutParams {
        let trays = TraysCfg::default();
        LayoutParams {
            sensor_weights: vec![60_000.0, 20_000.0, 20_000.0, 40_000.0],
            sensor_positions: vec![
                Point::new(19.0, 0.0),
                Point::new(-19.0, 0.0),
                Point::new(-19.0, 26.5),
                Point::new(19.0, 26.5),
            ],
            ideal_com: Point::new(0.0, 13.25),
            bias: Point::ORIGIN,
            front_tray: trays.front,
            back_tray: trays.back,
            max_weight: 350.0,
            max_weight_unit: "lb".to_string(),
            threshold: None,
        }
    }

    #[test]
    fn wait_yields_the_same_result_as_a_direct_call() {
        let p = params();
        let direct = optimizer::compute_optimal_layout(&p).unwrap();
        let job = spawn_layout(p);
        let threaded = job.wait().unwrap();
        assert_eq!(direct, threaded);
    }

    #[test]
    fn listeners_receive_layout_ready() {
        let (tx, rx) = xch::unbounded();
        let layout = spawn_layout_notifying(params(), vec![tx]).wait().unwrap();
        match rx.try_recv() {
            Ok(EngineEvent::LayoutReady(sent)) => assert_eq!(sent, layout),
            other => panic!("expected LayoutReady, got {other:?}"),
        }
    }
}
