#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core sled engine (transport-agnostic).
//!
//! This crate provides the load-cell sled logic with no transport or UI
//! attached. Raw frames come in through `sled_traits::SampleSource`;
//! geometry and tuning come from `sled_config`.
//!
//! ## Architecture
//!
//! - **Units**: gram-pivot mass conversion (`units` module)
//! - **Calibration**: per-sensor linear raw-to-grams models with JSON
//!   persistence (`calibration`), guided point capture (`capture`)
//! - **Engine**: tare, center of mass, displacement, view fitting
//!   (`engine`, `view`)
//! - **Optimizer**: greedy ballast placement over tray grids (`optimizer`)
//! - **Concurrency**: frame sampler thread (`sampler`), background layout
//!   worker (`worker`), notifications over crossbeam channels (`events`)

pub mod calibration;
pub mod capture;
pub mod engine;
pub mod error;
pub mod events;
pub mod frame;
pub mod mocks;
pub mod optimizer;
pub mod sampler;
pub mod types;
pub mod units;
pub mod view;
pub mod worker;

pub use calibration::{CalibrationPoint, CalibrationProfile, FORMAT_VERSION, SensorCalibration};
pub use capture::{DEFAULT_POINT_SAMPLES, PointCapture};
pub use engine::DistributionEngine;
pub use error::{CalibrationError, EngineError, LayoutError, Result};
pub use events::EngineEvent;
pub use optimizer::{
    EFFECT_WEIGHT_GRAMS, EffectMaps, LayoutParams, TrayLayoutResult, compute_optimal_layout,
};
pub use sampler::FrameSampler;
pub use types::{Point, SENSOR_COUNT};
pub use view::{DEFAULT_MARGIN_PERCENT, ViewTransform, fit_view};
pub use worker::{LayoutJob, spawn_layout};
