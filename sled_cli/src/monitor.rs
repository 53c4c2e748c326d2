//! The `monitor` command: replayed frames through the sampler into the
//! engine, one status line per applied sample.

use eyre::{Result, WrapErr};
use sled_config::Settings;
use sled_core::calibration::CalibrationProfile;
use sled_core::{DistributionEngine, FrameSampler, frame};
use sled_traits::{MonotonicClock, RawFrame, SampleSource};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::cli::json_mode;

/// Replays a recorded frame file. Lines that are not sensor data (status
/// traffic, blanks) are skipped; the source errors once the file is drained,
/// which the consumer observes as a stall.
struct ReplaySource {
    lines: std::io::Lines<std::io::BufReader<std::fs::File>>,
}

impl ReplaySource {
    fn open(path: &Path) -> Result<Self> {
        let file =
            std::fs::File::open(path).wrap_err_with(|| format!("open replay file {path:?}"))?;
        Ok(Self {
            lines: std::io::BufReader::new(file).lines(),
        })
    }
}

impl SampleSource for ReplaySource {
    fn read_frame(
        &mut self,
        _timeout: Duration,
    ) -> Result<RawFrame, Box<dyn std::error::Error + Send + Sync>> {
        for line in self.lines.by_ref() {
            let line = line?;
            if let Some(values) = frame::parse_line(&line)
                && let Some(frame) = frame::first_four(&values)
            {
                return Ok(frame);
            }
        }
        Err(Box::new(std::io::Error::other("replay drained")))
    }
}

pub fn run_monitor(
    settings: &Settings,
    calibration: Option<&Path>,
    replay: &Path,
    hz: u32,
    frames: Option<u64>,
    pre_calibrated: bool,
) -> Result<()> {
    let mut engine = DistributionEngine::with_geometry(&settings.geometry)?;
    if let Some(path) = calibration {
        let mut profile = CalibrationProfile::new();
        profile.load_from_file(path)?;
        tracing::info!(file = ?path, "calibration profile loaded");
        engine.set_calibration(profile);
    }

    let source = ReplaySource::open(replay)?;
    let sampler = FrameSampler::spawn(
        source,
        hz,
        Duration::from_millis(250),
        MonotonicClock::new(),
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown.clone();
    ctrlc::set_handler(move || shutdown_flag.store(true, Ordering::Relaxed))
        .wrap_err("install Ctrl-C handler")?;

    // Once reads stop for several periods the file is considered drained.
    let stall_ms = 1_000u64.max(u64::from(4_000 / hz.max(1)));
    let poll = Duration::from_micros((500_000 / u64::from(hz.max(1))).max(1_000));

    let mut processed: u64 = 0;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!(processed, "interrupted");
            break;
        }
        if let Some(raw) = sampler.latest() {
            engine.update_sensor_data(&raw, None, pre_calibrated);
            processed += 1;
            print_status(&engine, processed);
            if frames.is_some_and(|limit| processed >= limit) {
                break;
            }
        } else if sampler.stalled_for_now() > stall_ms {
            tracing::info!(processed, "replay drained");
            break;
        }
        std::thread::sleep(poll);
    }

    if !json_mode() {
        println!("{processed} frame(s) processed");
    }
    Ok(())
}

fn print_status(engine: &DistributionEngine, frame_no: u64) {
    let com = engine.actual_com();
    let disp = engine.displacement();
    let total: f64 = engine.weights().iter().sum();
    if json_mode() {
        println!(
            "{}",
            serde_json::json!({
                "frame": frame_no,
                "weights": engine.weights(),
                "total_g": total,
                "com": com,
                "displacement": disp,
            })
        );
    } else {
        println!(
            "frame {frame_no}: com ({:.2}, {:.2}) displacement ({:+.2}, {:+.2}) total {total:.1} g",
            com.x, com.y, disp.x, disp.y
        );
    }
}
