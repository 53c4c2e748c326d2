//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(name = "sled", version, about = "Sled weight distribution CLI")]
pub struct Cli {
    /// Path to settings TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/sled_settings.toml")]
    pub config: PathBuf,

    /// Optional calibration profile JSON
    #[arg(long, value_name = "FILE")]
    pub calibration: Option<PathBuf>,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging]
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fit per-sensor calibrations from a points CSV and write a profile
    Fit {
        /// Calibration points CSV (headers: sensor,raw,weight,unit)
        #[arg(long, value_name = "FILE")]
        points: PathBuf,
        /// Where to write the fitted profile JSON
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },
    /// Replay recorded frames through the sampler and stream COM updates
    Monitor {
        /// Frame file, one comma-separated sample per line
        #[arg(long, value_name = "FILE")]
        replay: PathBuf,
        /// Sampling rate in Hz
        #[arg(long, default_value_t = 50)]
        hz: u32,
        /// Stop after this many frames instead of running the file out
        #[arg(long, value_name = "N")]
        frames: Option<u64>,
        /// Treat replayed values as grams, bypassing the calibration profile
        #[arg(long, action = ArgAction::SetTrue)]
        pre_calibrated: bool,
    },
    /// Compute a ballast layout for a fixed set of cell weights
    Layout {
        /// Four cell weights in grams, comma separated
        #[arg(
            long,
            value_name = "G,G,G,G",
            num_args = 1..,
            value_delimiter = ','
        )]
        weights: Vec<f64>,
    },
}
