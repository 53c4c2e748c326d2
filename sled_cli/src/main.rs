//! Sled CLI: calibration fitting, replay monitoring, layout computation.

mod cli;
mod error_fmt;
mod fit;
mod layout;
mod monitor;

use clap::Parser;
use eyre::{Result, WrapErr};
use sled_config::{Logging, Settings};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands, FILE_GUARD, JSON_MODE, json_mode};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_mode() {
                eprintln!("{}", error_fmt::format_error_json(&err));
            } else {
                eprintln!("{}", error_fmt::humanize(&err));
            }
            ExitCode::from(u8::try_from(error_fmt::exit_code_for_error(&err)).unwrap_or(1))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    color_eyre::install()?;

    let (settings, defaulted) = load_settings(&cli.config)?;
    let unknown_rotation = init_tracing(&cli, &settings.logging);
    if defaulted {
        tracing::warn!(path = ?cli.config, "settings file missing, using defaults");
    }
    if let Some(rotation) = unknown_rotation {
        tracing::warn!(%rotation, "unknown log rotation, file will not rotate");
    }

    match &cli.cmd {
        Commands::Fit { points, out } => fit::run_fit(points, out),
        Commands::Monitor {
            replay,
            hz,
            frames,
            pre_calibrated,
        } => monitor::run_monitor(
            &settings,
            cli.calibration.as_deref(),
            replay,
            *hz,
            *frames,
            *pre_calibrated,
        ),
        Commands::Layout { weights } => layout::run_layout(&settings, weights),
    }
}

/// Read and validate the settings TOML. A missing file at the default
/// location falls back to built-in defaults; the bool reports that case so
/// it can be logged once tracing is up.
fn load_settings(path: &Path) -> Result<(Settings, bool)> {
    if !path.exists() {
        return Ok((Settings::default(), true));
    }
    let text =
        std::fs::read_to_string(path).wrap_err_with(|| format!("read settings {path:?}"))?;
    let settings =
        sled_config::load_toml(&text).map_err(|e| eyre::eyre!("parse settings {path:?}: {e}"))?;
    settings
        .validate()
        .wrap_err_with(|| format!("validate settings {path:?}"))?;
    Ok((settings, false))
}

/// Console logging per the CLI flags plus an optional JSON-lines file from
/// the `[logging]` settings. Returns an unrecognized rotation value, if any,
/// so the caller can warn about it after the subscriber is live.
fn init_tracing(cli: &Cli, logging: &Logging) -> Option<String> {
    let level = cli
        .log_level
        .as_deref()
        .or(logging.level.as_deref())
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut unknown_rotation = None;
    let file_layer = logging.file.as_ref().map(|file| {
        let path = Path::new(file);
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let name = path
            .file_name()
            .map_or_else(|| "sled.log".into(), std::ffi::OsStr::to_os_string);
        let appender = match logging.rotation.as_deref() {
            None | Some("never") => tracing_appender::rolling::never(dir, name),
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            Some(other) => {
                unknown_rotation = Some(other.to_string());
                tracing_appender::rolling::never(dir, name)
            }
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        fmt::layer().json().with_writer(writer)
    });

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if cli.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
    unknown_rotation
}
