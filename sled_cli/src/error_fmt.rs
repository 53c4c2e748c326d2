//! Human-readable error descriptions and structured JSON error formatting.

use sled_core::{CalibrationError, EngineError, LayoutError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(ce) = err.downcast_ref::<CalibrationError>() {
        return match ce {
            CalibrationError::InsufficientPoints { got } => format!(
                "What happened: A sensor has only {got} calibration point(s); two are required.\nLikely causes: The points CSV is missing rows for that sensor.\nHow to fix: Record at least two points per sensor (one with the platform empty, one with a known weight) and rerun `sled fit`."
            ),
            CalibrationError::Fit(msg) => format!(
                "What happened: The calibration regression failed ({msg}).\nLikely causes: All raw readings identical, or non-finite values in the CSV.\nHow to fix: Re-record the points with distinct loads on the cell, then rerun `sled fit`."
            ),
        };
    }

    if let Some(le) = err.downcast_ref::<LayoutError>() {
        let LayoutError::Configuration(msg) = le;
        return format!(
            "What happened: The layout optimizer rejected its inputs ({msg}).\nLikely causes: Out-of-range tray values in the settings TOML.\nHow to fix: Edit the [trays] sections, then rerun. See README for a sample."
        );
    }

    if let Some(ee) = err.downcast_ref::<EngineError>() {
        let EngineError::InputSize { got, want } = ee;
        return format!(
            "What happened: A sensor sample had {got} values; {want} are required.\nLikely causes: Truncated replay lines or a sensor dropping out mid-frame.\nHow to fix: Check the replay file for short lines."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("parse settings") || lower.contains("validate settings") {
        return "What happened: The settings TOML is invalid or incomplete.\nLikely causes: A typo in a section name, or out-of-range values.\nHow to fix: Edit the settings file and try again (defaults apply for anything omitted).".to_string();
    }

    if lower.contains("points csv") {
        return "What happened: The calibration points CSV could not be read.\nLikely causes: Wrong path, or headers other than 'sensor,raw,weight,unit'.\nHow to fix: Check the path and the header row, then rerun `sled fit`.".to_string();
    }

    if lower.contains("calibration file") || lower.contains("calibration json") {
        return "What happened: The calibration profile could not be loaded.\nLikely causes: The file is not profile JSON, or it is from an unsupported version.\nHow to fix: Point --calibration at a profile written by `sled fit`, or refit.".to_string();
    }

    if lower.contains("replay") {
        return "What happened: The replay file could not be read.\nLikely causes: Wrong path or unreadable file.\nHow to fix: Check the --replay path.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Map typed errors to stable exit codes; anything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<CalibrationError>().is_some() {
        return 3;
    }
    if err.downcast_ref::<LayoutError>().is_some() {
        return 4;
    }
    if err.downcast_ref::<EngineError>().is_some() {
        return 5;
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = if err.downcast_ref::<CalibrationError>().is_some() {
        "Calibration"
    } else if err.downcast_ref::<LayoutError>().is_some() {
        "Layout"
    } else if err.downcast_ref::<EngineError>().is_some() {
        "Engine"
    } else {
        "Error"
    };
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}
