#![no_main]
use libfuzzer_sys::fuzz_target;
use sled_core::calibration::CalibrationProfile;

fuzz_target!(|data: &str| {
    // The profile loader accepts current and legacy layouts; any input may
    // be rejected with an error but must never panic.
    let mut profile = CalibrationProfile::new();
    let _ = profile.load_from_str(data);
});
