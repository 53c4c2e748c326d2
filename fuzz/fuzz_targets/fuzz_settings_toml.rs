#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // We fuzz TOML parsing of Settings and ensure it never panics and rejects invalids gracefully.
    // Accept both parse errors and validation errors, but do not allow panics.
    let parsed = toml::from_str::<sled_config::Settings>(data);
    match parsed {
        Ok(settings) => {
            // Ensure validate() does not panic
            let _ = settings.validate();
        }
        Err(_e) => {
            // parse error is acceptable
        }
    }
});
