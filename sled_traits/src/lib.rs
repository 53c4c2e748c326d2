pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// One contemporaneous raw reading per load cell.
pub type RawFrame = [f64; 4];

/// A source of raw sensor frames (serial bridge, Bluetooth link, replay file,
/// simulator). One call yields one 4-value frame.
pub trait SampleSource {
    fn read_frame(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<RawFrame, Box<dyn std::error::Error + Send + Sync>>;
}
