//! Background frame sampling.
//!
//! Spawns a thread that owns the `SampleSource`, pushes the latest frame
//! over a bounded channel, and tracks the last-ok timestamp for stall
//! detection. Each sampler owns exactly one thread, joined on drop.

use crossbeam_channel as xch;
use sled_traits::{Clock, RawFrame, SampleSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

const MICROS_PER_SEC: u64 = 1_000_000;

/// Sampling period in microseconds for `hz`, clamped so neither the rate
/// nor the period is ever zero.
#[inline]
fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

pub struct FrameSampler {
    rx: xch::Receiver<RawFrame>,
    last_ok: Arc<AtomicU64>,
    epoch: Instant,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl FrameSampler {
    /// Spawn a paced sampler reading `hz` frames per second.
    pub fn spawn<S, C>(mut source: S, hz: u32, timeout: Duration, clock: C) -> Self
    where
        S: SampleSource + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (tx, rx) = xch::bounded(1);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = shutdown.clone();
        let last_ok = Arc::new(AtomicU64::new(0));
        let last_ok_writer = last_ok.clone();
        let period = Duration::from_micros(period_us(hz));
        let epoch = clock.now();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_flag.load(Ordering::Relaxed) {
                    tracing::debug!("sampler thread received shutdown signal");
                    break;
                }

                match source.read_frame(timeout) {
                    Ok(frame) => {
                        // A failed send means the consumer is gone
                        if tx.send(frame).is_err() {
                            tracing::debug!("sampler consumer disconnected, exiting thread");
                            break;
                        }
                        last_ok_writer.store(clock.ms_since(epoch), Ordering::Relaxed);
                    }
                    Err(_) => {
                        // Transient read errors are absorbed; the consumer
                        // watches stalled_for
                    }
                }

                if shutdown_flag.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(period);
            }
            tracing::trace!("sampler thread exiting cleanly");
        });

        Self {
            rx,
            last_ok,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Most recent frame, or `None` if nothing arrived since the last call.
    pub fn latest(&self) -> Option<RawFrame> {
        self.rx.try_iter().last()
    }

    /// Milliseconds since the last successful read, with `now_ms` measured
    /// from this sampler's epoch.
    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }

    /// Stall measured against a real monotonic clock.
    pub fn stalled_for_now(&self) -> u64 {
        let now_ms = {
            let dur = Instant::now().saturating_duration_since(self.epoch);
            (dur.as_millis().min(u128::from(u64::MAX))) as u64
        };
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }
}

impl Drop for FrameSampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // A producer blocked on the full channel must be released before
        // the join can complete; after the send it sees the shutdown flag.
        let _ = self.rx.try_iter().last();

        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("sampler thread joined");
                }
                Err(e) => {
                    tracing::warn!(?e, "sampler thread panicked during shutdown");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_clamps_rate_and_floor() {
        assert_eq!(period_us(0), MICROS_PER_SEC);
        assert_eq!(period_us(1), MICROS_PER_SEC);
        assert_eq!(period_us(100), 10_000);
        assert_eq!(period_us(u32::MAX), 1);
    }

    #[test]
    fn stalled_for_saturates() {
        // last_ok starts at 0; a now before the epoch cannot underflow
        let sampler = FrameSampler::spawn(
            crate::mocks::SilentSource,
            1000,
            Duration::from_millis(1),
            sled_traits::MonotonicClock::new(),
        );
        assert_eq!(sampler.stalled_for(0), 0);
        assert!(sampler.stalled_for(25) <= 25);
    }
}
