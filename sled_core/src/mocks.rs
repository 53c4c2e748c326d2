//! Test and helper mocks for sled_core

use sled_traits::{RawFrame, SampleSource};
use std::collections::VecDeque;

/// A source that replays a scripted frame sequence. Once the script runs
/// out it errors, or repeats the last frame forever when built with
/// `repeating`.
pub struct ScriptedSource {
    frames: VecDeque<RawFrame>,
    last: Option<RawFrame>,
    repeat_last: bool,
}

impl ScriptedSource {
    pub fn new(frames: impl IntoIterator<Item = RawFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            last: None,
            repeat_last: false,
        }
    }

    pub fn repeating(frames: impl IntoIterator<Item = RawFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            last: None,
            repeat_last: true,
        }
    }
}

impl SampleSource for ScriptedSource {
    fn read_frame(
        &mut self,
        _timeout: std::time::Duration,
    ) -> Result<RawFrame, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(frame) = self.frames.pop_front() {
            self.last = Some(frame);
            return Ok(frame);
        }
        if self.repeat_last && let Some(frame) = self.last {
            return Ok(frame);
        }
        Err(Box::new(std::io::Error::other("script exhausted")))
    }
}

/// A source that always errors on read; useful for stall-detection tests
/// and for driving the engine with externally supplied values.
pub struct SilentSource;

impl SampleSource for SilentSource {
    fn read_frame(
        &mut self,
        _timeout: std::time::Duration,
    ) -> Result<RawFrame, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("silent source")))
    }
}
