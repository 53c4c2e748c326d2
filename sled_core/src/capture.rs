//! Sample averaging for guided calibration points.

/// Samples collected per calibration point in the guided flow.
pub const DEFAULT_POINT_SAMPLES: usize = 20;

/// Accumulates raw samples for one calibration point and averages them once
/// the target count is reached. A baseline capture is recorded downstream as
/// an ordinary point with known weight 0 g.
#[derive(Debug, Clone)]
pub struct PointCapture {
    target: usize,
    samples: Vec<f64>,
}

impl Default for PointCapture {
    fn default() -> Self {
        Self::new(DEFAULT_POINT_SAMPLES)
    }
}

impl PointCapture {
    /// A capture that completes after `target` samples (at least 1).
    pub fn new(target: usize) -> Self {
        Self {
            target: target.max(1),
            samples: Vec::new(),
        }
    }

    /// Feed one raw sample. Returns the averaged raw value on the sample
    /// that completes the capture, `None` before that. Samples arriving
    /// after completion are dropped.
    pub fn push(&mut self, raw: f64) -> Option<f64> {
        if self.is_complete() {
            return None;
        }
        self.samples.push(raw);
        self.mean()
    }

    /// Averaged raw value, available once the capture is complete.
    pub fn mean(&self) -> Option<f64> {
        self.is_complete()
            .then(|| self.samples.iter().sum::<f64>() / self.target as f64)
    }

    pub fn is_complete(&self) -> bool {
        self.samples.len() >= self.target
    }

    /// (collected, target) for progress display.
    pub fn progress(&self) -> (usize, usize) {
        (self.samples.len(), self.target)
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_on_the_completing_sample() {
        let mut cap = PointCapture::new(4);
        assert_eq!(cap.push(1.0), None);
        assert_eq!(cap.push(2.0), None);
        assert_eq!(cap.push(3.0), None);
        assert_eq!(cap.progress(), (3, 4));
        assert_eq!(cap.push(6.0), Some(3.0));
        assert!(cap.is_complete());
    }

    #[test]
    fn extra_samples_are_dropped() {
        let mut cap = PointCapture::new(2);
        cap.push(10.0);
        assert_eq!(cap.push(20.0), Some(15.0));
        assert_eq!(cap.push(999.0), None);
        assert_eq!(cap.mean(), Some(15.0));
    }

    #[test]
    fn reset_restarts_collection() {
        let mut cap = PointCapture::new(2);
        cap.push(1.0);
        cap.push(2.0);
        cap.reset();
        assert!(!cap.is_complete());
        assert_eq!(cap.progress(), (0, 2));
        assert_eq!(cap.push(4.0), None);
        assert_eq!(cap.push(6.0), Some(5.0));
    }

    #[test]
    fn zero_target_clamps_to_one() {
        let mut cap = PointCapture::new(0);
        assert_eq!(cap.push(7.5), Some(7.5));
    }

    #[test]
    fn default_uses_twenty_samples() {
        let mut cap = PointCapture::default();
        for i in 0..19 {
            assert_eq!(cap.push(f64::from(i)), None);
        }
        let mean = cap.push(19.0).unwrap();
        assert!((mean - 9.5).abs() < 1e-12);
    }
}
