//! Single-pole feedback controller for the pulse interval.
//!
//! Holds the current best estimate of "one second" in monotonic-clock
//! nanoseconds and corrects it from the residual phase error observed at
//! each wall-clock sample. Each correction is the signed distance to the
//! nearest second boundary, right-shifted by the configured gain, so the
//! residual decays geometrically (ratio 1/2 at the default shift) barring
//! clock drift.
//!
//! No clamping, no windowing, no outlier rejection: a single bad sample
//! perturbs the estimate for one step and the next samples pull it back.

use super::NANOS_PER_SEC;

/// The feedback controller. Its only persistent state is the interval
/// estimate itself.
#[derive(Debug, Clone)]
pub struct IntervalEstimator {
    interval_ns: i64,
    gain_shift: u32,
}

impl IntervalEstimator {
    /// Start from the nominal one-second interval.
    pub fn new(gain_shift: u32) -> Self {
        Self {
            interval_ns: NANOS_PER_SEC,
            gain_shift,
        }
    }

    /// Current interval estimate in monotonic nanoseconds.
    pub fn interval_ns(&self) -> i64 {
        self.interval_ns
    }

    /// Feed one phase sample (nanosecond-of-second at the instant the pulse
    /// was asserted, `[0, 1e9)`) and return the corrected interval.
    ///
    /// A sample in the lower half-second means the edge fired just after a
    /// boundary — the local clock runs behind, so the interval shrinks. A
    /// sample in the upper half-second means the edge fired just before the
    /// next boundary, and the interval grows by the shifted complement.
    pub fn update(&mut self, phase_ns: u32) -> i64 {
        debug_assert!((phase_ns as i64) < NANOS_PER_SEC, "phase out of range");
        let phase = i64::from(phase_ns);
        let complement = NANOS_PER_SEC - phase;
        if phase < complement {
            self.interval_ns -= phase >> self.gain_shift;
        } else {
            self.interval_ns += complement >> self.gain_shift;
        }
        self.interval_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_phase_leaves_interval_untouched() {
        let mut est = IntervalEstimator::new(1);
        assert_eq!(est.update(0), NANOS_PER_SEC);
    }

    #[test]
    fn late_sample_grows_interval() {
        // Phase 600 ms: complement 400 ms, correction +200 ms.
        let mut est = IntervalEstimator::new(1);
        assert_eq!(est.update(600_000_000), 1_200_000_000);
    }

    #[test]
    fn early_sample_shrinks_interval() {
        // Phase 400 ms: below the midpoint, correction -200 ms.
        let mut est = IntervalEstimator::new(1);
        assert_eq!(est.update(400_000_000), 800_000_000);
    }

    #[test]
    fn midpoint_takes_late_branch() {
        // phase == complement at exactly half a second.
        let mut est = IntervalEstimator::new(1);
        assert_eq!(est.update(500_000_000), 1_250_000_000);
    }

    #[test]
    fn update_is_deterministic() {
        let mut a = IntervalEstimator::new(1);
        let mut b = IntervalEstimator::new(1);
        for phase in [123_456_789_u32, 999_999_999, 0, 500_000_000] {
            assert_eq!(a.update(phase), b.update(phase));
        }
        assert_eq!(a.interval_ns(), b.interval_ns());
    }

    #[test]
    fn gain_shift_scales_correction() {
        let mut est = IntervalEstimator::new(3);
        // 400 ms complement >> 3 = 50 ms.
        assert_eq!(est.update(600_000_000), 1_050_000_000);
    }

    #[test]
    fn correction_law_halves_residual() {
        // Each correction shifts the next edge by half the observed error,
        // so an isolated offset decays geometrically: within 1 ns after
        // 30 applications for any starting error under a second. (Integer
        // shifts floor, so the last nanosecond never corrects away.)
        let mut residual: i64 = 300_000_000;
        let mut prev = residual;
        for _ in 0..30 {
            let mut est = IntervalEstimator::new(1);
            let correction = est.update(residual as u32) - NANOS_PER_SEC;
            residual += correction;
            assert!(residual <= prev, "residual must never grow");
            prev = residual;
        }
        assert!(residual.abs() <= 1, "residual {residual} did not converge");
    }

    #[test]
    fn estimate_is_unclamped() {
        // Repeated worst-case early samples keep pulling the estimate down
        // without any floor. Trusting the arithmetic unconditionally is the
        // contract; the scheduler guards the rearm separately.
        let mut est = IntervalEstimator::new(1);
        for _ in 0..4 {
            est.update(499_999_999);
        }
        assert!(est.interval_ns() < NANOS_PER_SEC - 900_000_000);
    }
}
