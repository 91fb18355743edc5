//! Lock status evaluation.
//!
//! Derives the boolean lock state from a phase sample: locked when the
//! sample sits within the threshold of a second boundary in either
//! direction. Stateless and recomputed every cycle — there is no debounce,
//! so the indicator can chatter when the phase error hovers at the
//! threshold. That matches the indicator's contract; callers wanting
//! hysteresis must add it themselves.

use super::NANOS_PER_SEC;

/// Threshold comparison for the lock indicator line.
#[derive(Debug, Clone, Copy)]
pub struct LockEvaluator {
    threshold_ns: u32,
}

impl LockEvaluator {
    pub fn new(threshold_ns: u32) -> Self {
        Self { threshold_ns }
    }

    /// `true` when `phase_ns` is strictly within the threshold of the
    /// previous or the next second boundary.
    pub fn evaluate(&self, phase_ns: u32) -> bool {
        let threshold = i64::from(self.threshold_ns);
        let phase = i64::from(phase_ns);
        phase < threshold || (NANOS_PER_SEC - phase) < threshold
    }
}
