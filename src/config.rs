//! System configuration parameters.
//!
//! All tunable parameters for the pulse generator. Values can be overridden
//! by pointing the binary at a JSON file; defaults match the reference
//! deployment.

use serde::{Deserialize, Serialize};

use crate::pins;
use crate::ports::LineId;

/// Core system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PpsConfig {
    // --- Output lines ---
    /// GPIO line for the once-per-second pulse.
    pub pulse_line: LineId,
    /// GPIO line for the lock indicator.
    pub lock_line: LineId,

    // --- Pulse shape ---
    /// How long the pulse line stays asserted (milliseconds).
    pub pulse_width_ms: u32,

    // --- Control loop ---
    /// Phase error (nanoseconds, either direction) below which the output
    /// counts as locked.
    pub lock_threshold_ns: u32,
    /// Feedback gain as a right-shift: each correction is
    /// `phase_error >> gain_shift`. Shift 1 halves the residual per cycle.
    pub gain_shift: u32,
}

impl Default for PpsConfig {
    fn default() -> Self {
        Self {
            pulse_line: pins::PPS_LINE,
            lock_line: pins::LOCK_LINE,
            pulse_width_ms: 100,
            lock_threshold_ns: 100_000,
            gain_shift: 1,
        }
    }
}

impl PpsConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Range-check every field. Invalid values are rejected, not clamped,
    /// so a bad config file cannot silently degrade the output timing.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.pulse_line == self.lock_line {
            return Err("pulse_line and lock_line must differ");
        }
        if self.pulse_width_ms == 0 || self.pulse_width_ms >= 1000 {
            return Err("pulse_width_ms must be in 1..1000");
        }
        if self.lock_threshold_ns == 0 || self.lock_threshold_ns >= 500_000_000 {
            return Err("lock_threshold_ns must be in 1..500_000_000");
        }
        if self.gain_shift > 16 {
            return Err("gain_shift must be in 0..=16");
        }
        Ok(())
    }

    /// Pulse width as nanoseconds, the unit the scheduler works in.
    pub fn pulse_width_ns(&self) -> u64 {
        u64::from(self.pulse_width_ms) * 1_000_000
    }
}
