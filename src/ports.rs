//! Port traits — the boundary between the control loop and the host.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PulseScheduler (domain)
//! ```
//!
//! The scheduler consumes these via generics, so the control loop never
//! touches hardware directly and runs unchanged against the recording mocks
//! used in tests.
//!
//! Both ports must be callable from the timer thread without blocking: the
//! latency between a deadline firing and `wallclock()` returning goes
//! straight into the phase measurement as noise.

use crate::error::OutputError;

/// Identifies one digital output line (BCM numbering on the Pi backend).
pub type LineId = u8;

/// A wall-clock reading split into whole seconds and the nanosecond offset
/// within the current second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    /// Seconds since the Unix epoch.
    pub secs: i64,
    /// Nanosecond-of-second, always in `[0, 1_000_000_000)`.
    pub subsec_ns: u32,
}

/// Read-side port: monotonic time for scheduling, wall-clock time for phase
/// measurement.
pub trait ClockPort {
    /// Nanoseconds on the monotonic clock. The zero point is arbitrary but
    /// fixed for the lifetime of the instance.
    fn monotonic_ns(&self) -> u64;

    /// Current wall-clock time.
    fn wallclock(&self) -> WallClock;
}

/// Write-side port: two independently settable boolean output lines.
pub trait OutputPort {
    /// Drive `line` high (`true`) or low (`false`).
    fn set(&mut self, line: LineId, high: bool) -> Result<(), OutputError>;
}
