//! Unified error types for the pulse generator.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! lifecycle's error handling uniform. All variants are `Copy` so they can
//! pass through the timer thread without allocation.
//!
//! There are no recoverable errors: once both output lines are acquired and
//! the timers are armed, the control loop is pure arithmetic. Everything
//! here is terminal to the lifecycle phase that produced it.

use core::fmt;

use crate::ports::LineId;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An output line could not be acquired or driven.
    Output(OutputError),
    /// The timer facility could not be armed or started.
    Timer(TimerError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Output(e) => write!(f, "output: {e}"),
            Self::Timer(e) => write!(f, "timer: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Output-line errors
// ---------------------------------------------------------------------------

/// Failures on the digital output boundary.
///
/// Acquisition is all-or-nothing: when any line in a set cannot be reserved,
/// the lines already taken are released before the error is returned, so the
/// system never holds one line without the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputError {
    /// The line is reserved by another consumer or does not exist.
    Unavailable(LineId),
    /// Writing the line level failed.
    WriteFailed(LineId),
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(line) => write!(f, "line {line} unavailable"),
            Self::WriteFailed(line) => write!(f, "write to line {line} failed"),
        }
    }
}

impl std::error::Error for OutputError {}

impl From<OutputError> for Error {
    fn from(e: OutputError) -> Self {
        Self::Output(e)
    }
}

// ---------------------------------------------------------------------------
// Timer errors
// ---------------------------------------------------------------------------

/// Failures from the host timer facility. The control loop cannot operate
/// without both timers, so these are fatal and require a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// The dedicated timer thread could not be spawned.
    SpawnFailed,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpawnFailed => write!(f, "timer thread spawn failed"),
        }
    }
}

impl std::error::Error for TimerError {}

impl From<TimerError> for Error {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
