//! System clock adapter.
//!
//! Provides the two clock reads the control loop needs:
//!
//! - **Unix** — `clock_gettime(CLOCK_MONOTONIC)` for scheduling and
//!   `clock_gettime(CLOCK_REALTIME)` for phase measurement, both via libc.
//!   Raw syscalls, no allocation, safe to call from the timer thread.
//! - **elsewhere** — `std::time::Instant` / `SystemTime` so the crate still
//!   builds and tests off-target.

use crate::ports::{ClockPort, WallClock};

/// Clock adapter backed by the operating system.
pub struct SystemClock {
    #[cfg(not(unix))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(unix))]
            start: std::time::Instant::now(),
        }
    }

    #[cfg(unix)]
    fn gettime(clock: libc::clockid_t) -> libc::timespec {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: ts is a valid, writable timespec; both clock ids used in
        // this module are supported on every Unix we target.
        let rc = unsafe { libc::clock_gettime(clock, &mut ts) };
        debug_assert_eq!(rc, 0, "clock_gettime failed");
        ts
    }
}

impl ClockPort for SystemClock {
    #[cfg(unix)]
    fn monotonic_ns(&self) -> u64 {
        let ts = Self::gettime(libc::CLOCK_MONOTONIC);
        (ts.tv_sec as u64) * 1_000_000_000 + ts.tv_nsec as u64
    }

    #[cfg(not(unix))]
    fn monotonic_ns(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    #[cfg(unix)]
    fn wallclock(&self) -> WallClock {
        let ts = Self::gettime(libc::CLOCK_REALTIME);
        WallClock {
            secs: ts.tv_sec as i64,
            subsec_ns: ts.tv_nsec as u32,
        }
    }

    #[cfg(not(unix))]
    fn wallclock(&self) -> WallClock {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        WallClock {
            secs: now.as_secs() as i64,
            subsec_ns: now.subsec_nanos(),
        }
    }
}
