//! Timer engine — executes the scheduler's callback stream.
//!
//! One dedicated, named thread owns the [`PulseScheduler`] outright and
//! loops: sleep toward the earliest armed deadline, then poll. Because a
//! single thread runs every callback, the mutual-exclusion requirement
//! between the edge and width callbacks holds by construction, and re-arm
//! from within a firing is an ordinary field write rather than recursion.
//!
//! Sleeps are sliced (at most [`STOP_POLL_NS`] per wait) so a stop request
//! is honoured promptly, but each slice re-derives its target from the
//! armed deadline, so slicing adds no drift. On Linux the waits go through
//! `clock_nanosleep` on the monotonic clock; elsewhere `thread::sleep`.
//!
//! ## Cancellation contract
//!
//! [`TimerEngine::stop`] sets the stop flag and joins the thread. The
//! thread finishes any in-flight poll, runs the scheduler's `shutdown`
//! (cancelling both timers and deasserting both lines) and only then
//! exits — so when `stop` returns, no callback can ever fire again and the
//! output lines are already low. Dropping the scheduler (releasing the
//! lines) happens inside the thread, strictly after shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{error, info};

use crate::error::{Result, TimerError};
use crate::ports::{ClockPort, OutputPort};
use crate::scheduler::PulseScheduler;

/// Upper bound on one sleep slice; bounds how long `stop` can block.
const STOP_POLL_NS: u64 = 20_000_000;

/// Handle to the running callback stream.
pub struct TimerEngine {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TimerEngine {
    /// Take ownership of a started scheduler and begin firing its timers.
    pub fn spawn<C, O>(scheduler: PulseScheduler<C, O>) -> Result<Self>
    where
        C: ClockPort + Send + 'static,
        O: OutputPort + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = std::thread::Builder::new()
            .name("pps-timer".into())
            .spawn(move || run(scheduler, &thread_stop))
            .map_err(|_| TimerError::SpawnFailed)?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Whether the stream has terminated on its own (fatal output error or
    /// all timers unarmed).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Cancel the stream, blocking until it is quiescent. See the module
    /// docs for the ordering guarantees.
    pub fn stop(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("timer thread panicked");
            }
        }
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn run<C, O>(mut scheduler: PulseScheduler<C, O>, stop: &AtomicBool)
where
    C: ClockPort,
    O: OutputPort,
{
    info!("timer thread running");
    while !stop.load(Ordering::Relaxed) {
        let Some(deadline) = scheduler.next_deadline() else {
            break;
        };
        let now = scheduler.now_ns();
        if now < deadline {
            sleep_ns((deadline - now).min(STOP_POLL_NS));
            continue;
        }
        if let Err(e) = scheduler.poll(now) {
            // Output failures mid-cycle are terminal, not retried.
            error!("cycle aborted: {e}");
            break;
        }
    }
    scheduler.shutdown();
}

/// Sleep for `delay` nanoseconds of monotonic time.
#[cfg(target_os = "linux")]
fn sleep_ns(delay: u64) {
    let ts = libc::timespec {
        tv_sec: (delay / 1_000_000_000) as libc::time_t,
        tv_nsec: (delay % 1_000_000_000) as libc::c_long,
    };
    // SAFETY: ts is valid and the remainder pointer may be null for a
    // relative sleep. An EINTR return just means we re-check the deadline
    // one slice early.
    unsafe {
        libc::clock_nanosleep(libc::CLOCK_MONOTONIC, 0, &ts, std::ptr::null_mut());
    }
}

#[cfg(not(target_os = "linux"))]
fn sleep_ns(delay: u64) {
    std::thread::sleep(std::time::Duration::from_nanos(delay));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::time::SystemClock;
    use crate::config::PpsConfig;
    use crate::error::OutputError;
    use crate::ports::LineId;
    use std::sync::Mutex;

    /// Thread-safe recording output for engine tests.
    #[derive(Clone, Default)]
    struct SharedOutput {
        calls: Arc<Mutex<Vec<(LineId, bool)>>>,
    }

    impl OutputPort for SharedOutput {
        fn set(&mut self, line: LineId, high: bool) -> std::result::Result<(), OutputError> {
            self.calls.lock().unwrap().push((line, high));
            Ok(())
        }
    }

    #[test]
    fn stop_is_blocking_and_deasserts_lines() {
        let output = SharedOutput::default();
        let observer = output.clone();
        let mut sched = PulseScheduler::new(SystemClock::new(), output, &PpsConfig::default());
        sched.start();

        let engine = TimerEngine::spawn(sched).unwrap();
        engine.stop();

        // After stop returns the thread is gone and teardown has run:
        // the last writes are the pulse and lock lines going low.
        let calls = observer.calls.lock().unwrap();
        let n = calls.len();
        assert!(n >= 2);
        assert_eq!(&calls[n - 2..], &[(5, false), (6, false)]);
    }

    #[test]
    fn engine_exits_when_nothing_is_armed() {
        let output = SharedOutput::default();
        // Never started: no deadline armed, thread should finish by itself.
        let sched = PulseScheduler::new(SystemClock::new(), output, &PpsConfig::default());
        let engine = TimerEngine::spawn(sched).unwrap();
        for _ in 0..100 {
            if engine.is_finished() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(engine.is_finished());
    }
}
