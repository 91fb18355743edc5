//! Pulse scheduler — the timer state machine at the heart of the crate.
//!
//! ```text
//!                 ┌──────────── edge timer (self-re-arming) ───────────┐
//!                 ▼                                                    │
//!   fire ──▶ assert pulse ──▶ sample wall clock ──▶ correct interval ──┘
//!                 │                     │
//!                 │                     └──▶ lock evaluate ──▶ indicator line
//!                 └──▶ arm width timer (one-shot) ──▶ deassert pulse
//! ```
//!
//! The scheduler is deliberately decoupled from its execution context: it
//! exposes the earliest armed deadline and a `poll` that services whatever
//! is due. The [`TimerEngine`](crate::drivers::timer::TimerEngine) drives it
//! on a dedicated thread in production; tests drive it directly with a mock
//! clock, which makes every transition deterministic.
//!
//! Re-arming the edge timer is relative to the deadline that just fired,
//! not to "now", so scheduling jitter between the deadline and the poll
//! never compounds into the interval estimate.

use log::{debug, info};

use crate::config::PpsConfig;
use crate::control::{IntervalEstimator, LockEvaluator, NANOS_PER_SEC};
use crate::error::Result;
use crate::ports::{ClockPort, LineId, OutputPort};

/// Floor for the edge re-arm delay. The estimator itself is unclamped; this
/// only guards the conversion of the estimate into a deadline, because a
/// non-positive delay would wedge the callback stream with no recovery.
pub const MIN_REARM_NS: i64 = 1_000_000;

// ---------------------------------------------------------------------------
// Timer handle
// ---------------------------------------------------------------------------

/// One-shot timer slot: unarmed, or armed with an absolute monotonic
/// deadline. Both of the scheduler's timers are these; the edge timer is
/// periodic only through explicit re-arming.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline {
    at_ns: Option<u64>,
}

impl Deadline {
    /// Arm for an absolute monotonic instant.
    pub fn arm_at(&mut self, at_ns: u64) {
        self.at_ns = Some(at_ns);
    }

    /// Arm relative to `now_ns`.
    pub fn arm_after(&mut self, now_ns: u64, delay_ns: u64) {
        self.at_ns = Some(now_ns.saturating_add(delay_ns));
    }

    /// Disarm without firing.
    pub fn cancel(&mut self) {
        self.at_ns = None;
    }

    /// The armed deadline, if any.
    pub fn at(&self) -> Option<u64> {
        self.at_ns
    }

    /// If armed and due at `now_ns`, disarm and return the deadline the
    /// timer was armed for (which may be earlier than `now_ns`).
    fn take_due(&mut self, now_ns: u64) -> Option<u64> {
        match self.at_ns {
            Some(at) if at <= now_ns => self.at_ns.take(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Owns the two timer handles, the output lines' state, and the controller,
/// and runs the per-cycle sequence on every edge fire.
///
/// All state is touched only from `poll`/`start`/`shutdown`; the execution
/// context must guarantee those never run concurrently (the engine does so
/// by owning the scheduler on a single thread).
pub struct PulseScheduler<C: ClockPort, O: OutputPort> {
    clock: C,
    output: O,
    estimator: IntervalEstimator,
    lock: LockEvaluator,
    pulse_line: LineId,
    lock_line: LineId,
    pulse_width_ns: u64,
    edge_timer: Deadline,
    width_timer: Deadline,
    locked: bool,
}

impl<C: ClockPort, O: OutputPort> PulseScheduler<C, O> {
    pub fn new(clock: C, output: O, config: &PpsConfig) -> Self {
        Self {
            clock,
            output,
            estimator: IntervalEstimator::new(config.gain_shift),
            lock: LockEvaluator::new(config.lock_threshold_ns),
            pulse_line: config.pulse_line,
            lock_line: config.lock_line,
            pulse_width_ns: config.pulse_width_ns(),
            edge_timer: Deadline::default(),
            width_timer: Deadline::default(),
            locked: false,
        }
    }

    /// Align the first edge to the next wall-clock second boundary and arm
    /// the edge timer for it.
    pub fn start(&mut self) {
        let wc = self.clock.wallclock();
        let delay = (NANOS_PER_SEC as u64) - u64::from(wc.subsec_ns);
        let now = self.clock.monotonic_ns();
        self.edge_timer.arm_after(now, delay);
        info!("first edge in {delay} ns (aligning to the next second boundary)");
    }

    /// Earliest armed deadline, in monotonic nanoseconds. `None` once both
    /// timers are cancelled.
    pub fn next_deadline(&self) -> Option<u64> {
        match (self.edge_timer.at(), self.width_timer.at()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Service whatever is due at `now_ns`. The width timer goes first so a
    /// pulse is never deasserted after the next cycle's assert when both
    /// fall inside one poll.
    pub fn poll(&mut self, now_ns: u64) -> Result<()> {
        if self.width_timer.take_due(now_ns).is_some() {
            self.on_width_elapsed()?;
        }
        if let Some(expected) = self.edge_timer.take_due(now_ns) {
            self.on_edge(expected, now_ns)?;
        }
        Ok(())
    }

    /// Monotonic now, read through the scheduler's own clock.
    pub fn now_ns(&self) -> u64 {
        self.clock.monotonic_ns()
    }

    /// Lock state as of the last completed cycle.
    pub fn locked(&self) -> bool {
        self.locked
    }

    /// Current interval estimate.
    pub fn interval_ns(&self) -> i64 {
        self.estimator.interval_ns()
    }

    /// Cancel both timers and deassert both lines. After this returns no
    /// poll will observe a due deadline; write failures during teardown are
    /// logged and swallowed so shutdown always completes.
    pub fn shutdown(&mut self) {
        self.edge_timer.cancel();
        self.width_timer.cancel();
        if let Err(e) = self.output.set(self.pulse_line, false) {
            log::warn!("teardown: {e}");
        }
        if let Err(e) = self.output.set(self.lock_line, false) {
            log::warn!("teardown: {e}");
        }
        self.locked = false;
        info!("pulse output stopped");
    }

    /// Edge timer fired: the whole per-cycle sequence. `expected_ns` is the
    /// deadline the timer was armed for; `now_ns` is when the poll ran.
    fn on_edge(&mut self, expected_ns: u64, now_ns: u64) -> Result<()> {
        self.output.set(self.pulse_line, true)?;
        let wc = self.clock.wallclock();

        let interval = self.estimator.update(wc.subsec_ns);
        self.edge_timer
            .arm_at(expected_ns.saturating_add(interval.max(MIN_REARM_NS) as u64));
        self.width_timer.arm_after(now_ns, self.pulse_width_ns);

        self.locked = self.lock.evaluate(wc.subsec_ns);
        self.output.set(self.lock_line, self.locked)?;

        debug!(
            "edge: phase={} ns interval={} ns locked={}",
            wc.subsec_ns, interval, self.locked
        );
        Ok(())
    }

    /// Width timer fired: end the pulse. One-shot — stays unarmed until the
    /// next edge re-arms it.
    fn on_width_elapsed(&mut self) -> Result<()> {
        self.output.set(self.pulse_line, false)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::WallClock;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct ClockState {
        mono_ns: u64,
        wall_secs: i64,
        wall_subsec: u32,
    }

    /// Manually steppable clock shared between test and scheduler.
    #[derive(Clone, Default)]
    struct TestClock(Rc<RefCell<ClockState>>);

    impl TestClock {
        fn set(&self, mono_ns: u64, wall_subsec: u32) {
            let mut s = self.0.borrow_mut();
            s.mono_ns = mono_ns;
            s.wall_subsec = wall_subsec;
        }
    }

    impl ClockPort for TestClock {
        fn monotonic_ns(&self) -> u64 {
            self.0.borrow().mono_ns
        }

        fn wallclock(&self) -> WallClock {
            let s = self.0.borrow();
            WallClock {
                secs: s.wall_secs,
                subsec_ns: s.wall_subsec,
            }
        }
    }

    /// Records every line write.
    #[derive(Clone, Default)]
    struct TestOutput {
        calls: Rc<RefCell<Vec<(LineId, bool)>>>,
    }

    impl TestOutput {
        fn calls(&self) -> Vec<(LineId, bool)> {
            self.calls.borrow().clone()
        }
    }

    impl OutputPort for TestOutput {
        fn set(
            &mut self,
            line: LineId,
            high: bool,
        ) -> std::result::Result<(), crate::error::OutputError> {
            self.calls.borrow_mut().push((line, high));
            Ok(())
        }
    }

    fn scheduler() -> (TestClock, TestOutput, PulseScheduler<TestClock, TestOutput>) {
        let clock = TestClock::default();
        let output = TestOutput::default();
        let sched = PulseScheduler::new(clock.clone(), output.clone(), &PpsConfig::default());
        (clock, output, sched)
    }

    const SEC: u64 = 1_000_000_000;

    #[test]
    fn startup_aligns_first_edge_to_next_boundary() {
        let (clock, _out, mut sched) = scheduler();
        clock.set(42, 300_000_000);
        sched.start();
        assert_eq!(sched.next_deadline(), Some(42 + 700_000_000));
    }

    #[test]
    fn edge_fire_runs_full_cycle() {
        let (clock, out, mut sched) = scheduler();
        clock.set(0, 300_000_000);
        sched.start();

        // Fire exactly on a second boundary.
        clock.set(700_000_000, 0);
        sched.poll(700_000_000).unwrap();

        assert_eq!(out.calls(), vec![(5, true), (6, true)]);
        assert!(sched.locked());
        assert_eq!(sched.interval_ns(), 1_000_000_000);
        // Edge re-armed one interval ahead, width 100 ms ahead.
        assert_eq!(sched.edge_timer.at(), Some(700_000_000 + SEC));
        assert_eq!(sched.width_timer.at(), Some(700_000_000 + 100_000_000));
        assert_eq!(sched.next_deadline(), Some(800_000_000));
    }

    #[test]
    fn late_sample_rearms_with_corrected_interval() {
        let (clock, out, mut sched) = scheduler();
        clock.set(0, 0);
        sched.start();

        // Phase 600 ms: complement 400 ms, correction +200 ms.
        clock.set(SEC, 600_000_000);
        sched.poll(SEC).unwrap();

        assert_eq!(sched.interval_ns(), 1_200_000_000);
        assert_eq!(sched.edge_timer.at(), Some(SEC + 1_200_000_000));
        assert!(!sched.locked());
        assert_eq!(out.calls().last(), Some(&(6, false)));
    }

    #[test]
    fn rearm_is_relative_to_expected_fire_time() {
        let (clock, _out, mut sched) = scheduler();
        clock.set(0, 0);
        sched.start();
        let expected = SEC;

        // Poll arrives 3 ms after the deadline; the re-arm must ignore the
        // jitter and chain from the deadline itself.
        clock.set(expected + 3_000_000, 0);
        sched.poll(expected + 3_000_000).unwrap();

        assert_eq!(sched.edge_timer.at(), Some(expected + SEC));
        // The pulse width, by contrast, runs from the actual assert.
        assert_eq!(
            sched.width_timer.at(),
            Some(expected + 3_000_000 + 100_000_000)
        );
    }

    #[test]
    fn width_timer_deasserts_pulse_and_stays_unarmed() {
        let (clock, out, mut sched) = scheduler();
        clock.set(0, 0);
        sched.start();
        clock.set(SEC, 0);
        sched.poll(SEC).unwrap();

        clock.set(SEC + 100_000_000, 100_000_000);
        sched.poll(SEC + 100_000_000).unwrap();

        assert_eq!(out.calls().last(), Some(&(5, false)));
        assert!(sched.width_timer.at().is_none());
        // Only the edge timer remains armed.
        assert_eq!(sched.next_deadline(), sched.edge_timer.at());
    }

    #[test]
    fn width_timer_rearmed_fresh_each_cycle() {
        let (clock, _out, mut sched) = scheduler();
        clock.set(0, 0);
        sched.start();

        clock.set(SEC, 0);
        sched.poll(SEC).unwrap();
        let first_width = sched.width_timer.at().unwrap();

        clock.set(SEC + 100_000_000, 100_000_000);
        sched.poll(SEC + 100_000_000).unwrap();

        clock.set(2 * SEC, 0);
        sched.poll(2 * SEC).unwrap();
        assert_eq!(sched.width_timer.at(), Some(2 * SEC + 100_000_000));
        assert_ne!(sched.width_timer.at(), Some(first_width));
    }

    #[test]
    fn both_due_in_one_poll_services_width_first() {
        let (clock, out, mut sched) = scheduler();
        clock.set(0, 0);
        sched.start();
        clock.set(SEC, 0);
        sched.poll(SEC).unwrap();

        // Skip past both the width deadline and the next edge.
        clock.set(2 * SEC + 1, 0);
        sched.poll(2 * SEC + 1).unwrap();

        let calls = out.calls();
        let tail = &calls[calls.len() - 3..];
        assert_eq!(tail, &[(5, false), (5, true), (6, true)]);
    }

    #[test]
    fn shutdown_cancels_timers_and_deasserts_lines() {
        let (clock, out, mut sched) = scheduler();
        clock.set(0, 0);
        sched.start();
        clock.set(SEC, 0);
        sched.poll(SEC).unwrap();

        sched.shutdown();
        assert_eq!(sched.next_deadline(), None);
        assert!(!sched.locked());
        let calls = out.calls();
        assert_eq!(&calls[calls.len() - 2..], &[(5, false), (6, false)]);

        // A pending firing injected after shutdown must not be observable.
        let interval_before = sched.interval_ns();
        clock.set(10 * SEC, 0);
        sched.poll(10 * SEC).unwrap();
        assert_eq!(out.calls().len(), calls.len());
        assert_eq!(sched.interval_ns(), interval_before);
    }

    #[test]
    fn rearm_delay_is_floored_for_degenerate_estimates() {
        let (clock, _out, mut sched) = scheduler();
        clock.set(0, 0);
        sched.start();

        // Worst-case early samples drive the (unclamped) estimate negative
        // after a few cycles; the armed deadline must still advance by at
        // least the floor.
        let mut expected = SEC;
        for _ in 0..6 {
            clock.set(expected, 499_999_999);
            sched.poll(expected).unwrap();
            let next = sched.edge_timer.at().unwrap();
            assert!(next >= expected + MIN_REARM_NS as u64);
            expected = next;
        }
        assert!(sched.interval_ns() < 0);
    }

    #[test]
    fn poll_with_nothing_due_is_a_no_op() {
        let (clock, out, mut sched) = scheduler();
        clock.set(0, 500_000_000);
        sched.start();
        sched.poll(100).unwrap();
        assert!(out.calls().is_empty());
    }
}
