//! Pure control logic: the interval feedback controller and the lock
//! threshold comparison. Nothing in here touches hardware or can fail.

pub mod estimator;
pub mod lock;

pub use estimator::IntervalEstimator;
pub use lock::LockEvaluator;

/// Length of one nominal second in nanoseconds.
pub const NANOS_PER_SEC: i64 = 1_000_000_000;
