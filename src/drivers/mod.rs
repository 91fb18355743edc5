//! Hardware-facing drivers: the GPIO output backend and the timer engine
//! that executes the scheduler's callback stream.

pub mod gpio;
pub mod timer;
