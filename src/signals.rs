//! Shutdown signal handling.
//!
//! SIGINT and SIGTERM set a process-wide atomic flag that the main wait
//! loop polls. The handlers are async-signal-safe: a single relaxed store,
//! nothing else.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Install the SIGINT/SIGTERM handlers. Call once, before the timer engine
/// starts. On non-Unix targets this is a no-op and shutdown can only be
/// requested programmatically.
pub fn install() {
    #[cfg(unix)]
    // SAFETY: the handler only performs a relaxed atomic store.
    unsafe {
        let h = handler as extern "C" fn(libc::c_int) as libc::sighandler_t;
        libc::signal(libc::SIGINT, h);
        libc::signal(libc::SIGTERM, h);
    }
}

#[cfg(unix)]
extern "C" fn handler(_: libc::c_int) {
    SHUTDOWN.store(true, Ordering::Relaxed);
}

/// Whether a shutdown signal has arrived.
pub fn requested() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Request shutdown from code (tests, supervision).
pub fn request() {
    SHUTDOWN.store(true, Ordering::Relaxed);
}
