//! Pulse generator — main entry point.
//!
//! Lifecycle: acquire both output lines (all-or-nothing), align the first
//! edge to the next second boundary, hand the scheduler to the timer
//! engine, then wait for a shutdown signal. Teardown order is fixed:
//! cancel the timers (blocking until the callback stream is quiescent),
//! deassert the lines, release them.

use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use ppsgen::adapters::time::SystemClock;
use ppsgen::config::PpsConfig;
use ppsgen::drivers::gpio::GpioOutput;
use ppsgen::drivers::timer::TimerEngine;
use ppsgen::scheduler::PulseScheduler;
use ppsgen::signals;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("ppsgen v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Configuration ──────────────────────────────────────
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            let cfg = PpsConfig::from_json(&raw).with_context(|| format!("parsing {path}"))?;
            info!("config loaded from {path}");
            cfg
        }
        None => {
            warn!("no config file given, using defaults");
            PpsConfig::default()
        }
    };
    config
        .validate()
        .map_err(ppsgen::error::Error::Config)
        .context("invalid configuration")?;

    signals::install();

    // ── 2. Resource acquisition ───────────────────────────────
    // All-or-nothing: a failure here has already released any line that
    // was taken, and the process exits without starting degraded.
    let output = GpioOutput::acquire(&[config.pulse_line, config.lock_line])
        .context("acquiring output lines")?;

    // ── 3. Alignment and start ────────────────────────────────
    let mut scheduler = PulseScheduler::new(SystemClock::new(), output, &config);
    scheduler.start();
    let engine = TimerEngine::spawn(scheduler).context("starting timer engine")?;
    info!(
        "pulse on line {}, lock indicator on line {}, width {} ms",
        config.pulse_line, config.lock_line, config.pulse_width_ms
    );

    // ── 4. Run until signalled ────────────────────────────────
    while !signals::requested() && !engine.is_finished() {
        std::thread::sleep(Duration::from_millis(50));
    }
    if engine.is_finished() && !signals::requested() {
        engine.stop();
        anyhow::bail!("timer engine terminated unexpectedly");
    }

    // ── 5. Ordered teardown ───────────────────────────────────
    info!("shutting down");
    engine.stop(); // blocks: timers cancelled, lines deasserted, then released
    Ok(())
}
