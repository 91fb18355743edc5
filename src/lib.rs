//! Disciplined pulse-per-second generator.
//!
//! Generates one pulse per wall-clock second on a digital output line,
//! disciplined to the real-time clock by a single-pole feedback loop, plus
//! a lock-indicator line showing whether alignment is within tolerance.
//!
//! The pure-logic modules (`control`, `scheduler`, `config`) run anywhere;
//! hardware access is confined to `drivers` and `adapters` and the
//! Raspberry Pi backend sits behind the `hardware` cargo feature.

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod ports;
pub mod scheduler;
pub mod signals;
