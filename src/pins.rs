//! Default GPIO line assignments for the reference deployment.
//!
//! Single source of truth for the out-of-the-box pin numbers — the
//! configuration surface ([`crate::config::PpsConfig`]) can override both,
//! so nothing outside `PpsConfig::default()` should reference these.
//!
//! BCM numbering, matching the Raspberry Pi header.

/// Digital output asserted once per second to mark the boundary.
pub const PPS_LINE: u8 = 5;

/// Digital output signalling that the pulse is within tolerance.
pub const LOCK_LINE: u8 = 6;
