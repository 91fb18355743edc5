//! GPIO output driver.
//!
//! ## Dual-backend design
//!
//! With the `hardware` feature: drives Raspberry Pi GPIO lines through
//! `rppal`. Without it: tracks line levels in memory so the crate builds
//! and tests on any host.
//!
//! Acquisition is all-or-nothing. On the hardware backend, dropping an
//! `rppal` pin releases it and resets the line, so a failure partway
//! through acquisition releases whatever was already taken before the
//! error propagates. The system never holds one line without the other.

use log::info;

use crate::error::OutputError;
use crate::ports::{LineId, OutputPort};

// ---------------------------------------------------------------------------
// Hardware backend (Raspberry Pi)
// ---------------------------------------------------------------------------

#[cfg(feature = "hardware")]
pub struct GpioOutput {
    pins: Vec<(LineId, rppal::gpio::OutputPin)>,
}

#[cfg(feature = "hardware")]
impl GpioOutput {
    /// Reserve every line in `lines` as an output, initially low.
    pub fn acquire(lines: &[LineId]) -> Result<Self, OutputError> {
        let gpio = rppal::gpio::Gpio::new()
            .map_err(|_| OutputError::Unavailable(lines.first().copied().unwrap_or_default()))?;
        let mut pins = Vec::with_capacity(lines.len());
        for &line in lines {
            if pins.iter().any(|(l, _)| *l == line) {
                return Err(OutputError::Unavailable(line));
            }
            match gpio.get(line) {
                // into_output_low drives the line low immediately.
                Ok(pin) => pins.push((line, pin.into_output_low())),
                // `pins` drops here, releasing the lines taken so far.
                Err(_) => return Err(OutputError::Unavailable(line)),
            }
        }
        info!("acquired output lines {lines:?}");
        Ok(Self { pins })
    }
}

#[cfg(feature = "hardware")]
impl OutputPort for GpioOutput {
    fn set(&mut self, line: LineId, high: bool) -> Result<(), OutputError> {
        let (_, pin) = self
            .pins
            .iter_mut()
            .find(|(l, _)| *l == line)
            .ok_or(OutputError::WriteFailed(line))?;
        if high {
            pin.set_high();
        } else {
            pin.set_low();
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Simulation backend
// ---------------------------------------------------------------------------

#[cfg(not(feature = "hardware"))]
pub struct GpioOutput {
    levels: Vec<(LineId, bool)>,
}

#[cfg(not(feature = "hardware"))]
impl GpioOutput {
    /// Reserve every line in `lines`, initially low. Mirrors the hardware
    /// backend's contract: a line can only be reserved once per set.
    pub fn acquire(lines: &[LineId]) -> Result<Self, OutputError> {
        let mut levels = Vec::with_capacity(lines.len());
        for &line in lines {
            if levels.iter().any(|(l, _)| *l == line) {
                return Err(OutputError::Unavailable(line));
            }
            levels.push((line, false));
        }
        info!("acquired output lines {lines:?} (sim)");
        Ok(Self { levels })
    }

    /// Current level of a reserved line.
    pub fn level(&self, line: LineId) -> Option<bool> {
        self.levels.iter().find(|(l, _)| *l == line).map(|(_, v)| *v)
    }
}

#[cfg(not(feature = "hardware"))]
impl OutputPort for GpioOutput {
    fn set(&mut self, line: LineId, high: bool) -> Result<(), OutputError> {
        let slot = self
            .levels
            .iter_mut()
            .find(|(l, _)| *l == line)
            .ok_or(OutputError::WriteFailed(line))?;
        slot.1 = high;
        Ok(())
    }
}
