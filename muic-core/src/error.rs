//! Error kinds surfaced inside a detection cycle.
//!
//! None of these escape the engine as a failure of the caller: a cycle either
//! completes, aborts early on a bus error, or fails safe. They are recorded in
//! telemetry so the runtime can log them.

use core::fmt;

use crate::registers::{BusFault, Register};

/// Over-current, over-voltage, and over-temperature conditions flagged by the part.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HardwareFault {
    OverCurrent,
    OverVoltage,
    OverTemperature,
}

impl fmt::Display for HardwareFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareFault::OverCurrent => f.write_str("OCP"),
            HardwareFault::OverVoltage => f.write_str("OVP"),
            HardwareFault::OverTemperature => f.write_str("OTP"),
        }
    }
}

/// Collaborator callback that reported failure.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Callback {
    Charger,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MuicError {
    /// Register transport failed; the current cycle is abandoned.
    RegisterIo { register: Register, fault: BusFault },
    /// ID-ADC code outside the lookup table.
    InvalidAdcCode(u8),
    /// A platform callback failed; classification falls back to `None`.
    CallbackFailure(Callback),
    /// Protection circuit tripped.
    HardwareFault(HardwareFault),
    /// `CHIP_ID` vendor field did not match the configured vendor.
    ChipMismatch { expected: u8, found: u8 },
}

impl MuicError {
    /// Builds a closure that tags a bus fault with the register involved.
    pub fn io(register: Register) -> impl Fn(BusFault) -> MuicError {
        move |fault| MuicError::RegisterIo { register, fault }
    }
}

impl fmt::Display for MuicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MuicError::RegisterIo { register, fault } => {
                write!(f, "register I/O on {register}: {fault}")
            }
            MuicError::InvalidAdcCode(code) => write!(f, "invalid ID-ADC code {code:#04x}"),
            MuicError::CallbackFailure(Callback::Charger) => {
                f.write_str("charger callback failed")
            }
            MuicError::HardwareFault(fault) => write!(f, "hardware fault {fault}"),
            MuicError::ChipMismatch { expected, found } => {
                write!(f, "vendor id {found:#04x} (expected {expected:#04x})")
            }
        }
    }
}
