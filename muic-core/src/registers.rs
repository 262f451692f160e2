//! Register map and transport abstraction for the MUIC.
//!
//! Addresses and bit positions are contracts with the part and must not be
//! renumbered. The engine only ever talks to the device through
//! [`RegisterAccess`], which the firmware backs with a mutex-guarded I2C bus
//! and the emulator backs with a simulated register file.

use core::fmt;

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

/// Default 7-bit I2C address of the MUIC.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x14;

/// Addressable MUIC registers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Register {
    ChipId = 0x01,
    Control1 = 0x02,
    IntFlag1 = 0x03,
    IntFlag2 = 0x04,
    IntMask1 = 0x05,
    IntMask2 = 0x06,
    Adc = 0x07,
    Device1 = 0x0A,
    Device2 = 0x0B,
    ManualSw1 = 0x13,
    ManualSw2 = 0x14,
    Reset = 0x1B,
}

impl Register {
    /// Bus address of the register.
    pub const fn addr(self) -> u8 {
        self as u8
    }

    /// Looks up a register by bus address.
    pub const fn from_addr(addr: u8) -> Option<Self> {
        match addr {
            0x01 => Some(Register::ChipId),
            0x02 => Some(Register::Control1),
            0x03 => Some(Register::IntFlag1),
            0x04 => Some(Register::IntFlag2),
            0x05 => Some(Register::IntMask1),
            0x06 => Some(Register::IntMask2),
            0x07 => Some(Register::Adc),
            0x0A => Some(Register::Device1),
            0x0B => Some(Register::Device2),
            0x13 => Some(Register::ManualSw1),
            0x14 => Some(Register::ManualSw2),
            0x1B => Some(Register::Reset),
            _ => None,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{:#04x}", self, self.addr())
    }
}

/// Vendor id field of `CHIP_ID`.
pub const CHIP_ID_VENDOR_MASK: u8 = 0x07;

/// `CONTROL1` bits.
pub mod control1 {
    pub const INT_MASK: u8 = 0x01;
    pub const AUTO_CONFIG: u8 = 0x04;
    pub const CHG_DET_EN: u8 = 0x40;
    pub const ADC_EN: u8 = 0x80;

    /// Value programmed at initialization: interrupts unmasked, automatic
    /// switching and charger detection enabled.
    pub const DEFAULT: u8 = AUTO_CONFIG | CHG_DET_EN | ADC_EN;
}

/// `INT_FLAG1` bits (clear on read).
pub mod int1 {
    pub const ATTACH: u8 = 0x01;
    pub const DETACH: u8 = 0x02;
    pub const CHG_DET: u8 = 0x04;
    pub const DCD_T: u8 = 0x08;
    pub const ADC_CHG: u8 = 0x10;
}

/// `INT_FLAG2` bits (clear on read).
pub mod int2 {
    pub const OTP: u8 = 0x01;
    pub const OVP: u8 = 0x02;
    pub const OCP: u8 = 0x04;
    pub const POR: u8 = 0x10;
    pub const UVLO: u8 = 0x20;
}

/// `DEVICE1` type bits.
pub mod device1 {
    pub const OTG: u8 = 0x01;
    pub const SDP: u8 = 0x04;
    pub const UART: u8 = 0x08;
    pub const CDP: u8 = 0x20;
    pub const DCP: u8 = 0x40;
}

/// `MANUAL_SW1` D-/D+ switch settings.
pub mod manual_sw1 {
    pub const OPEN: u8 = 0x00;
    pub const USB: u8 = 0x24;
    pub const UART: u8 = 0x6C;
}

/// Value written to `RESET` to trigger a soft reset.
pub const RESET_COMMAND: u8 = 0x01;

/// Transport-level failure reported by a [`RegisterAccess`] implementation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BusFault {
    /// The device did not acknowledge its address or data.
    NoAcknowledge,
    /// Bus error or lost arbitration.
    Bus,
    /// Data overrun in the controller.
    Overrun,
    /// Any other transport failure.
    Other,
}

impl BusFault {
    /// Maps an `embedded-hal` I2C error kind onto a bus fault.
    pub fn from_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NoAcknowledge(_) => BusFault::NoAcknowledge,
            ErrorKind::Bus | ErrorKind::ArbitrationLoss => BusFault::Bus,
            ErrorKind::Overrun => BusFault::Overrun,
            _ => BusFault::Other,
        }
    }
}

impl fmt::Display for BusFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusFault::NoAcknowledge => f.write_str("no acknowledge"),
            BusFault::Bus => f.write_str("bus error"),
            BusFault::Overrun => f.write_str("overrun"),
            BusFault::Other => f.write_str("transport failure"),
        }
    }
}

/// Serialized access to MUIC registers.
pub trait RegisterAccess {
    /// Reads one register.
    fn read(&mut self, register: Register) -> Result<u8, BusFault>;

    /// Writes one register.
    fn write(&mut self, register: Register, value: u8) -> Result<(), BusFault>;

    /// Read-modify-write of the bits selected by `mask`.
    fn update_bits(&mut self, register: Register, mask: u8, value: u8) -> Result<(), BusFault> {
        let current = self.read(register)?;
        let next = (current & !mask) | (value & mask);
        if next == current {
            return Ok(());
        }
        self.write(register, next)
    }
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &mut T {
    fn read(&mut self, register: Register) -> Result<u8, BusFault> {
        (**self).read(register)
    }

    fn write(&mut self, register: Register, value: u8) -> Result<(), BusFault> {
        (**self).write(register, value)
    }
}

/// [`RegisterAccess`] over any `embedded-hal` I2C bus.
pub struct I2cRegisters<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> I2cRegisters<I2C> {
    /// Wraps a bus using the default device address.
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, DEFAULT_I2C_ADDRESS)
    }

    /// Wraps a bus using an explicit device address.
    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Consumes the adapter and returns the bus.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> RegisterAccess for I2cRegisters<I2C> {
    fn read(&mut self, register: Register) -> Result<u8, BusFault> {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register.addr()], &mut buffer)
            .map_err(|err| BusFault::from_kind(err.kind()))?;
        Ok(buffer[0])
    }

    fn write(&mut self, register: Register, value: u8) -> Result<(), BusFault> {
        self.i2c
            .write(self.address, &[register.addr(), value])
            .map_err(|err| BusFault::from_kind(err.kind()))
    }
}
