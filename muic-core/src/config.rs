//! Construction-time configuration for the engine.

use core::time::Duration;

use crate::hooks::ProcessorPath;
use crate::registers::DEFAULT_I2C_ADDRESS;

/// Maximum number of DCD-timeout re-snapshots before the cable is forced to
/// a charger.
pub const DCD_RETRY_LIMIT: u8 = 50;

/// Delay between two DCD-timeout re-snapshots.
pub const DCD_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Path preferences and chip parameters.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MuicConfig {
    pub usb_path: ProcessorPath,
    pub uart_path: ProcessorPath,
    /// Vendor id checked against `CHIP_ID` during initialization.
    pub expected_vendor_id: Option<u8>,
    /// Values written to `INT_MASK1` and `INT_MASK2`.
    pub irq_mask: [u8; 2],
    pub i2c_address: u8,
}

impl MuicConfig {
    pub const DEFAULT: MuicConfig = MuicConfig {
        usb_path: ProcessorPath::Ap,
        uart_path: ProcessorPath::Ap,
        expected_vendor_id: None,
        irq_mask: [0, 0],
        i2c_address: DEFAULT_I2C_ADDRESS,
    };

    #[must_use]
    pub const fn with_usb_path(mut self, path: ProcessorPath) -> Self {
        self.usb_path = path;
        self
    }

    #[must_use]
    pub const fn with_uart_path(mut self, path: ProcessorPath) -> Self {
        self.uart_path = path;
        self
    }

    #[must_use]
    pub const fn with_vendor_id(mut self, vendor: u8) -> Self {
        self.expected_vendor_id = Some(vendor);
        self
    }

    #[must_use]
    pub const fn with_irq_mask(mut self, mask: [u8; 2]) -> Self {
        self.irq_mask = mask;
        self
    }

    #[must_use]
    pub const fn with_i2c_address(mut self, address: u8) -> Self {
        self.i2c_address = address;
        self
    }
}

impl Default for MuicConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
