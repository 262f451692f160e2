//! Mux routing state owned by the engine.

use crate::config::MuicConfig;
use crate::hooks::ProcessorPath;

/// Current setting of the D+/D- COM switch.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum SwitchRoute {
    #[default]
    Open,
    Usb(ProcessorPath),
    Uart(ProcessorPath),
}

/// Path preferences plus the routing handlers have applied.
///
/// Only handlers mutate this; it persists across cycles.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PathConfig {
    /// Processor USB data is routed to on attach.
    pub usb: ProcessorPath,
    /// Processor UART is routed to on attach.
    pub uart: ProcessorPath,
    pub route: SwitchRoute,
    /// Mirrors `CONTROL1.AUTO_CONFIG`.
    pub auto_config: bool,
    /// Mirrors `CONTROL1.CHG_DET_EN`.
    pub charge_detect: bool,
}

impl PathConfig {
    pub const fn new(config: &MuicConfig) -> Self {
        Self {
            usb: config.usb_path,
            uart: config.uart_path,
            route: SwitchRoute::Open,
            auto_config: true,
            charge_detect: true,
        }
    }

    /// `true` while USB data is routed to the application processor.
    pub const fn usb_on_ap(&self) -> bool {
        matches!(self.route, SwitchRoute::Usb(ProcessorPath::Ap))
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self::new(&MuicConfig::DEFAULT)
    }
}
