//! Simulated MUIC register file.
//!
//! Plugging a cable loads the device-type and ID-ADC registers the part
//! would report for it and raises the matching interrupt flags. Flags clear
//! on read; UVLO is a level that follows VBUS.

use muic_core::cable::ADC_OPEN;
use muic_core::registers::{BusFault, Register, RegisterAccess, control1, device1, int1, int2};
use muic_core::{CableType, UsbPort};

use crate::command::FaultKind;

/// `CHIP_ID` the simulated part reports (vendor 2).
pub const SIM_CHIP_ID: u8 = 0x12;

const REGISTER_SPACE: usize = 0x20;

/// What a cable puts on the connector.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Presentation {
    pub device1: u8,
    pub adc: u8,
    pub vbus: bool,
    /// Extra `INT_FLAG1` bits raised alongside `ATTACH`.
    pub flags: u8,
}

impl Presentation {
    const fn new(device1: u8, adc: u8, vbus: bool) -> Self {
        Self {
            device1,
            adc,
            vbus,
            flags: 0,
        }
    }

    /// Register image for `cable` with its natural VBUS state.
    pub const fn for_cable(cable: CableType) -> Self {
        match cable {
            CableType::None => Self::new(0, ADC_OPEN, false),
            CableType::Usb(UsbPort::Sdp) => Self::new(device1::SDP, ADC_OPEN, true),
            CableType::Usb(UsbPort::Cdp) => Self::new(device1::CDP, ADC_OPEN, true),
            CableType::Otg => Self::new(device1::OTG, 0x00, false),
            CableType::Charger => Self::new(device1::DCP, ADC_OPEN, true),
            CableType::Uart => Self::new(device1::UART, 0x16, false),
            CableType::JigUartOff => Self::new(0, 0x1C, false),
            CableType::JigUartOffWithVbus => Self::new(0, 0x1C, true),
            CableType::JigUartOn => Self::new(0, 0x1D, false),
            CableType::JigUsbOff => Self::new(0, 0x18, false),
            CableType::JigUsbOn => Self::new(0, 0x19, false),
            CableType::Dock => Self::new(0, 0x1A, false),
            CableType::PsCable => Self::new(0, 0x1B, true),
            // Charger detection must be flagged or the part reports SDP.
            CableType::Special200k => Self {
                device1: 0,
                adc: 0x17,
                vbus: true,
                flags: int1::CHG_DET,
            },
            CableType::UnknownWithVbus => Self::new(0, 0x1E, true),
            CableType::UnknownNoVbus => Self::new(0, 0x1E, false),
        }
    }
}

pub struct SimulatedMuic {
    regs: [u8; REGISTER_SPACE],
    vbus: bool,
    /// Further `INT_FLAG1` reads that report a DCD timeout.
    dcd_reads: u8,
    reads: usize,
    writes: usize,
}

impl SimulatedMuic {
    pub fn new() -> Self {
        let mut sim = Self {
            regs: [0; REGISTER_SPACE],
            vbus: false,
            dcd_reads: 0,
            reads: 0,
            writes: 0,
        };
        sim.set(Register::ChipId, SIM_CHIP_ID);
        sim.set(Register::Adc, ADC_OPEN);
        sim.sync_uvlo();
        sim
    }

    pub fn reg(&self, register: Register) -> u8 {
        self.regs[usize::from(register.addr())]
    }

    fn set(&mut self, register: Register, value: u8) {
        self.regs[usize::from(register.addr())] = value;
    }

    fn raise(&mut self, register: Register, bits: u8) {
        let value = self.reg(register) | bits;
        self.set(register, value);
    }

    fn sync_uvlo(&mut self) {
        let flags = self.reg(Register::IntFlag2) & !int2::UVLO;
        let uvlo = if self.vbus { 0 } else { int2::UVLO };
        self.set(Register::IntFlag2, flags | uvlo);
    }

    /// Presents `cable`, optionally overriding whether it supplies VBUS.
    /// Returns the image that was loaded.
    pub fn plug(&mut self, cable: CableType, vbus: Option<bool>) -> Presentation {
        if cable == CableType::None {
            self.unplug();
            return Presentation::for_cable(CableType::None);
        }

        let mut image = Presentation::for_cable(cable);
        if let Some(vbus) = vbus {
            image.vbus = vbus;
        }

        self.vbus = image.vbus;
        self.set(Register::Device1, image.device1);
        self.set(Register::Device2, 0);
        self.set(Register::Adc, image.adc);
        self.raise(Register::IntFlag1, int1::ATTACH | image.flags);
        self.sync_uvlo();
        image
    }

    pub fn unplug(&mut self) {
        self.vbus = false;
        self.set(Register::Device1, 0);
        self.set(Register::Device2, 0);
        self.set(Register::Adc, ADC_OPEN);
        self.raise(Register::IntFlag1, int1::DETACH);
        self.sync_uvlo();
    }

    pub fn raise_fault(&mut self, fault: FaultKind) {
        let bit = match fault {
            FaultKind::OverVoltage => int2::OVP,
            FaultKind::OverCurrent => int2::OCP,
            FaultKind::OverTemperature => int2::OTP,
        };
        self.raise(Register::IntFlag2, bit);
    }

    /// Makes the next `count` flag reads report a DCD timeout.
    pub fn arm_dcd(&mut self, count: u8) {
        self.dcd_reads = count;
    }

    pub const fn dcd_reads(&self) -> u8 {
        self.dcd_reads
    }

    pub fn power_on_reset(&mut self) {
        self.raise(Register::IntFlag2, int2::POR);
    }

    /// True while INT would be asserted: any latched flag is pending.
    pub fn interrupt_pending(&self) -> bool {
        let masked = self.reg(Register::Control1) & control1::INT_MASK != 0;
        let latched =
            self.reg(Register::IntFlag1) != 0 || self.reg(Register::IntFlag2) & !int2::UVLO != 0;
        !masked && latched
    }

    /// Bus transactions served so far, as `(reads, writes)`.
    pub const fn traffic(&self) -> (usize, usize) {
        (self.reads, self.writes)
    }
}

impl Default for SimulatedMuic {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterAccess for SimulatedMuic {
    fn read(&mut self, register: Register) -> Result<u8, BusFault> {
        self.reads += 1;
        let value = self.reg(register);
        match register {
            Register::IntFlag1 => {
                let mut value = value;
                if self.dcd_reads > 0 {
                    self.dcd_reads -= 1;
                    value |= int1::DCD_T;
                }
                self.set(Register::IntFlag1, 0);
                Ok(value)
            }
            Register::IntFlag2 => {
                self.set(Register::IntFlag2, value & int2::UVLO);
                Ok(value)
            }
            _ => Ok(value),
        }
    }

    fn write(&mut self, register: Register, value: u8) -> Result<(), BusFault> {
        self.writes += 1;
        match register {
            // Flags are read-only; the chip id is fixed.
            Register::IntFlag1 | Register::IntFlag2 | Register::ChipId => {}
            _ => self.set(register, value),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use muic_core::cable::classify;
    use muic_core::status::StatusSnapshot;

    use super::*;

    #[test]
    fn every_cable_image_classifies_back_to_itself() {
        for cable in CableType::ALL {
            let mut sim = SimulatedMuic::new();
            sim.plug(cable, None);
            let snapshot = StatusSnapshot::capture(&mut sim).expect("capture");
            assert_eq!(classify(&snapshot), cable, "{cable}");
        }
    }

    #[test]
    fn flags_clear_on_read_but_uvlo_tracks_vbus() {
        let mut sim = SimulatedMuic::new();
        sim.plug(CableType::JigUsbOn, None);
        assert!(sim.interrupt_pending());

        let first = sim.read(Register::IntFlag1).expect("read");
        assert_ne!(first & int1::ATTACH, 0);
        assert_eq!(sim.read(Register::IntFlag1).expect("read"), 0);

        assert_ne!(sim.read(Register::IntFlag2).expect("read") & int2::UVLO, 0);
        assert_ne!(sim.read(Register::IntFlag2).expect("read") & int2::UVLO, 0);
        assert!(!sim.interrupt_pending());

        sim.plug(CableType::Charger, None);
        assert_eq!(sim.read(Register::IntFlag2).expect("read") & int2::UVLO, 0);
    }

    #[test]
    fn vbus_override_changes_column() {
        let mut sim = SimulatedMuic::new();
        let image = sim.plug(CableType::JigUartOff, Some(true));
        assert!(image.vbus);

        let snapshot = StatusSnapshot::capture(&mut sim).expect("capture");
        assert_eq!(classify(&snapshot), CableType::JigUartOffWithVbus);
    }

    #[test]
    fn dcd_reads_are_consumed_per_capture() {
        let mut sim = SimulatedMuic::new();
        sim.arm_dcd(2);
        sim.plug(CableType::Charger, None);

        for _ in 0..2 {
            let flags = sim.read(Register::IntFlag1).expect("read");
            assert_ne!(flags & int1::DCD_T, 0);
        }
        assert_eq!(sim.read(Register::IntFlag1).expect("read") & int1::DCD_T, 0);
        assert_eq!(sim.dcd_reads(), 0);
    }

    #[test]
    fn masked_interrupt_is_not_pending() {
        let mut sim = SimulatedMuic::new();
        sim.write(Register::Control1, control1::INT_MASK)
            .expect("write");
        sim.raise_fault(FaultKind::OverVoltage);
        assert!(!sim.interrupt_pending());
    }
}
