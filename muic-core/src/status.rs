//! Raw status snapshots and the resolved status derived from them.
//!
//! A [`StatusSnapshot`] is captured once per poll and never mutated. The
//! [`ResolvedStatus`] adds the classification and one [`StatusBits`] flag per
//! derived boolean; dispatch compares the bitmask views of consecutive
//! resolved statuses to find edges.

use bitflags::bitflags;

use crate::cable::{ADC_OPEN, ADC_TABLE_SIZE, CableType, classify};
use crate::error::MuicError;
use crate::registers::{Register, RegisterAccess, int1, int2};

/// ID-ADC value before the first capture.
pub const ADC_SENTINEL: u8 = 0xFF;

/// Raw register contents captured in one poll.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusSnapshot {
    irq_flags: [u8; 2],
    device_reg: [u8; 2],
    id_adc: u8,
    vbus_present: bool,
}

impl StatusSnapshot {
    /// Snapshot used before anything has been read from the part.
    pub const INITIAL: StatusSnapshot = StatusSnapshot {
        irq_flags: [0; 2],
        device_reg: [0; 2],
        id_adc: ADC_SENTINEL,
        vbus_present: false,
    };

    /// Builds a snapshot from raw register values. VBUS presence is derived
    /// from the UVLO flag.
    pub const fn from_raw(irq_flags: [u8; 2], device_reg: [u8; 2], id_adc: u8) -> Self {
        Self {
            irq_flags,
            device_reg,
            id_adc,
            vbus_present: irq_flags[1] & int2::UVLO == 0,
        }
    }

    /// Reads interrupt flags, ID-ADC, and device type registers.
    ///
    /// The interrupt flags clear on read, so a capture consumes them.
    pub fn capture<B: RegisterAccess + ?Sized>(bus: &mut B) -> Result<Self, MuicError> {
        let flag1 = read(bus, Register::IntFlag1)?;
        let flag2 = read(bus, Register::IntFlag2)?;
        let adc = read(bus, Register::Adc)?;
        let device1 = read(bus, Register::Device1)?;
        let device2 = read(bus, Register::Device2)?;
        Ok(Self::from_raw([flag1, flag2], [device1, device2], adc))
    }

    pub const fn irq_flags(&self) -> [u8; 2] {
        self.irq_flags
    }

    pub const fn device_reg(&self) -> [u8; 2] {
        self.device_reg
    }

    /// Device-type registers combined little-endian.
    pub const fn device_code(&self) -> u16 {
        u16::from_le_bytes(self.device_reg)
    }

    pub const fn id_adc(&self) -> u8 {
        self.id_adc
    }

    pub const fn vbus_present(&self) -> bool {
        self.vbus_present
    }

    pub const fn attach(&self) -> bool {
        self.irq_flags[0] & int1::ATTACH != 0
    }

    pub const fn detach(&self) -> bool {
        self.irq_flags[0] & int1::DETACH != 0
    }

    pub const fn charger_detect(&self) -> bool {
        self.irq_flags[0] & int1::CHG_DET != 0
    }

    pub const fn dcd_timeout(&self) -> bool {
        self.irq_flags[0] & int1::DCD_T != 0
    }

    pub const fn adc_change(&self) -> bool {
        self.irq_flags[0] & int1::ADC_CHG != 0
    }

    pub const fn over_temperature(&self) -> bool {
        self.irq_flags[1] & int2::OTP != 0
    }

    pub const fn over_voltage(&self) -> bool {
        self.irq_flags[1] & int2::OVP != 0
    }

    pub const fn over_current(&self) -> bool {
        self.irq_flags[1] & int2::OCP != 0
    }

    pub const fn power_on_reset(&self) -> bool {
        self.irq_flags[1] & int2::POR != 0
    }

    pub const fn under_voltage(&self) -> bool {
        self.irq_flags[1] & int2::UVLO != 0
    }

    /// `true` when something with a resistor sits on the ID pin.
    pub const fn has_accessory(&self) -> bool {
        (self.id_adc as usize) < ADC_TABLE_SIZE && self.id_adc != ADC_OPEN
    }
}

fn read<B: RegisterAccess + ?Sized>(bus: &mut B, register: Register) -> Result<u8, MuicError> {
    bus.read(register).map_err(MuicError::io(register))
}

bitflags! {
    /// Bitmask view of a [`ResolvedStatus`], one bit per derived boolean.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct StatusBits: u32 {
        const VBUS = 1 << 0;
        const OCP = 1 << 1;
        const OVP = 1 << 2;
        const OTP = 1 << 3;
        const ADC_CHANGED = 1 << 4;
        const OTG = 1 << 5;
        const ACCESSORY = 1 << 6;
        const CABLE_CHANGED = 1 << 7;
        const DCD_T = 1 << 8;
        const USB = 1 << 9;
        const UART = 1 << 10;
        const JIG = 1 << 11;
        const L200K_USB = 1 << 12;
        const DOCK = 1 << 13;
    }
}

impl StatusBits {
    /// Connect bits implied by a cable type.
    pub const fn for_cable(cable: CableType) -> StatusBits {
        match cable {
            CableType::Usb(_) => StatusBits::USB,
            CableType::Otg => StatusBits::OTG,
            CableType::Uart => StatusBits::UART,
            CableType::JigUartOff
            | CableType::JigUartOffWithVbus
            | CableType::JigUartOn
            | CableType::JigUsbOff
            | CableType::JigUsbOn => StatusBits::JIG,
            CableType::Dock => StatusBits::DOCK,
            CableType::Special200k => StatusBits::L200K_USB,
            _ => StatusBits::empty(),
        }
    }

    /// Bits that depend on the classification rather than the raw flags.
    pub const CABLE_DERIVED: StatusBits = StatusBits::USB
        .union(StatusBits::OTG)
        .union(StatusBits::UART)
        .union(StatusBits::JIG)
        .union(StatusBits::DOCK)
        .union(StatusBits::L200K_USB)
        .union(StatusBits::CABLE_CHANGED);
}

/// Classification plus derived booleans for one snapshot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ResolvedStatus {
    pub snapshot: StatusSnapshot,
    pub cable_type: CableType,
    pub bits: StatusBits,
}

impl ResolvedStatus {
    /// Status the engine starts from.
    pub const INITIAL: ResolvedStatus = ResolvedStatus {
        snapshot: StatusSnapshot::INITIAL,
        cable_type: CableType::UnknownNoVbus,
        bits: StatusBits::empty(),
    };

    /// Classifies `snapshot` and derives every boolean against `prev`.
    pub fn resolve(snapshot: StatusSnapshot, prev: &ResolvedStatus) -> Self {
        Self::with_cable(snapshot, classify(&snapshot), prev)
    }

    /// Derives the booleans for an explicitly chosen cable type.
    pub fn with_cable(snapshot: StatusSnapshot, cable_type: CableType, prev: &ResolvedStatus) -> Self {
        let mut bits = StatusBits::for_cable(cable_type);
        bits.set(StatusBits::VBUS, snapshot.vbus_present());
        bits.set(StatusBits::OCP, snapshot.over_current());
        bits.set(StatusBits::OVP, snapshot.over_voltage());
        bits.set(StatusBits::OTP, snapshot.over_temperature());
        bits.set(
            StatusBits::ADC_CHANGED,
            snapshot.id_adc() != prev.snapshot.id_adc(),
        );
        bits.set(StatusBits::ACCESSORY, snapshot.has_accessory());
        bits.set(StatusBits::CABLE_CHANGED, cable_type != prev.cable_type);
        bits.set(StatusBits::DCD_T, snapshot.dcd_timeout());

        Self {
            snapshot,
            cable_type,
            bits,
        }
    }

    /// Status with nothing attached, used to detach everything on shutdown.
    pub fn detached(prev: &ResolvedStatus) -> Self {
        let snapshot = StatusSnapshot::from_raw([0, int2::UVLO], [0, 0], ADC_OPEN);
        Self::with_cable(snapshot, CableType::None, prev)
    }

    /// Replaces the cable type without touching the derived bits.
    ///
    /// Used when a handler forces the classification after dispatch; keeping
    /// the connect bits stops the next cycle from re-running the attach.
    pub fn override_cable_type(&mut self, cable_type: CableType) {
        self.cable_type = cable_type;
    }

    pub const fn vbus_present(&self) -> bool {
        self.bits.contains(StatusBits::VBUS)
    }

    pub const fn jig_connect(&self) -> bool {
        self.bits.contains(StatusBits::JIG)
    }

    pub const fn dcd_t(&self) -> bool {
        self.bits.contains(StatusBits::DCD_T)
    }

    pub const fn cable_changed(&self) -> bool {
        self.bits.contains(StatusBits::CABLE_CHANGED)
    }
}
