//! Cable classification.
//!
//! A snapshot is mapped to exactly one [`CableType`]: an exact device-type
//! code match wins, otherwise the ID-ADC code indexes [`ADC_TABLE`]. The
//! result is a pure function of the snapshot.

use core::fmt;

use crate::error::MuicError;
use crate::registers::{device1, int1};
use crate::status::StatusSnapshot;

/// Number of entries in the ID-ADC lookup table (5-bit code).
pub const ADC_TABLE_SIZE: usize = 32;

/// ID-ADC code of an open ID pin (nothing on the ID line).
pub const ADC_OPEN: u8 = 0x1F;

/// ID-ADC code of the 200K special USB cable.
pub const ADC_200K_USB: u8 = 0x17;

/// Interrupt-flag bits that must be clear for a 200K cable to count as SDP.
pub const L200K_SDP_CLEAR_MASK: u8 = int1::CHG_DET | int1::DCD_T;

/// USB downstream port flavour.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UsbPort {
    Sdp,
    Cdp,
}

/// Semantic classification of whatever is attached to the port.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CableType {
    None,
    Usb(UsbPort),
    Otg,
    /// Dedicated charging port (travel adapter).
    Charger,
    Uart,
    JigUartOff,
    JigUartOffWithVbus,
    JigUartOn,
    JigUsbOff,
    JigUsbOn,
    Dock,
    PsCable,
    Special200k,
    UnknownWithVbus,
    UnknownNoVbus,
}

/// Boot-mode sub-variant of a factory JIG cable.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum JigVariant {
    UartBootOff,
    UartBootOn,
    UsbBootOff,
    UsbBootOn,
}

impl CableType {
    /// Every variant, in declaration order.
    pub const ALL: [CableType; 16] = [
        CableType::None,
        CableType::Usb(UsbPort::Sdp),
        CableType::Usb(UsbPort::Cdp),
        CableType::Otg,
        CableType::Charger,
        CableType::Uart,
        CableType::JigUartOff,
        CableType::JigUartOffWithVbus,
        CableType::JigUartOn,
        CableType::JigUsbOff,
        CableType::JigUsbOn,
        CableType::Dock,
        CableType::PsCable,
        CableType::Special200k,
        CableType::UnknownWithVbus,
        CableType::UnknownNoVbus,
    ];

    /// Resolves the JIG boot-mode variant, if this is a JIG cable.
    pub const fn jig_variant(self) -> Option<JigVariant> {
        match self {
            CableType::JigUartOff | CableType::JigUartOffWithVbus => Some(JigVariant::UartBootOff),
            CableType::JigUartOn => Some(JigVariant::UartBootOn),
            CableType::JigUsbOff => Some(JigVariant::UsbBootOff),
            CableType::JigUsbOn => Some(JigVariant::UsbBootOn),
            _ => None,
        }
    }

    /// Types that power the device but have no dedicated connect handler.
    pub const fn is_plain_charger(self) -> bool {
        matches!(
            self,
            CableType::Charger | CableType::PsCable | CableType::UnknownWithVbus
        )
    }

    /// Types with no dedicated connect handler.
    pub const fn is_plain(self) -> bool {
        self.is_plain_charger() || matches!(self, CableType::None | CableType::UnknownNoVbus)
    }

    /// Short label used in logs and transcripts.
    pub const fn label(self) -> &'static str {
        match self {
            CableType::None => "none",
            CableType::Usb(UsbPort::Sdp) => "usb-sdp",
            CableType::Usb(UsbPort::Cdp) => "usb-cdp",
            CableType::Otg => "otg",
            CableType::Charger => "ta",
            CableType::Uart => "uart",
            CableType::JigUartOff => "jig-uart-off",
            CableType::JigUartOffWithVbus => "jig-uart-off-vb",
            CableType::JigUartOn => "jig-uart-on",
            CableType::JigUsbOff => "jig-usb-off",
            CableType::JigUsbOn => "jig-usb-on",
            CableType::Dock => "desk-dock",
            CableType::PsCable => "ps-cable",
            CableType::Special200k => "200k-usb",
            CableType::UnknownWithVbus => "unknown-vb",
            CableType::UnknownNoVbus => "unknown",
        }
    }
}

impl fmt::Display for CableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Exact `DEVICE2:DEVICE1` codes (little-endian) and the type they imply.
pub const DEVICE_TABLE: [(u16, CableType); 5] = [
    (device1::OTG as u16, CableType::Otg),
    (device1::SDP as u16, CableType::Usb(UsbPort::Sdp)),
    (device1::UART as u16, CableType::Uart),
    (device1::CDP as u16, CableType::Usb(UsbPort::Cdp)),
    (device1::DCP as u16, CableType::Charger),
];

/// One row of the ID-ADC lookup table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AdcEntry {
    pub without_vbus: CableType,
    pub with_vbus: CableType,
}

impl AdcEntry {
    const fn new(without_vbus: CableType, with_vbus: CableType) -> Self {
        Self {
            without_vbus,
            with_vbus,
        }
    }

    /// Selects the column for the VBUS state.
    pub const fn select(&self, vbus_present: bool) -> CableType {
        if vbus_present {
            self.with_vbus
        } else {
            self.without_vbus
        }
    }
}

const UNKNOWN: AdcEntry = AdcEntry::new(CableType::UnknownNoVbus, CableType::UnknownWithVbus);

/// ID-ADC lookup table indexed by the 5-bit code.
pub const ADC_TABLE: [AdcEntry; ADC_TABLE_SIZE] = [
    // 0x00: ground
    AdcEntry::new(CableType::Otg, CableType::Otg),
    // 0x01 - 0x0F: remote-control keys
    UNKNOWN,
    UNKNOWN,
    UNKNOWN,
    UNKNOWN,
    UNKNOWN,
    UNKNOWN,
    UNKNOWN,
    UNKNOWN,
    UNKNOWN,
    UNKNOWN,
    UNKNOWN,
    UNKNOWN,
    UNKNOWN,
    UNKNOWN,
    UNKNOWN,
    // 0x10 - 0x15
    UNKNOWN,
    UNKNOWN,
    UNKNOWN,
    UNKNOWN,
    UNKNOWN,
    UNKNOWN,
    // 0x16: 150K
    AdcEntry::new(CableType::Uart, CableType::Uart),
    // 0x17: 200K
    AdcEntry::new(CableType::UnknownNoVbus, CableType::Special200k),
    // 0x18: 255K
    AdcEntry::new(CableType::JigUsbOff, CableType::JigUsbOff),
    // 0x19: 301K
    AdcEntry::new(CableType::JigUsbOn, CableType::JigUsbOn),
    // 0x1A: 365K
    AdcEntry::new(CableType::Dock, CableType::Dock),
    // 0x1B: 442K
    AdcEntry::new(CableType::UnknownNoVbus, CableType::PsCable),
    // 0x1C: 523K
    AdcEntry::new(CableType::JigUartOff, CableType::JigUartOffWithVbus),
    // 0x1D: 619K
    AdcEntry::new(CableType::JigUartOn, CableType::JigUartOn),
    // 0x1E
    UNKNOWN,
    // 0x1F: open
    AdcEntry::new(CableType::None, CableType::UnknownWithVbus),
];

/// Looks up an exact device-type code.
pub fn lookup_device(code: u16) -> Option<CableType> {
    DEVICE_TABLE
        .iter()
        .find(|(pattern, _)| *pattern == code)
        .map(|(_, cable)| *cable)
}

/// Returns the ADC table row for `code`.
pub fn lookup_adc(code: u8) -> Result<&'static AdcEntry, MuicError> {
    ADC_TABLE
        .get(usize::from(code))
        .ok_or(MuicError::InvalidAdcCode(code))
}

/// Maps a snapshot to a cable type.
pub fn classify(snapshot: &StatusSnapshot) -> CableType {
    classify_checked(snapshot).0
}

/// Like [`classify`], but also hands back the lookup error when the ID-ADC
/// code falls outside the table and the type degraded to
/// [`CableType::UnknownNoVbus`].
pub fn classify_checked(snapshot: &StatusSnapshot) -> (CableType, Option<MuicError>) {
    let vbus = snapshot.vbus_present();
    let (resolved, invalid) = match lookup_device(snapshot.device_code()) {
        Some(cable) => (cable, None),
        None => match lookup_adc(snapshot.id_adc()) {
            Ok(entry) => (entry.select(vbus), None),
            Err(err) => (CableType::UnknownNoVbus, Some(err)),
        },
    };

    // Literal condition from the vendor driver, which itself marks it as
    // possibly needing change.
    if resolved == CableType::Special200k
        && vbus
        && snapshot.irq_flags()[0] & L200K_SDP_CLEAR_MASK == 0
    {
        return (CableType::Usb(UsbPort::Sdp), None);
    }

    (resolved, invalid)
}
