#![allow(dead_code)]

use heapless::Vec as HeaplessVec;
use muic_core::cable::ADC_OPEN;
use muic_core::registers::{BusFault, Register, RegisterAccess, int1, int2};
use muic_core::{
    CableType, DockMode, HookError, MuicConfig, MuicEngine, PlatformHooks, ProcessorPath, UsbEvent,
};

/// Register file with clear-on-read interrupt flags. UVLO tracks VBUS and
/// survives reads.
pub struct MockBus {
    pub regs: [u8; 0x20],
    pub writes: HeaplessVec<(Register, u8), 128>,
    pub fail_reads: Option<Register>,
    /// Number of further `INT_FLAG1` reads that report DCD timeout.
    pub dcd_reads: usize,
    vbus: bool,
}

impl MockBus {
    pub fn new() -> Self {
        let mut bus = Self {
            regs: [0; 0x20],
            writes: HeaplessVec::new(),
            fail_reads: None,
            dcd_reads: 0,
            vbus: false,
        };
        bus.regs[Register::ChipId.addr() as usize] = 0x12;
        bus.regs[Register::Adc.addr() as usize] = ADC_OPEN;
        bus.sync_uvlo();
        bus
    }

    pub fn reg(&self, register: Register) -> u8 {
        self.regs[register.addr() as usize]
    }

    pub fn set(&mut self, register: Register, value: u8) {
        self.regs[register.addr() as usize] = value;
    }

    /// Presents a cable to the next capture.
    pub fn plug(&mut self, device: [u8; 2], adc: u8, vbus: bool) {
        self.vbus = vbus;
        self.set(Register::Device1, device[0]);
        self.set(Register::Device2, device[1]);
        self.set(Register::Adc, adc);
        self.set(Register::IntFlag1, int1::ATTACH);
        self.sync_uvlo();
    }

    pub fn unplug(&mut self) {
        self.vbus = false;
        self.set(Register::Device1, 0);
        self.set(Register::Device2, 0);
        self.set(Register::Adc, ADC_OPEN);
        self.set(Register::IntFlag1, int1::DETACH);
        self.sync_uvlo();
    }

    pub fn raise_flag2(&mut self, bits: u8) {
        let value = self.reg(Register::IntFlag2) | bits;
        self.set(Register::IntFlag2, value);
    }

    pub fn raise_flag1(&mut self, bits: u8) {
        let value = self.reg(Register::IntFlag1) | bits;
        self.set(Register::IntFlag1, value);
    }

    fn sync_uvlo(&mut self) {
        let flags = self.reg(Register::IntFlag2) & !int2::UVLO;
        let uvlo = if self.vbus { 0 } else { int2::UVLO };
        self.set(Register::IntFlag2, flags | uvlo);
    }

    pub fn switch_writes(&self) -> usize {
        self.writes
            .iter()
            .filter(|(register, _)| *register == Register::ManualSw1)
            .count()
    }
}

impl RegisterAccess for MockBus {
    fn read(&mut self, register: Register) -> Result<u8, BusFault> {
        if self.fail_reads == Some(register) {
            return Err(BusFault::NoAcknowledge);
        }

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
        let _ = self.writes.push((register, value));
        self.set(register, value);
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Call {
    Charger(CableType),
    Usb(UsbEvent),
    Dock(DockMode),
    UsbPath(ProcessorPath),
    UartPath(ProcessorPath),
    HostNotify(bool),
}

/// Hooks that remember every call in order.
#[derive(Default)]
pub struct RecordingHooks {
    pub calls: HeaplessVec<Call, 128>,
    pub fail_charger: bool,
    pub host_notify_result: i32,
}

impl RecordingHooks {
    pub fn count(&self, call: Call) -> usize {
        self.calls.iter().filter(|seen| **seen == call).count()
    }

    pub fn chargers(&self) -> HeaplessVec<CableType, 32> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Charger(cable) => Some(*cable),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl PlatformHooks for RecordingHooks {
    fn charger(&mut self, cable: CableType) -> Result<(), HookError> {
        let _ = self.calls.push(Call::Charger(cable));
        if self.fail_charger {
            Err(HookError)
        } else {
            Ok(())
        }
    }

    fn usb_event(&mut self, event: UsbEvent) {
        let _ = self.calls.push(Call::Usb(event));
    }

    fn dock(&mut self, mode: DockMode) {
        let _ = self.calls.push(Call::Dock(mode));
    }

    fn host_notify(&mut self, active: bool) -> i32 {
        let _ = self.calls.push(Call::HostNotify(active));
        self.host_notify_result
    }

    fn set_usb_path(&mut self, path: ProcessorPath) {
        let _ = self.calls.push(Call::UsbPath(path));
    }

    fn set_uart_path(&mut self, path: ProcessorPath) {
        let _ = self.calls.push(Call::UartPath(path));
    }
}

pub type TestEngine = MuicEngine<MockBus, RecordingHooks>;

pub fn engine() -> TestEngine {
    engine_with(MuicConfig::DEFAULT)
}

pub fn engine_with(config: MuicConfig) -> TestEngine {
    let mut engine = MuicEngine::new(MockBus::new(), RecordingHooks::default(), config);
    engine.initialize().expect("initialize should succeed");
    engine
}
