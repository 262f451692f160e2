//! Mutex-guarded register bus.
//!
//! The MUIC shares its I2C controller with other board peripherals, so every
//! register transaction goes through one blocking mutex. A read-modify-write
//! holds the lock for both halves.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use muic_core::registers::{BusFault, Register, RegisterAccess};

#[cfg(target_os = "none")]
pub type BusMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
pub type BusMutex = NoopRawMutex;

/// Register adapter shared behind the bus lock.
pub type SharedBus<R> = Mutex<BusMutex, RefCell<R>>;

/// [`RegisterAccess`] handle that serializes through a shared mutex.
pub struct SharedRegisters<'a, M: RawMutex, R> {
    bus: &'a Mutex<M, RefCell<R>>,
}

impl<'a, M: RawMutex, R> SharedRegisters<'a, M, R> {
    pub const fn new(bus: &'a Mutex<M, RefCell<R>>) -> Self {
        Self { bus }
    }
}

impl<M: RawMutex, R: RegisterAccess> RegisterAccess for SharedRegisters<'_, M, R> {
    fn read(&mut self, register: Register) -> Result<u8, BusFault> {
        self.bus.lock(|cell| cell.borrow_mut().read(register))
    }

    fn write(&mut self, register: Register, value: u8) -> Result<(), BusFault> {
        self.bus.lock(|cell| cell.borrow_mut().write(register, value))
    }

    fn update_bits(&mut self, register: Register, mask: u8, value: u8) -> Result<(), BusFault> {
        self.bus
            .lock(|cell| cell.borrow_mut().update_bits(register, mask, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeRegisters {
        values: [u8; 0x20],
        reads: usize,
        nack: bool,
    }

    impl RegisterAccess for FakeRegisters {
        fn read(&mut self, register: Register) -> Result<u8, BusFault> {
            if self.nack {
                return Err(BusFault::NoAcknowledge);
            }
            self.reads += 1;
            Ok(self.values[register.addr() as usize])
        }

        fn write(&mut self, register: Register, value: u8) -> Result<(), BusFault> {
            if self.nack {
                return Err(BusFault::NoAcknowledge);
            }
            self.values[register.addr() as usize] = value;
            Ok(())
        }
    }

    fn shared() -> SharedBus<FakeRegisters> {
        Mutex::new(RefCell::new(FakeRegisters {
            values: [0; 0x20],
            reads: 0,
            nack: false,
        }))
    }

    #[test]
    fn forwards_reads_and_writes() {
        let bus = shared();
        let mut regs = SharedRegisters::new(&bus);

        regs.write(Register::ManualSw1, 0x24).expect("write");
        assert_eq!(regs.read(Register::ManualSw1), Ok(0x24));
        assert_eq!(bus.lock(|cell| cell.borrow().reads), 1);
    }

    #[test]
    fn update_bits_runs_under_one_lock() {
        let bus = shared();
        let mut regs = SharedRegisters::new(&bus);
        regs.write(Register::Control1, 0xC4).expect("write");

        regs.update_bits(Register::Control1, 0x04, 0x00)
            .expect("update");

        assert_eq!(bus.lock(|cell| cell.borrow().values[0x02]), 0xC0);
    }

    #[test]
    fn propagates_bus_faults() {
        let bus = shared();
        bus.lock(|cell| cell.borrow_mut().nack = true);
        let mut regs = SharedRegisters::new(&bus);

        assert_eq!(regs.read(Register::Adc), Err(BusFault::NoAcknowledge));
    }
}
