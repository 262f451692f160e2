use core::cell::RefCell;

use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::mode::Blocking;
use embassy_stm32::time::Hertz;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use muic_core::registers::I2cRegisters;
use muic_core::{MuicConfig, MuicEngine};
use static_cell::StaticCell;

use crate::bus::{SharedBus, SharedRegisters};
use crate::commands::PathQueue;
use crate::hooks::{BoardHooks, NoticeQueue};

mod muic_task;
mod notice_task;
mod path_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

/// MUIC I2C clock.
const I2C_FREQUENCY: Hertz = Hertz(400_000);

type BoardI2c = I2cRegisters<I2c<'static, Blocking>>;

pub(super) type FirmwareEngine = MuicEngine<
    SharedRegisters<'static, crate::bus::BusMutex, BoardI2c>,
    BoardHooks<'static, Output<'static>, Output<'static>>,
>;

static I2C_BUS: StaticCell<SharedBus<BoardI2c>> = StaticCell::new();
pub(super) static NOTICE_QUEUE: NoticeQueue = Channel::new();
pub(super) static PATH_QUEUE: PathQueue = Channel::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA0,
        PA6,
        PA7,
        PB2,
        PB8,
        PB9,
        I2C1,
        EXTI0,
        EXTI2,
        ..
    } = hal::init(config);

    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = I2C_FREQUENCY;
    let i2c = I2c::new_blocking(I2C1, PB8, PB9, i2c_config);

    let muic_config = MuicConfig::DEFAULT;
    let bus = I2C_BUS.init(Mutex::new(RefCell::new(I2cRegisters::with_address(
        i2c,
        muic_config.i2c_address,
    ))));

    let hooks = BoardHooks::new(
        Output::new(PA6, Level::Low, Speed::Low),
        Output::new(PA7, Level::Low, Speed::Low),
        NOTICE_QUEUE.sender(),
    );
    let engine: FirmwareEngine = MuicEngine::new(SharedRegisters::new(bus), hooks, muic_config);

    // MUIC INT is open-drain, active low.
    let muic_irq = ExtiInput::new(PA0, EXTI0, Pull::Up);
    let uart_jumper = ExtiInput::new(PB2, EXTI2, Pull::Down);

    spawner
        .spawn(muic_task::run(engine, muic_irq, PATH_QUEUE.receiver()))
        .expect("failed to spawn MUIC task");

    spawner
        .spawn(notice_task::run(NOTICE_QUEUE.receiver()))
        .expect("failed to spawn notice task");

    spawner
        .spawn(path_task::run(uart_jumper, PATH_QUEUE.sender()))
        .expect("failed to spawn path task");

    core::future::pending::<()>().await;
}
