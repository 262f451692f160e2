use embassy_futures::select::{Either, select};
use embassy_stm32::exti::ExtiInput;
use embassy_time::{Duration, Timer};
use muic_core::CycleOutcome;

use super::FirmwareEngine;
use crate::commands::PathReceiver;
use crate::telemetry::{TelemetryDrain, log_warning};

#[embassy_executor::task]
pub async fn run(
    mut engine: FirmwareEngine,
    mut irq: ExtiInput<'static>,
    commands: PathReceiver<'static>,
) -> ! {
    let mut drain = TelemetryDrain::new();

    if engine.initialize().is_err() {
        log_warning("initialization failed; continuing with defaults");
    }
    // Pick up whatever was plugged in before boot.
    run_to_completion(&mut engine).await;
    drain.drain(engine.telemetry());

    loop {
        // INT stays low until the flags are read, so an event that lands
        // mid-cycle is picked up on the next pass.
        match select(irq.wait_for_low(), commands.receive()).await {
            Either::First(()) => {
                run_to_completion(&mut engine).await;
            }
            Either::Second(command) => {
                if engine.configure_paths(command.usb, command.uart).is_err() {
                    log_warning("path change failed");
                }
            }
        }
        drain.drain(engine.telemetry());
    }
}

async fn run_to_completion(engine: &mut FirmwareEngine) -> CycleOutcome {
    let mut outcome = engine.run_cycle();
    while let CycleOutcome::Debouncing { retry_after, .. } = outcome {
        let micros = u64::try_from(retry_after.as_micros()).unwrap_or(u64::MAX);
        Timer::after(Duration::from_micros(micros)).await;
        outcome = engine.resume_debounce();
    }
    outcome
}
