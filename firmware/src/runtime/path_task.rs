use embassy_stm32::exti::ExtiInput;

use crate::commands::{PathCommand, PathSender};

/// Follows the UART select jumper and forwards each change to the MUIC task.
#[embassy_executor::task]
pub async fn run(mut jumper: ExtiInput<'static>, commands: PathSender<'static>) -> ! {
    commands
        .send(PathCommand::from_uart_jumper(jumper.is_high()))
        .await;

    loop {
        jumper.wait_for_any_edge().await;
        commands
            .send(PathCommand::from_uart_jumper(jumper.is_high()))
            .await;
    }
}
