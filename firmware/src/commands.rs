//! Path preference commands applied between detection cycles.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use muic_core::ProcessorPath;

/// Depth of the path command queue.
pub const PATH_QUEUE_DEPTH: usize = 2;

#[cfg(target_os = "none")]
type PathMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type PathMutex = NoopRawMutex;

/// New USB and UART routing preference.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PathCommand {
    pub usb: ProcessorPath,
    pub uart: ProcessorPath,
}

impl PathCommand {
    /// Maps the board's UART select jumper (high = modem) onto a command.
    /// USB always stays on the application processor.
    pub const fn from_uart_jumper(high: bool) -> Self {
        Self {
            usb: ProcessorPath::Ap,
            uart: if high {
                ProcessorPath::Cp
            } else {
                ProcessorPath::Ap
            },
        }
    }
}

pub type PathQueue = Channel<PathMutex, PathCommand, PATH_QUEUE_DEPTH>;

pub type PathSender<'a> = Sender<'a, PathMutex, PathCommand, PATH_QUEUE_DEPTH>;

pub type PathReceiver<'a> = Receiver<'a, PathMutex, PathCommand, PATH_QUEUE_DEPTH>;
