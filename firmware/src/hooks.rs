//! Board implementation of the engine's platform hooks.
//!
//! Mux selection drives two GPIO lines (high routes to the modem). Charger,
//! USB, and dock notices are queued for the notice task; the charger driver
//! counts as failed when the queue cannot take the notice. Every dropped
//! notice is logged as a warning.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embedded_hal::digital::OutputPin;
use muic_core::{CableType, DockMode, HookError, PlatformHooks, ProcessorPath, UsbEvent};

use crate::telemetry::log_warning;

/// Depth of the notice queue drained by the notice task.
pub const NOTICE_QUEUE_DEPTH: usize = 8;

#[cfg(target_os = "none")]
type NoticeMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type NoticeMutex = NoopRawMutex;

/// Notification forwarded from the engine to the rest of the board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Notice {
    Charger(CableType),
    Usb(UsbEvent),
    Dock(DockMode),
}

pub type NoticeQueue = Channel<NoticeMutex, Notice, NOTICE_QUEUE_DEPTH>;

pub type NoticeSender<'a> = Sender<'a, NoticeMutex, Notice, NOTICE_QUEUE_DEPTH>;

pub type NoticeReceiver<'a> = Receiver<'a, NoticeMutex, Notice, NOTICE_QUEUE_DEPTH>;

/// GPIO-backed [`PlatformHooks`].
pub struct BoardHooks<'a, U, A> {
    usb_select: U,
    uart_select: A,
    notices: NoticeSender<'a>,
    dropped: u32,
}

impl<'a, U: OutputPin, A: OutputPin> BoardHooks<'a, U, A> {
    pub fn new(usb_select: U, uart_select: A, notices: NoticeSender<'a>) -> Self {
        Self {
            usb_select,
            uart_select,
            notices,
            dropped: 0,
        }
    }

    /// Notices lost because the queue was full.
    pub const fn dropped(&self) -> u32 {
        self.dropped
    }

    fn post(&mut self, notice: Notice) -> Result<(), HookError> {
        self.notices.try_send(notice).map_err(|_| {
            self.dropped = self.dropped.wrapping_add(1);
            log_warning(match notice {
                Notice::Charger(_) => "notice queue full; charger notice dropped",
                Notice::Usb(_) => "notice queue full; usb notice dropped",
                Notice::Dock(_) => "notice queue full; dock notice dropped",
            });
            HookError
        })
    }
}

fn drive<P: OutputPin>(pin: &mut P, path: ProcessorPath) {
    // Push-pull GPIO writes cannot fail on this board.
    let _ = match path {
        ProcessorPath::Ap => pin.set_low(),
        ProcessorPath::Cp => pin.set_high(),
    };
}

impl<U: OutputPin, A: OutputPin> PlatformHooks for BoardHooks<'_, U, A> {
    fn charger(&mut self, cable: CableType) -> Result<(), HookError> {
        self.post(Notice::Charger(cable))
    }

    fn usb_event(&mut self, event: UsbEvent) {
        let _ = self.post(Notice::Usb(event));
    }

    fn dock(&mut self, mode: DockMode) {
        let _ = self.post(Notice::Dock(mode));
    }

    fn set_usb_path(&mut self, path: ProcessorPath) {
        drive(&mut self.usb_select, path);
    }

    fn set_uart_path(&mut self, path: ProcessorPath) {
        drive(&mut self.uart_select, path);
    }
}
