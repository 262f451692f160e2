//! Platform notifications the engine drives.
//!
//! Boards implement [`PlatformHooks`] to react to cable changes: the charger
//! driver, USB controller, dock, and mux select lines all live outside the
//! engine.

use core::fmt;

use crate::cable::CableType;

/// Notice sent to the USB controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UsbEvent {
    CableAttached,
    CableDetached,
    OtgHostAttached,
    OtgHostDetached,
}

impl fmt::Display for UsbEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UsbEvent::CableAttached => "cable-attached",
            UsbEvent::CableDetached => "cable-detached",
            UsbEvent::OtgHostAttached => "otg-host-attached",
            UsbEvent::OtgHostDetached => "otg-host-detached",
        };
        f.write_str(label)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DockMode {
    DeskDock,
    Detached,
}

impl fmt::Display for DockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DockMode::DeskDock => f.write_str("desk-dock"),
            DockMode::Detached => f.write_str("detached"),
        }
    }
}

/// Processor a mux routes the data lines to.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ProcessorPath {
    /// Application processor.
    #[default]
    Ap,
    /// Modem (communication processor).
    Cp,
}

impl fmt::Display for ProcessorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessorPath::Ap => f.write_str("AP"),
            ProcessorPath::Cp => f.write_str("CP"),
        }
    }
}

/// Failure reported by a platform callback.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct HookError;

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("platform callback failed")
    }
}

/// Board-specific reactions to detection results.
pub trait PlatformHooks {
    /// Tells the charger what is attached; [`CableType::None`] detaches.
    fn charger(&mut self, cable: CableType) -> Result<(), HookError>;

    fn usb_event(&mut self, event: UsbEvent);

    fn dock(&mut self, mode: DockMode);

    /// Asks the host stack about an OTG test session. A positive return
    /// means the JIG UART cable should be treated as nothing attached.
    fn host_notify(&mut self, _active: bool) -> i32 {
        0
    }

    fn set_usb_path(&mut self, path: ProcessorPath);

    fn set_uart_path(&mut self, path: ProcessorPath);
}

impl<T: PlatformHooks + ?Sized> PlatformHooks for &mut T {
    fn charger(&mut self, cable: CableType) -> Result<(), HookError> {
        (**self).charger(cable)
    }

    fn usb_event(&mut self, event: UsbEvent) {
        (**self).usb_event(event);
    }

    fn dock(&mut self, mode: DockMode) {
        (**self).dock(mode);
    }

    fn host_notify(&mut self, active: bool) -> i32 {
        (**self).host_notify(active)
    }

    fn set_usb_path(&mut self, path: ProcessorPath) {
        (**self).set_usb_path(path);
    }

    fn set_uart_path(&mut self, path: ProcessorPath) {
        (**self).set_uart_path(path);
    }
}

/// Hooks that accept everything and do nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopHooks;

impl PlatformHooks for NoopHooks {
    fn charger(&mut self, _cable: CableType) -> Result<(), HookError> {
        Ok(())
    }

    fn usb_event(&mut self, _event: UsbEvent) {}

    fn dock(&mut self, _mode: DockMode) {}

    fn set_usb_path(&mut self, _path: ProcessorPath) {}

    fn set_uart_path(&mut self, _path: ProcessorPath) {}
}
