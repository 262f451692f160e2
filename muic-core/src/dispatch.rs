//! Table-driven event dispatch.
//!
//! Two fixed, ordered tables map a status bit and a transition kind to an
//! action handler. Each cycle walks the urgent table first, then (after the
//! debounce gate) the normal table. Handlers receive the previous and the
//! current [`ResolvedStatus`] plus a [`HandlerContext`] that carries every
//! mutable resource they may touch; they never re-enter dispatch.
//!
//! Every normal-table bit has a falling (detach) entry and a rising (attach)
//! entry. All detach entries come first, then the cable-change entry, then
//! the attach entries, so the old state's detach always runs before the new
//! state's attach.

use crate::cable::CableType;
use crate::debounce::RetryState;
use crate::edge::{Transition, state_check};
use crate::error::{Callback, MuicError};
use crate::handlers;
use crate::hooks::{DockMode, PlatformHooks, ProcessorPath, UsbEvent};
use crate::path::{PathConfig, SwitchRoute};
use crate::registers::{Register, RegisterAccess, control1, manual_sw1};
use crate::status::{ResolvedStatus, StatusBits};
use crate::telemetry::{MuicEventKind, TelemetryRecorder};

/// Action handler signature.
pub type Handler =
    fn(&mut HandlerContext<'_>, &ResolvedStatus, &ResolvedStatus) -> Result<(), MuicError>;

/// One row of a dispatch table.
#[derive(Copy, Clone)]
pub struct EventHandlerEntry {
    pub label: &'static str,
    pub mask: StatusBits,
    pub trigger: Transition,
    pub handler: Handler,
}

impl EventHandlerEntry {
    pub const fn new(
        label: &'static str,
        mask: StatusBits,
        trigger: Transition,
        handler: Handler,
    ) -> Self {
        Self {
            label,
            mask,
            trigger,
            handler,
        }
    }

    /// `true` when the entry's transition kind matches the edge on its bit.
    pub fn matches(&self, prev: StatusBits, curr: StatusBits) -> bool {
        state_check(prev, curr, self.mask).intersects(self.trigger)
    }
}

/// Protection faults, run before the debounce gate.
pub static URGENT_HANDLERS: [EventHandlerEntry; 3] = [
    EventHandlerEntry::new("ocp", StatusBits::OCP, Transition::RISING, handlers::on_ocp),
    EventHandlerEntry::new("ovp", StatusBits::OVP, Transition::RISING, handlers::on_ovp),
    EventHandlerEntry::new("otp", StatusBits::OTP, Transition::RISING, handlers::on_otp),
];

/// Cable handlers, run once the status is settled.
pub static NORMAL_HANDLERS: [EventHandlerEntry; 14] = [
    EventHandlerEntry::new("vbus", StatusBits::VBUS, Transition::CHANGED, handlers::on_vbus),
    EventHandlerEntry::new(
        "200k-detach",
        StatusBits::L200K_USB,
        Transition::FALLING,
        handlers::detach_200k,
    ),
    EventHandlerEntry::new("otg-detach", StatusBits::OTG, Transition::FALLING, handlers::detach_otg),
    EventHandlerEntry::new("usb-detach", StatusBits::USB, Transition::FALLING, handlers::detach_usb),
    EventHandlerEntry::new(
        "uart-detach",
        StatusBits::UART,
        Transition::FALLING,
        handlers::detach_uart,
    ),
    EventHandlerEntry::new("jig-detach", StatusBits::JIG, Transition::FALLING, handlers::detach_jig),
    EventHandlerEntry::new(
        "dock-detach",
        StatusBits::DOCK,
        Transition::FALLING,
        handlers::detach_dock,
    ),
    EventHandlerEntry::new(
        "cable-change",
        StatusBits::CABLE_CHANGED,
        Transition::HIGH,
        handlers::on_cable_change,
    ),
    EventHandlerEntry::new(
        "200k-attach",
        StatusBits::L200K_USB,
        Transition::RISING,
        handlers::attach_200k,
    ),
    EventHandlerEntry::new("otg-attach", StatusBits::OTG, Transition::RISING, handlers::attach_otg),
    EventHandlerEntry::new("usb-attach", StatusBits::USB, Transition::RISING, handlers::attach_usb),
    EventHandlerEntry::new(
        "uart-attach",
        StatusBits::UART,
        Transition::RISING,
        handlers::attach_uart,
    ),
    EventHandlerEntry::new("jig-attach", StatusBits::JIG, Transition::RISING, handlers::attach_jig),
    EventHandlerEntry::new(
        "dock-attach",
        StatusBits::DOCK,
        Transition::RISING,
        handlers::attach_dock,
    ),
];

/// Result of one table walk.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TableRun {
    /// Number of handlers that ran.
    pub fired: u8,
    /// Bits whose handlers ran.
    pub fired_bits: StatusBits,
}

/// Walks `table` in order and runs every entry whose transition matches.
///
/// Entries whose bit is in `skip` are not considered. Handler errors are
/// recorded and the walk continues, except for register I/O failures which
/// abandon the rest of the table.
pub fn run_table(
    table: &[EventHandlerEntry],
    ctx: &mut HandlerContext<'_>,
    prev: &ResolvedStatus,
    curr: &ResolvedStatus,
    skip: StatusBits,
) -> Result<TableRun, MuicError> {
    let mut run = TableRun::default();

    for entry in table {
        if skip.intersects(entry.mask) || !entry.matches(prev.bits, curr.bits) {
            continue;
        }

        ctx.telemetry.record(MuicEventKind::HandlerFired(entry.label));
        run.fired = run.fired.saturating_add(1);
        run.fired_bits |= entry.mask;

        if let Err(err) = (entry.handler)(ctx, prev, curr) {
            ctx.telemetry.record(MuicEventKind::Error(err));
            if matches!(err, MuicError::RegisterIo { .. }) {
                return Err(err);
            }
        }
    }

    Ok(run)
}

/// Mutable resources available to action handlers.
pub struct HandlerContext<'a> {
    pub bus: &'a mut dyn RegisterAccess,
    pub hooks: &'a mut dyn PlatformHooks,
    pub paths: &'a mut PathConfig,
    pub retry: &'a mut RetryState,
    pub telemetry: &'a mut TelemetryRecorder,
    /// Classification a handler forced; applied once the table walk ends.
    pub forced: Option<CableType>,
}

impl<'a> HandlerContext<'a> {
    pub fn new(
        bus: &'a mut dyn RegisterAccess,
        hooks: &'a mut dyn PlatformHooks,
        paths: &'a mut PathConfig,
        retry: &'a mut RetryState,
        telemetry: &'a mut TelemetryRecorder,
    ) -> Self {
        Self {
            bus,
            hooks,
            paths,
            retry,
            telemetry,
            forced: None,
        }
    }

    pub fn write(&mut self, register: Register, value: u8) -> Result<(), MuicError> {
        self.bus
            .write(register, value)
            .map_err(MuicError::io(register))
    }

    pub fn force(&mut self, cable: CableType) {
        self.forced = Some(cable);
    }

    /// Notifies the charger. A failing callback forces the classification
    /// to [`CableType::None`].
    pub fn charger(&mut self, cable: CableType) -> Result<(), MuicError> {
        self.telemetry.record(MuicEventKind::ChargerNotified(cable));
        match self.hooks.charger(cable) {
            Ok(()) => Ok(()),
            Err(_) => {
                self.force(CableType::None);
                Err(MuicError::CallbackFailure(Callback::Charger))
            }
        }
    }

    pub fn detach_charger(&mut self) -> Result<(), MuicError> {
        self.charger(CableType::None)
    }

    pub fn usb_event(&mut self, event: UsbEvent) {
        self.telemetry.record(MuicEventKind::UsbNotified(event));
        self.hooks.usb_event(event);
    }

    pub fn dock(&mut self, mode: DockMode) {
        self.telemetry.record(MuicEventKind::DockNotified(mode));
        self.hooks.dock(mode);
    }

    /// Selects the USB mux target and closes the COM switch onto USB.
    pub fn route_usb(&mut self, path: ProcessorPath) -> Result<(), MuicError> {
        self.telemetry.record(MuicEventKind::UsbPath(path));
        self.hooks.set_usb_path(path);
        self.write(Register::ManualSw1, manual_sw1::USB)?;
        self.paths.route = SwitchRoute::Usb(path);
        Ok(())
    }

    /// Selects the UART mux target and closes the COM switch onto UART.
    pub fn route_uart(&mut self, path: ProcessorPath) -> Result<(), MuicError> {
        self.telemetry.record(MuicEventKind::UartPath(path));
        self.hooks.set_uart_path(path);
        self.write(Register::ManualSw1, manual_sw1::UART)?;
        self.paths.route = SwitchRoute::Uart(path);
        Ok(())
    }

    pub fn open_switch(&mut self) -> Result<(), MuicError> {
        self.write(Register::ManualSw1, manual_sw1::OPEN)?;
        self.paths.route = SwitchRoute::Open;
        Ok(())
    }

    pub fn set_auto_config(&mut self, enabled: bool) -> Result<(), MuicError> {
        self.update_control(control1::AUTO_CONFIG, enabled)?;
        self.paths.auto_config = enabled;
        Ok(())
    }

    pub fn set_charge_detect(&mut self, enabled: bool) -> Result<(), MuicError> {
        self.update_control(control1::CHG_DET_EN, enabled)?;
        self.paths.charge_detect = enabled;
        Ok(())
    }

    fn update_control(&mut self, mask: u8, enabled: bool) -> Result<(), MuicError> {
        let value = if enabled { mask } else { 0 };
        self.bus
            .update_bits(Register::Control1, mask, value)
            .map_err(MuicError::io(Register::Control1))
    }
}
