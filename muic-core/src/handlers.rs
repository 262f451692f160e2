//! Attach and detach actions for each accessory class.
//!
//! Each handler is a free function over the previous and current status. On
//! attach a failing sub-step returns early and skips the rest of that
//! handler. Detach handlers always open the switch and notify the USB stack
//! before reporting a charger failure. The dispatcher records the error and
//! moves on to the next entry.

use crate::cable::{CableType, JigVariant};
use crate::dispatch::{Handler, HandlerContext};
use crate::error::{HardwareFault, MuicError};
use crate::hooks::{DockMode, ProcessorPath, UsbEvent};
use crate::status::{ResolvedStatus, StatusBits};
use crate::telemetry::MuicEventKind;

pub fn on_ocp(
    ctx: &mut HandlerContext<'_>,
    _prev: &ResolvedStatus,
    _curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    ctx.telemetry
        .record(MuicEventKind::HardwareFault(HardwareFault::OverCurrent));
    Ok(())
}

/// Over-voltage cuts the charger straight away, whatever the debounce gate
/// is doing.
pub fn on_ovp(
    ctx: &mut HandlerContext<'_>,
    _prev: &ResolvedStatus,
    _curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    ctx.telemetry
        .record(MuicEventKind::HardwareFault(HardwareFault::OverVoltage));
    ctx.detach_charger()
}

pub fn on_otp(
    ctx: &mut HandlerContext<'_>,
    _prev: &ResolvedStatus,
    _curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    ctx.telemetry
        .record(MuicEventKind::HardwareFault(HardwareFault::OverTemperature));
    Ok(())
}

/// VBUS toggled. A dock (or boot-on JIG) that stays attached gets its
/// charger state refreshed; everything else is handled by the cable-change
/// entry.
pub fn on_vbus(
    ctx: &mut HandlerContext<'_>,
    _prev: &ResolvedStatus,
    curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    if curr.cable_changed() {
        return Ok(());
    }
    match curr.cable_type {
        CableType::Dock | CableType::JigUartOn => dock_charger(ctx, curr),
        _ => Ok(()),
    }
}

pub fn on_cable_change(
    ctx: &mut HandlerContext<'_>,
    prev: &ResolvedStatus,
    curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    let prev_class = StatusBits::for_cable(prev.cable_type);
    let curr_class = StatusBits::for_cable(curr.cable_type);

    // Same connect bit, different flavour (SDP to CDP, JIG UART with and
    // without VBUS): the bit never moved, so replay detach and attach here.
    if !curr_class.is_empty()
        && prev_class == curr_class
        && prev.bits.contains(curr_class)
        && let Some((attach, detach)) = class_handlers(curr_class)
    {
        detach(ctx, prev, curr)?;
        return attach(ctx, prev, curr);
    }

    // Runs ahead of every attach entry, so a plain charger is released even
    // when the new type (OTG, UART) never notifies the charger itself.
    if curr.cable_type.is_plain_charger() {
        ctx.charger(curr.cable_type)
    } else if prev.cable_type.is_plain_charger() {
        ctx.detach_charger()
    } else {
        Ok(())
    }
}

const CLASS_HANDLERS: [(StatusBits, Handler, Handler); 6] = [
    (StatusBits::L200K_USB, attach_200k, detach_200k),
    (StatusBits::OTG, attach_otg, detach_otg),
    (StatusBits::USB, attach_usb, detach_usb),
    (StatusBits::UART, attach_uart, detach_uart),
    (StatusBits::JIG, attach_jig, detach_jig),
    (StatusBits::DOCK, attach_dock, detach_dock),
];

fn class_handlers(class: StatusBits) -> Option<(Handler, Handler)> {
    CLASS_HANDLERS
        .iter()
        .find(|(bit, _, _)| *bit == class)
        .map(|(_, attach, detach)| (*attach, *detach))
}

pub fn attach_usb(
    ctx: &mut HandlerContext<'_>,
    _prev: &ResolvedStatus,
    curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    usb_attach_as(ctx, curr.cable_type)
}

pub fn detach_usb(
    ctx: &mut HandlerContext<'_>,
    _prev: &ResolvedStatus,
    _curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    usb_detach(ctx)
}

fn usb_attach_as(ctx: &mut HandlerContext<'_>, cable: CableType) -> Result<(), MuicError> {
    ctx.charger(cable)?;
    let path = ctx.paths.usb;
    ctx.route_usb(path)?;
    if path == ProcessorPath::Ap {
        ctx.usb_event(UsbEvent::CableAttached);
    }
    Ok(())
}

fn usb_detach(ctx: &mut HandlerContext<'_>) -> Result<(), MuicError> {
    let was_ap = ctx.paths.usb_on_ap();
    // The cable is gone either way; a refused charger notice must not leave
    // the switch closed or the USB stack attached.
    let charger = ctx.detach_charger();
    ctx.open_switch()?;
    if was_ap {
        ctx.usb_event(UsbEvent::CableDetached);
    }
    charger
}

pub fn attach_otg(
    ctx: &mut HandlerContext<'_>,
    _prev: &ResolvedStatus,
    _curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    let path = ctx.paths.usb;
    ctx.route_usb(path)?;
    ctx.set_auto_config(false)?;
    ctx.set_charge_detect(false)?;
    if path == ProcessorPath::Ap {
        ctx.usb_event(UsbEvent::OtgHostAttached);
    }
    Ok(())
}

pub fn detach_otg(
    ctx: &mut HandlerContext<'_>,
    _prev: &ResolvedStatus,
    _curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    let was_ap = ctx.paths.usb_on_ap();
    ctx.set_auto_config(true)?;
    ctx.set_charge_detect(true)?;
    ctx.open_switch()?;
    if was_ap {
        ctx.usb_event(UsbEvent::OtgHostDetached);
    }
    Ok(())
}

pub fn attach_uart(
    ctx: &mut HandlerContext<'_>,
    _prev: &ResolvedStatus,
    _curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    let path = ctx.paths.uart;
    ctx.route_uart(path)
}

pub fn detach_uart(
    ctx: &mut HandlerContext<'_>,
    _prev: &ResolvedStatus,
    _curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    ctx.open_switch()
}

/// Boot-mode variant of the JIG cable in `status`.
///
/// A handler may have overridden the stored type (the OTG-test quirk below),
/// so fall back to reclassifying the raw snapshot.
fn jig_variant(status: &ResolvedStatus) -> Option<JigVariant> {
    status
        .cable_type
        .jig_variant()
        .or_else(|| crate::cable::classify(&status.snapshot).jig_variant())
}

pub fn attach_jig(
    ctx: &mut HandlerContext<'_>,
    prev: &ResolvedStatus,
    curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    match jig_variant(curr) {
        Some(JigVariant::UartBootOff) => attach_jig_uart_off(ctx, curr),
        Some(JigVariant::UartBootOn) => attach_dock(ctx, prev, curr),
        Some(JigVariant::UsbBootOff | JigVariant::UsbBootOn) => {
            usb_attach_as(ctx, curr.cable_type)
        }
        None => Ok(()),
    }
}

pub fn detach_jig(
    ctx: &mut HandlerContext<'_>,
    prev: &ResolvedStatus,
    curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    match jig_variant(prev) {
        Some(JigVariant::UartBootOff) => detach_jig_uart_off(ctx),
        Some(JigVariant::UartBootOn) => detach_dock(ctx, prev, curr),
        Some(JigVariant::UsbBootOff | JigVariant::UsbBootOn) => usb_detach(ctx),
        None => Ok(()),
    }
}

fn attach_jig_uart_off(
    ctx: &mut HandlerContext<'_>,
    curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    let path = ctx.paths.uart;
    ctx.route_uart(path)?;

    if curr.vbus_present() {
        // A host stack running an OTG test owns VBUS; report nothing attached.
        if ctx.hooks.host_notify(true) > 0 {
            ctx.force(CableType::None);
            return ctx.detach_charger();
        }
        ctx.charger(CableType::JigUartOffWithVbus)
    } else {
        if curr.cable_type != CableType::JigUartOff {
            ctx.force(CableType::JigUartOff);
        }
        ctx.charger(CableType::JigUartOff)
    }
}

fn detach_jig_uart_off(ctx: &mut HandlerContext<'_>) -> Result<(), MuicError> {
    ctx.open_switch()?;
    ctx.detach_charger()
}

pub fn attach_dock(
    ctx: &mut HandlerContext<'_>,
    _prev: &ResolvedStatus,
    curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    ctx.dock(DockMode::DeskDock);
    dock_charger(ctx, curr)
}

pub fn detach_dock(
    ctx: &mut HandlerContext<'_>,
    _prev: &ResolvedStatus,
    _curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    ctx.dock(DockMode::Detached);
    ctx.detach_charger()
}

fn dock_charger(ctx: &mut HandlerContext<'_>, curr: &ResolvedStatus) -> Result<(), MuicError> {
    if curr.vbus_present() {
        ctx.charger(curr.cable_type)
    } else {
        ctx.detach_charger()
    }
}

/// The 200K cable needs manual switching: USB to the AP and charger
/// detection driven by the host rather than the part.
pub fn attach_200k(
    ctx: &mut HandlerContext<'_>,
    _prev: &ResolvedStatus,
    curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    ctx.route_usb(ProcessorPath::Ap)?;
    ctx.set_auto_config(false)?;
    ctx.charger(curr.cable_type)
}

pub fn detach_200k(
    ctx: &mut HandlerContext<'_>,
    _prev: &ResolvedStatus,
    _curr: &ResolvedStatus,
) -> Result<(), MuicError> {
    ctx.open_switch()?;
    ctx.set_auto_config(true)?;
    ctx.detach_charger()
}
