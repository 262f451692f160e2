//! Engine context tying capture, classification, debounce, and dispatch into
//! one detection cycle.
//!
//! The engine owns everything a cycle mutates (the register bus, platform
//! hooks, path configuration, retry counter, telemetry). The runtime calls
//! [`MuicEngine::run_cycle`] once per interrupt. When the debounce gate wants
//! another look at the status the cycle parks in
//! [`CycleOutcome::Debouncing`]; the runtime waits `retry_after` and calls
//! [`MuicEngine::resume_debounce`].

use core::time::Duration;

use crate::cable::{CableType, classify_checked};
use crate::config::{DCD_RETRY_INTERVAL, MuicConfig};
use crate::debounce::{GateDecision, RetryState};
use crate::dispatch::{
    EventHandlerEntry, HandlerContext, NORMAL_HANDLERS, TableRun, URGENT_HANDLERS, run_table,
};
use crate::error::MuicError;
use crate::hooks::{PlatformHooks, ProcessorPath, UsbEvent};
use crate::path::{PathConfig, SwitchRoute};
use crate::registers::{CHIP_ID_VENDOR_MASK, Register, RegisterAccess, control1, manual_sw1};
use crate::status::{ResolvedStatus, StatusBits, StatusSnapshot};
use crate::telemetry::{MuicEventKind, TelemetryRecorder};

/// Summary of a completed cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CycleReport {
    pub previous: CableType,
    pub cable_type: CableType,
    /// Urgent and normal handlers that ran.
    pub handlers_fired: u8,
    /// Classification a handler or the debounce gate forced.
    pub forced: Option<CableType>,
}

/// How a call to [`MuicEngine::run_cycle`] ended.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Status still noisy; wait `retry_after` and call `resume_debounce`.
    Debouncing { attempt: u8, retry_after: Duration },
    /// Debounce budget ran out during power-on reset; status left unchanged.
    Unresolved,
    /// Register I/O failed; status left unchanged.
    Aborted(MuicError),
}

/// Detection engine bound to a register bus and a set of platform hooks.
pub struct MuicEngine<B, H> {
    bus: B,
    hooks: H,
    config: MuicConfig,
    status: ResolvedStatus,
    paths: PathConfig,
    retry: RetryState,
    telemetry: TelemetryRecorder,
    debouncing: bool,
    urgent_fired: StatusBits,
    urgent_count: u8,
    urgent_forced: Option<CableType>,
}

impl<B, H> MuicEngine<B, H>
where
    B: RegisterAccess,
    H: PlatformHooks,
{
    pub fn new(bus: B, hooks: H, config: MuicConfig) -> Self {
        Self {
            bus,
            hooks,
            paths: PathConfig::new(&config),
            config,
            status: ResolvedStatus::INITIAL,
            retry: RetryState::new(),
            telemetry: TelemetryRecorder::new(),
            debouncing: false,
            urgent_fired: StatusBits::empty(),
            urgent_count: 0,
            urgent_forced: None,
        }
    }

    /// Checks the chip id and programs control and mask registers.
    ///
    /// Returns the vendor id read from `CHIP_ID`.
    pub fn initialize(&mut self) -> Result<u8, MuicError> {
        let result = self.program_defaults();
        if let Ok(vendor) = result {
            self.telemetry.record(MuicEventKind::Initialized { vendor });
        }
        self.telemetry.record_result(result)
    }

    fn program_defaults(&mut self) -> Result<u8, MuicError> {
        let chip = self.read(Register::ChipId)?;
        let vendor = chip & CHIP_ID_VENDOR_MASK;
        if let Some(expected) = self.config.expected_vendor_id
            && expected != vendor
        {
            return Err(MuicError::ChipMismatch {
                expected,
                found: vendor,
            });
        }

        self.write(Register::Control1, control1::DEFAULT)?;
        self.write(Register::IntMask1, self.config.irq_mask[0])?;
        self.write(Register::IntMask2, self.config.irq_mask[1])?;
        self.write(Register::ManualSw1, manual_sw1::OPEN)?;

        // Flags latched before we were listening are stale.
        self.read(Register::IntFlag1)?;
        self.read(Register::IntFlag2)?;

        self.status = ResolvedStatus::INITIAL;
        self.paths = PathConfig::new(&self.config);
        self.retry.reset();
        self.debouncing = false;
        Ok(vendor)
    }

    /// Runs one detection cycle. A cycle parked in debounce is continued
    /// rather than restarted.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        if !self.debouncing {
            self.telemetry.begin_cycle();
            self.urgent_fired = StatusBits::empty();
            self.urgent_count = 0;
            self.urgent_forced = None;
        }
        self.step()
    }

    /// Re-snapshots after a debounce wait.
    pub fn resume_debounce(&mut self) -> CycleOutcome {
        self.run_cycle()
    }

    /// `true` while a cycle is parked in debounce.
    pub const fn is_debouncing(&self) -> bool {
        self.debouncing
    }

    fn step(&mut self) -> CycleOutcome {
        let snapshot = match StatusSnapshot::capture(&mut self.bus) {
            Ok(snapshot) => snapshot,
            Err(err) => return self.abort(err),
        };
        let prev = self.status;
        let (cable_type, invalid) = classify_checked(&snapshot);
        if let Some(err) = invalid {
            self.telemetry.record(MuicEventKind::Error(err));
        }
        let curr = ResolvedStatus::with_cable(snapshot, cable_type, &prev);

        // Urgent bits fire at most once per cycle, however many times the
        // gate re-snapshots.
        let skip = self.urgent_fired;
        let urgent = match self.run_handlers(&URGENT_HANDLERS, &prev, &curr, skip) {
            Ok((run, forced)) => {
                self.urgent_forced = forced.or(self.urgent_forced);
                run
            }
            Err(err) => return self.abort(err),
        };
        self.urgent_fired |= urgent.fired_bits;
        self.urgent_count = self.urgent_count.saturating_add(urgent.fired);

        match self.retry.evaluate(&curr) {
            GateDecision::Proceed => self.finish(&prev, curr, None),
            GateDecision::Retry { attempt } => {
                self.telemetry.record(MuicEventKind::DebounceRetry(attempt));
                self.debouncing = true;
                CycleOutcome::Debouncing {
                    attempt,
                    retry_after: DCD_RETRY_INTERVAL,
                }
            }
            GateDecision::ForceCharger => {
                self.telemetry.record(MuicEventKind::DebounceForced);
                let forced = ResolvedStatus::with_cable(snapshot, CableType::Charger, &prev);
                self.finish(&prev, forced, Some(CableType::Charger))
            }
            GateDecision::Unresolved => {
                self.telemetry.record(MuicEventKind::DebounceUnresolved);
                self.debouncing = false;
                CycleOutcome::Unresolved
            }
        }
    }

    fn finish(
        &mut self,
        prev: &ResolvedStatus,
        mut curr: ResolvedStatus,
        gate_forced: Option<CableType>,
    ) -> CycleOutcome {
        self.debouncing = false;
        self.telemetry
            .record(MuicEventKind::Classified(curr.cable_type));

        let (run, handler_forced) =
            match self.run_handlers(&NORMAL_HANDLERS, prev, &curr, StatusBits::empty()) {
                Ok((run, forced)) => (run, forced.or(self.urgent_forced)),
                Err(err) => return self.abort(err),
            };

        if let Some(cable) = handler_forced {
            self.telemetry
                .record(MuicEventKind::ClassificationForced(cable));
            curr.override_cable_type(cable);
        }
        self.status = curr;

        CycleOutcome::Completed(CycleReport {
            previous: prev.cable_type,
            cable_type: curr.cable_type,
            handlers_fired: self.urgent_count.saturating_add(run.fired),
            forced: handler_forced.or(gate_forced),
        })
    }

    fn abort(&mut self, err: MuicError) -> CycleOutcome {
        self.telemetry.record(MuicEventKind::Error(err));
        self.debouncing = false;
        CycleOutcome::Aborted(err)
    }

    fn run_handlers(
        &mut self,
        table: &[EventHandlerEntry],
        prev: &ResolvedStatus,
        curr: &ResolvedStatus,
        skip: StatusBits,
    ) -> Result<(TableRun, Option<CableType>), MuicError> {
        let mut ctx = HandlerContext::new(
            &mut self.bus,
            &mut self.hooks,
            &mut self.paths,
            &mut self.retry,
            &mut self.telemetry,
        );
        let run = run_table(table, &mut ctx, prev, curr, skip)?;
        Ok((run, ctx.forced))
    }

    /// Updates path preferences. An active route is moved to the new target
    /// immediately.
    pub fn configure_paths(
        &mut self,
        usb: ProcessorPath,
        uart: ProcessorPath,
    ) -> Result<(), MuicError> {
        self.config.usb_path = usb;
        self.config.uart_path = uart;
        self.paths.usb = usb;
        self.paths.uart = uart;

        let route = self.paths.route;
        let events = usb_events(self.status.cable_type);
        let mut ctx = HandlerContext::new(
            &mut self.bus,
            &mut self.hooks,
            &mut self.paths,
            &mut self.retry,
            &mut self.telemetry,
        );
        let result = match route {
            SwitchRoute::Usb(current) if current != usb => {
                move_usb_route(&mut ctx, current, usb, events)
            }
            SwitchRoute::Uart(current) if current != uart => ctx.route_uart(uart),
            _ => Ok(()),
        };
        self.telemetry.record_result(result)
    }

    /// Detaches whatever is attached and masks the interrupt output.
    pub fn shutdown(&mut self) -> Result<(), MuicError> {
        let prev = self.status;
        let curr = ResolvedStatus::detached(&prev);
        self.debouncing = false;

        self.run_handlers(&NORMAL_HANDLERS, &prev, &curr, StatusBits::empty())?;
        self.status = curr;

        let masked = self
            .bus
            .update_bits(Register::Control1, control1::INT_MASK, control1::INT_MASK)
            .map_err(MuicError::io(Register::Control1));
        self.telemetry.record_result(masked)?;
        self.telemetry.record(MuicEventKind::Shutdown);
        Ok(())
    }

    fn read(&mut self, register: Register) -> Result<u8, MuicError> {
        self.bus.read(register).map_err(MuicError::io(register))
    }

    fn write(&mut self, register: Register, value: u8) -> Result<(), MuicError> {
        self.bus
            .write(register, value)
            .map_err(MuicError::io(register))
    }

    /// Status committed by the last completed cycle.
    pub const fn status(&self) -> &ResolvedStatus {
        &self.status
    }

    pub const fn cable_type(&self) -> CableType {
        self.status.cable_type
    }

    pub const fn paths(&self) -> &PathConfig {
        &self.paths
    }

    pub const fn retry(&self) -> &RetryState {
        &self.retry
    }

    pub const fn config(&self) -> &MuicConfig {
        &self.config
    }

    pub const fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    pub const fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub const fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn into_parts(self) -> (B, H) {
        (self.bus, self.hooks)
    }
}

/// Attach and detach notices the AP USB stack gets for `cable`, if any.
fn usb_events(cable: CableType) -> Option<(UsbEvent, UsbEvent)> {
    match cable {
        CableType::Usb(_) | CableType::JigUsbOff | CableType::JigUsbOn => {
            Some((UsbEvent::CableAttached, UsbEvent::CableDetached))
        }
        CableType::Otg => Some((UsbEvent::OtgHostAttached, UsbEvent::OtgHostDetached)),
        _ => None,
    }
}

/// Re-targets a live USB route. The AP stack sees a detach when the route
/// leaves it and an attach when the route arrives.
fn move_usb_route(
    ctx: &mut HandlerContext<'_>,
    from: ProcessorPath,
    to: ProcessorPath,
    events: Option<(UsbEvent, UsbEvent)>,
) -> Result<(), MuicError> {
    if from == ProcessorPath::Ap
        && let Some((_, detached)) = events
    {
        ctx.usb_event(detached);
    }
    ctx.route_usb(to)?;
    if to == ProcessorPath::Ap
        && let Some((attached, _)) = events
    {
        ctx.usb_event(attached);
    }
    Ok(())
}
