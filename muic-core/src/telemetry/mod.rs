//! Telemetry event catalog and the ring buffer the engine records into.
//!
//! The engine is `no_std` and never logs directly. Every noteworthy step of a
//! cycle lands here instead, and the runtime drains new records to whatever
//! log transport the target has (defmt on the MCU, stdout in the emulator).

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::cable::CableType;
use crate::error::{HardwareFault, MuicError};
use crate::hooks::{DockMode, ProcessorPath, UsbEvent};

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Monotonic telemetry record identifier.
pub type EventId = u32;

/// Engine events worth logging.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MuicEventKind {
    Initialized { vendor: u8 },
    CycleStarted,
    Classified(CableType),
    HandlerFired(&'static str),
    ChargerNotified(CableType),
    UsbNotified(UsbEvent),
    DockNotified(DockMode),
    UsbPath(ProcessorPath),
    UartPath(ProcessorPath),
    HardwareFault(HardwareFault),
    DebounceRetry(u8),
    DebounceForced,
    DebounceUnresolved,
    ClassificationForced(CableType),
    Error(MuicError),
    Shutdown,
}

impl fmt::Display for MuicEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MuicEventKind::Initialized { vendor } => write!(f, "initialized vendor={vendor:#04x}"),
            MuicEventKind::CycleStarted => f.write_str("cycle-started"),
            MuicEventKind::Classified(cable) => write!(f, "classified {cable}"),
            MuicEventKind::HandlerFired(label) => write!(f, "handler {label}"),
            MuicEventKind::ChargerNotified(cable) => write!(f, "charger {cable}"),
            MuicEventKind::UsbNotified(event) => write!(f, "usb {event}"),
            MuicEventKind::DockNotified(mode) => write!(f, "dock {mode}"),
            MuicEventKind::UsbPath(path) => write!(f, "usb-path {path}"),
            MuicEventKind::UartPath(path) => write!(f, "uart-path {path}"),
            MuicEventKind::HardwareFault(fault) => write!(f, "fault {fault}"),
            MuicEventKind::DebounceRetry(attempt) => write!(f, "dcd-retry {attempt}"),
            MuicEventKind::DebounceForced => f.write_str("dcd-forced-ta"),
            MuicEventKind::DebounceUnresolved => f.write_str("dcd-unresolved"),
            MuicEventKind::ClassificationForced(cable) => write!(f, "forced {cable}"),
            MuicEventKind::Error(err) => write!(f, "error: {err}"),
            MuicEventKind::Shutdown => f.write_str("shutdown"),
        }
    }
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub id: EventId,
    /// Detection cycle the event belongs to.
    pub cycle: u32,
    pub event: MuicEventKind,
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} [cycle {}] {}", self.id, self.cycle, self.event)
    }
}

/// Telemetry ring buffer type alias.
pub type TelemetryRing<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord, CAPACITY>;

/// Records engine events into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: TelemetryRing<CAPACITY>,
    next_event_id: EventId,
    cycle: u32,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
            cycle: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    /// Records with an id at or after `cursor`, oldest first.
    pub fn since(&self, cursor: EventId) -> impl Iterator<Item = &TelemetryRecord> + '_ {
        self.oldest_first().filter(move |record| record.id >= cursor)
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    /// Id the next record will receive.
    pub const fn next_id(&self) -> EventId {
        self.next_event_id
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Current cycle number.
    pub const fn cycle(&self) -> u32 {
        self.cycle
    }

    /// Starts a new cycle and records it.
    pub fn begin_cycle(&mut self) -> EventId {
        self.cycle = self.cycle.wrapping_add(1);
        self.record(MuicEventKind::CycleStarted)
    }

    /// Records an event against the current cycle.
    pub fn record(&mut self, event: MuicEventKind) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            cycle: self.cycle,
            event,
        });

        id
    }

    /// Records an error, passing the result through.
    pub fn record_result<T>(&mut self, result: Result<T, MuicError>) -> Result<T, MuicError> {
        if let Err(err) = &result {
            self.record(MuicEventKind::Error(*err));
        }
        result
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
