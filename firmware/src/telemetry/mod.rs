//! Log transport for engine telemetry.
//!
//! The engine records into its own ring; after each cycle the worker drains
//! whatever is new and mirrors it to defmt on the MCU or stdout on the host.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use muic_core::telemetry::{EventId, TelemetryRecord, TelemetryRecorder};

use crate::hooks::Notice;

/// Cursor over a [`TelemetryRecorder`] that remembers what was logged.
pub struct TelemetryDrain {
    cursor: EventId,
}

impl TelemetryDrain {
    pub const fn new() -> Self {
        Self { cursor: 0 }
    }

    /// Logs records newer than the last drain. Returns how many were logged.
    pub fn drain(&mut self, recorder: &TelemetryRecorder) -> usize {
        let mut logged = 0;
        for record in recorder.since(self.cursor) {
            emit_record(record);
            logged += 1;
        }
        self.cursor = recorder.next_id();
        logged
    }
}

impl Default for TelemetryDrain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "none")]
fn emit_record(record: &TelemetryRecord) {
    defmt::info!(
        "muic #{} cycle={} {}",
        record.id,
        record.cycle,
        defmt::Display2Format(&record.event)
    );
}

#[cfg(not(target_os = "none"))]
fn emit_record(record: &TelemetryRecord) {
    println!("muic {record}");
}

#[cfg(target_os = "none")]
pub fn log_notice(notice: Notice) {
    match notice {
        Notice::Charger(cable) => defmt::info!("notice:charger {}", cable.label()),
        Notice::Usb(event) => defmt::info!("notice:usb {}", defmt::Display2Format(&event)),
        Notice::Dock(mode) => defmt::info!("notice:dock {}", defmt::Display2Format(&mode)),
    }
}

#[cfg(not(target_os = "none"))]
pub fn log_notice(notice: Notice) {
    match notice {
        Notice::Charger(cable) => println!("notice:charger {cable}"),
        Notice::Usb(event) => println!("notice:usb {event}"),
        Notice::Dock(mode) => println!("notice:dock {mode}"),
    }
}

#[cfg(target_os = "none")]
pub fn log_warning(message: &'static str) {
    defmt::warn!("muic: {}", message);
}

#[cfg(not(target_os = "none"))]
pub fn log_warning(message: &'static str) {
    println!("muic: {message}");
}

#[cfg(test)]
mod tests {
    use muic_core::CableType;
    use muic_core::telemetry::MuicEventKind;

    use super::*;

    #[test]
    fn drain_only_logs_new_records() {
        let mut recorder = TelemetryRecorder::new();
        let mut drain = TelemetryDrain::new();

        recorder.begin_cycle();
        recorder.record(MuicEventKind::Classified(CableType::Charger));
        assert_eq!(drain.drain(&recorder), 2);
        assert_eq!(drain.drain(&recorder), 0);

        recorder.record(MuicEventKind::Shutdown);
        assert_eq!(drain.drain(&recorder), 1);
    }

    #[test]
    fn drain_skips_records_lost_to_wraparound() {
        let mut recorder = TelemetryRecorder::new();
        let mut drain = TelemetryDrain::new();

        for attempt in 0..100u8 {
            recorder.record(MuicEventKind::DebounceRetry(attempt));
        }

        assert_eq!(drain.drain(&recorder), recorder.len());
    }
}
