use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use muic_core::path::SwitchRoute;
use muic_core::registers::Register;
use muic_core::telemetry::EventId;
use muic_core::{
    CableType, CycleOutcome, DockMode, HookError, MuicConfig, MuicEngine, PlatformHooks,
    ProcessorPath, UsbEvent,
};

use crate::command::{self, Command, PathTarget};
use crate::sim::SimulatedMuic;

/// Interrupt passes serviced per command before giving up on a stuck line.
const MAX_INTERRUPT_PASSES: usize = 4;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "plug",
        "plug <cable> [vbus|novbus]  - present a cable (see `help cables`)",
    ),
    ("unplug", "unplug                      - remove the cable"),
    (
        "fault",
        "fault <ovp|ocp|otp>         - latch a protection interrupt",
    ),
    (
        "dcd",
        "dcd <count>                 - report DCD timeout on the next <count> reads",
    ),
    ("por", "por                         - latch a power-on reset"),
    (
        "path",
        "path <usb|uart> <ap|cp>     - route a data path to a processor",
    ),
    (
        "status",
        "status                      - display the detection state",
    ),
    (
        "help",
        "help [topic]                - show help for a command",
    ),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptProfile {
    Usb,
    Jig,
    Debounce,
}

impl TranscriptProfile {
    pub fn log_path(self) -> &'static str {
        match self {
            TranscriptProfile::Usb => "transcripts/emulator-usb.log",
            TranscriptProfile::Jig => "transcripts/emulator-jig.log",
            TranscriptProfile::Debounce => "transcripts/emulator-debounce.log",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            TranscriptProfile::Usb => "MUIC Emulator USB and charger transcript",
            TranscriptProfile::Jig => "MUIC Emulator JIG and UART transcript",
            TranscriptProfile::Debounce => "MUIC Emulator debounce transcript",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("usb") {
            Ok(Self::Usb)
        } else if tag.eq_ignore_ascii_case("jig") {
            Ok(Self::Jig)
        } else if tag.eq_ignore_ascii_case("debounce") {
            Ok(Self::Debounce)
        } else {
            Err(format!("Unknown transcript profile `{tag}`"))
        }
    }
}

type EmulatedEngine = MuicEngine<SimulatedMuic, ConsoleHooks>;

pub struct Session {
    engine: EmulatedEngine,
    transcript: TranscriptLogger,
    started_at: Instant,
    telemetry_cursor: EventId,
}

impl Session {
    pub fn new(profile: TranscriptProfile) -> io::Result<Self> {
        Self::with_transcript(TranscriptLogger::new(profile)?)
    }

    /// Session that keeps no transcript.
    pub fn detached() -> io::Result<Self> {
        Self::with_transcript(TranscriptLogger::disabled())
    }

    fn with_transcript(transcript: TranscriptLogger) -> io::Result<Self> {
        let mut engine = MuicEngine::new(
            SimulatedMuic::new(),
            ConsoleHooks::default(),
            MuicConfig::DEFAULT,
        );
        engine
            .initialize()
            .map_err(|err| io::Error::other(err.to_string()))?;

        Ok(Self {
            engine,
            transcript,
            started_at: Instant::now(),
            telemetry_cursor: 0,
        })
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.started_at.elapsed();
        self.transcript
            .append_line(elapsed, TranscriptRole::Host, trimmed)?;

        let mut lines = Vec::new();
        match command::parse(trimmed) {
            Ok(command) => self.execute(command, &mut lines),
            Err(err) => {
                let detail = err.inner().to_string();
                if detail.is_empty() {
                    lines.push(format!("ERR syntax at column {}", err.offset()));
                } else {
                    lines.push(format!("ERR syntax at column {}: {detail}", err.offset()));
                }
            }
        }

        self.collect_notices(&mut lines);
        self.record_output(elapsed, &lines)?;
        Ok(lines)
    }

    fn execute(&mut self, command: Command<'_>, lines: &mut Vec<String>) {
        match command {
            Command::Plug { cable, vbus } => {
                let image = self.engine.bus_mut().plug(cable, vbus);
                lines.push(format!(
                    "OK plug {cable} adc={:#04x} device={:#04x} vbus={}",
                    image.adc,
                    image.device1,
                    on_off(image.vbus)
                ));
                self.service_interrupt(lines);
            }
            Command::Unplug => {
                self.engine.bus_mut().unplug();
                lines.push("OK unplug".to_string());
                self.service_interrupt(lines);
            }
            Command::Fault(fault) => {
                self.engine.bus_mut().raise_fault(fault);
                lines.push(format!("OK fault {}", fault.tag()));
                self.service_interrupt(lines);
            }
            Command::Dcd(count) => {
                self.engine.bus_mut().arm_dcd(count);
                lines.push(format!("OK dcd armed reads={count}"));
            }
            Command::Por => {
                self.engine.bus_mut().power_on_reset();
                lines.push("OK por".to_string());
                self.service_interrupt(lines);
            }
            Command::Path { target, path } => self.handle_path(target, path, lines),
            Command::Status => self.describe_status(lines),
            Command::Help(topic) => handle_help(topic, lines),
            Command::Exit => lines.push("Session closed.".to_string()),
        }
    }

    fn handle_path(&mut self, target: PathTarget, path: ProcessorPath, lines: &mut Vec<String>) {
        let config = self.engine.config();
        let (usb, uart) = match target {
            PathTarget::Usb => (path, config.uart_path),
            PathTarget::Uart => (config.usb_path, path),
        };

        match self.engine.configure_paths(usb, uart) {
            Ok(()) => lines.push(format!("OK path usb={usb} uart={uart}")),
            Err(err) => lines.push(format!("ERR path {err}")),
        }
    }

    /// Runs detection cycles for as long as the simulated INT line is low.
    fn service_interrupt(&mut self, lines: &mut Vec<String>) {
        let mut passes = 0;
        while self.engine.bus().interrupt_pending() {
            if passes == MAX_INTERRUPT_PASSES {
                lines.push("WARN interrupt still asserted; giving up".to_string());
                break;
            }
            passes += 1;

            let (outcome, retries, waited) = self.run_to_completion();
            if retries > 0 {
                lines.push(format!(
                    "debounce retries={retries} waited={}",
                    format_duration_short(waited)
                ));
            }
            lines.push(describe_outcome(&outcome));
        }
    }

    /// Drives one cycle through any debounce waits. The wait is simulated.
    fn run_to_completion(&mut self) -> (CycleOutcome, u8, Duration) {
        let mut retries = 0u8;
        let mut waited = Duration::ZERO;
        let mut outcome = self.engine.run_cycle();
        while let CycleOutcome::Debouncing {
            attempt,
            retry_after,
        } = outcome
        {
            retries = attempt;
            waited += retry_after;
            outcome = self.engine.resume_debounce();
        }
        (outcome, retries, waited)
    }

    fn describe_status(&self, lines: &mut Vec<String>) {
        let status = self.engine.status();
        let paths = self.engine.paths();
        let retry = self.engine.retry();
        let bus = self.engine.bus();
        let (reads, writes) = bus.traffic();

        lines.push(format!(
            "cable={} vbus={} route={} usb-path={} uart-path={}",
            status.cable_type,
            on_off(status.vbus_present()),
            describe_route(paths.route),
            paths.usb,
            paths.uart,
        ));
        let bits: Vec<&str> = status.bits.iter_names().map(|(name, _)| name).collect();
        lines.push(format!(
            "bits={}",
            if bits.is_empty() {
                "-".to_string()
            } else {
                bits.join("|")
            }
        ));
        lines.push(format!(
            "adc={:#04x} device={:#06x} sw1={:#04x} control1={:#04x}",
            status.snapshot.id_adc(),
            status.snapshot.device_code(),
            bus.reg(Register::ManualSw1),
            bus.reg(Register::Control1),
        ));
        lines.push(format!(
            "dcd-retries={}/{} dcd-armed={} bus reads={reads} writes={writes}",
            retry.count(),
            retry.limit(),
            bus.dcd_reads(),
        ));
    }

    /// Moves callback output and fresh telemetry into `lines`.
    fn collect_notices(&mut self, lines: &mut Vec<String>) {
        lines.append(&mut self.engine.hooks_mut().take_lines());

        let telemetry = self.engine.telemetry();
        for record in telemetry.since(self.telemetry_cursor) {
            lines.push(format!("  log {record}"));
        }
        self.telemetry_cursor = telemetry.next_id();
    }

    fn record_output(&mut self, elapsed: Duration, lines: &[String]) -> io::Result<()> {
        for line in lines {
            self.transcript
                .append_line(elapsed, TranscriptRole::Emulator, line)?;
        }
        Ok(())
    }
}

/// Hooks that narrate every callback to the console.
#[derive(Default)]
pub struct ConsoleHooks {
    lines: Vec<String>,
}

impl ConsoleHooks {
    fn take_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }
}

impl PlatformHooks for ConsoleHooks {
    fn charger(&mut self, cable: CableType) -> Result<(), HookError> {
        self.lines.push(format!("  charger <- {cable}"));
        Ok(())
    }

    fn usb_event(&mut self, event: UsbEvent) {
        self.lines.push(format!("  usb <- {event}"));
    }

    fn dock(&mut self, mode: DockMode) {
        self.lines.push(format!("  dock <- {mode}"));
    }

    fn host_notify(&mut self, active: bool) -> i32 {
        self.lines.push(format!("  host-notify <- {}", on_off(active)));
        0
    }

    fn set_usb_path(&mut self, path: ProcessorPath) {
        self.lines.push(format!("  usb-sel <- {path}"));
    }

    fn set_uart_path(&mut self, path: ProcessorPath) {
        self.lines.push(format!("  uart-sel <- {path}"));
    }
}

fn handle_help(topic: Option<&str>, lines: &mut Vec<String>) {
    match topic {
        Some("cables") => {
            let labels: Vec<&str> = CableType::ALL
                .iter()
                .map(|cable| cable.label())
                .collect();
            lines.push(format!("Cables: {}", labels.join(", ")));
        }
        Some(target) => {
            if let Some((_, detail)) = HELP_TOPICS.iter().find(|(name, _)| *name == target) {
                lines.push((*detail).to_string());
            } else {
                lines.push(format!("No help available for `{target}`."));
                lines.push(format!("Available topics: {}", help_topic_list()));
            }
        }
        None => {
            lines.push("Available commands:".to_string());
            for (_, detail) in HELP_TOPICS {
                lines.push(format!("  {detail}"));
            }
            lines.push("Type `help <topic>` for a specific command.".to_string());
        }
    }
}

fn help_topic_list() -> String {
    let mut names: Vec<&str> = HELP_TOPICS.iter().map(|(name, _)| *name).collect();
    names.push("cables");
    names.join(", ")
}

fn describe_outcome(outcome: &CycleOutcome) -> String {
    match outcome {
        CycleOutcome::Completed(report) => {
            let mut line = format!(
                "OK cycle {} -> {} handlers={}",
                report.previous, report.cable_type, report.handlers_fired
            );
            if let Some(forced) = report.forced {
                line.push_str(&format!(" forced={forced}"));
            }
            line
        }
        CycleOutcome::Debouncing { attempt, .. } => {
            format!("PENDING debounce attempt={attempt}")
        }
        CycleOutcome::Unresolved => {
            "WARN cycle unresolved; status kept after power-on reset".to_string()
        }
        CycleOutcome::Aborted(err) => format!("ERR cycle {err}"),
    }
}

fn describe_route(route: SwitchRoute) -> String {
    match route {
        SwitchRoute::Open => "open".to_string(),
        SwitchRoute::Usb(path) => format!("usb:{path}"),
        SwitchRoute::Uart(path) => format!("uart:{path}"),
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn format_duration_short(duration: Duration) -> String {
    if duration.as_secs() == 0 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}

struct TranscriptLogger {
    writer: Option<BufWriter<std::fs::File>>,
}

impl TranscriptLogger {
    fn new(profile: TranscriptProfile) -> io::Result<Self> {
        let path = Path::new(profile.log_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: Some(BufWriter::new(file)),
        };

        logger.write_header(profile)?;
        Ok(logger)
    }

    fn disabled() -> Self {
        Self { writer: None }
    }

    fn write_header(&mut self, profile: TranscriptProfile) -> io::Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        writeln!(writer, "# {}", profile.header())?;
        writeln!(writer, "# Timestamps are milliseconds since session start")?;
        writeln!(writer)?;
        writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        writeln!(
            writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

#[cfg(test)]
mod tests {
    use muic_core::UsbPort;

    use super::*;

    impl Session {
        fn cable_type(&self) -> CableType {
            self.engine.cable_type()
        }

        fn route(&self) -> SwitchRoute {
            self.engine.paths().route
        }
    }

    fn session() -> Session {
        Session::detached().expect("session")
    }

    fn contains(lines: &[String], needle: &str) -> bool {
        lines.iter().any(|line| line.contains(needle))
    }

    #[test]
    fn plug_usb_routes_and_notifies() {
        let mut session = session();
        let lines = session.handle_command("plug usb-sdp").expect("command");

        assert_eq!(session.cable_type(), CableType::Usb(UsbPort::Sdp));
        assert_eq!(session.route(), SwitchRoute::Usb(ProcessorPath::Ap));
        assert!(contains(&lines, "OK cycle none -> usb-sdp"), "{lines:?}");
        assert!(contains(&lines, "charger <- usb-sdp"), "{lines:?}");
        assert!(contains(&lines, "usb <- cable-attached"), "{lines:?}");
    }

    #[test]
    fn unplug_returns_to_none() {
        let mut session = session();
        session.handle_command("plug ta").expect("command");
        let lines = session.handle_command("unplug").expect("command");

        assert_eq!(session.cable_type(), CableType::None);
        assert!(contains(&lines, "charger <- none"), "{lines:?}");
    }

    #[test]
    fn dcd_noise_is_retried_then_classified() {
        let mut session = session();
        session.handle_command("dcd 3").expect("command");
        let lines = session.handle_command("plug ta").expect("command");

        assert!(contains(&lines, "debounce retries=3"), "{lines:?}");
        assert_eq!(session.cable_type(), CableType::Charger);
    }

    #[test]
    fn path_command_moves_active_route() {
        let mut session = session();
        session.handle_command("plug usb-sdp").expect("command");
        let lines = session.handle_command("path usb cp").expect("command");

        assert!(contains(&lines, "OK path usb=CP uart=AP"), "{lines:?}");
        assert!(contains(&lines, "usb <- cable-detached"), "{lines:?}");
        assert_eq!(session.route(), SwitchRoute::Usb(ProcessorPath::Cp));
    }

    #[test]
    fn charger_is_released_when_otg_replaces_ta() {
        let mut session = session();
        session.handle_command("plug ta").expect("command");
        let lines = session.handle_command("plug otg").expect("command");

        assert_eq!(session.cable_type(), CableType::Otg);
        assert!(contains(&lines, "charger <- none"), "{lines:?}");
        assert!(contains(&lines, "usb <- otg-host-attached"), "{lines:?}");
    }

    #[test]
    fn status_and_help_do_not_touch_the_engine() {
        let mut session = session();
        let status = session.handle_command("status").expect("command");
        assert!(contains(&status, "cable=none"), "{status:?}");

        let help = session.handle_command("help dcd").expect("command");
        assert_eq!(help.len(), 1);
        assert!(help[0].starts_with("dcd <count>"));

        let cables = session.handle_command("help cables").expect("command");
        assert!(contains(&cables, "jig-uart-off-vb"));
    }

    #[test]
    fn syntax_errors_are_reported() {
        let mut session = session();
        let lines = session.handle_command("plug toaster").expect("command");
        assert!(lines[0].starts_with("ERR syntax"), "{lines:?}");
    }
}
