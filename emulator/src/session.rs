use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant as HostInstant};

use gate_core::config::GateConfig;
use gate_core::console::commands::{self, CommandSpec};
use gate_core::console::{
    CommandError, CommandOutcome, ScanBatch, ScanInjector, StatusSummary, execute,
};
use gate_core::cycle::{CycleController, CycleOutcome, ScanFlag};
use gate_core::decision::OutputSink;
use gate_core::error::GateError;
use gate_core::snapshot::{BUTTON_COUNT, SensorSnapshot, TouchDriver, WidgetId, WidgetState};
use gate_core::telemetry::TelemetryRecorder;
use gate_core::tuner::{TUNER_FRAME_LEN, TunerBuffer};
use gate_core::zones::Zone;

/// Number of telemetry events shown by `status`.
const STATUS_EVENTS: usize = 5;

/// Touch driver backed by readings injected from the console.
#[derive(Debug, Default)]
pub struct SimulatedTouchDriver {
    scanning: bool,
    complete: bool,
    buttons: [bool; BUTTON_COUNT],
    position: Option<u16>,
    scans_started: u32,
}

impl SimulatedTouchDriver {
    pub fn scans_started(&self) -> u32 {
        self.scans_started
    }
}

impl TouchDriver for SimulatedTouchDriver {
    fn start_scan(&mut self) {
        self.scanning = true;
        self.complete = false;
        self.scans_started += 1;
    }

    fn is_scan_complete(&self) -> bool {
        self.complete
    }

    fn read_widget_state(&self, widget: WidgetId) -> WidgetState {
        let active = match widget {
            WidgetId::Button(index) => self
                .buttons
                .get(usize::from(index))
                .copied()
                .unwrap_or(false),
            WidgetId::Slider => self.position.is_some(),
        };
        WidgetState::new(active)
    }

    fn read_slider_position(&self) -> u16 {
        self.position.unwrap_or(0)
    }
}

impl ScanInjector for SimulatedTouchDriver {
    fn inject(&mut self, buttons: [bool; BUTTON_COUNT], position: Option<u16>) {
        self.buttons = buttons;
        self.position = position;
        self.complete = self.scanning;
    }
}

/// Stand-in for the PWM LED: remembers the level and counts edges.
#[derive(Debug)]
pub struct LedRecorder {
    brightness: u8,
    lit: bool,
    edges: u32,
}

impl LedRecorder {
    pub fn new(brightness: u8) -> Self {
        Self {
            brightness,
            lit: false,
            edges: 0,
        }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    pub fn edges(&self) -> u32 {
        self.edges
    }

    fn describe(&self, lit: bool) -> String {
        if lit {
            format!("on ({}%)", self.brightness)
        } else {
            "off".to_string()
        }
    }
}

impl OutputSink for LedRecorder {
    fn set_output(&mut self, active: bool) {
        if self.lit != active {
            self.edges += 1;
        }
        self.lit = active;
    }
}

type HostController<'f> =
    CycleController<'f, SimulatedTouchDriver, LedRecorder, TunerBuffer<TUNER_FRAME_LEN>>;

pub struct Session<'f> {
    controller: HostController<'f>,
    flag: &'f ScanFlag,
    telemetry: TelemetryRecorder,
    transcript: Option<TranscriptLogger>,
    started_at: HostInstant,
}

impl<'f> Session<'f> {
    pub fn new(config: &GateConfig, flag: &'f ScanFlag) -> Result<Self, GateError> {
        let mut controller = CycleController::new(
            config,
            flag,
            SimulatedTouchDriver::default(),
            LedRecorder::new(config.led_brightness),
            TunerBuffer::new(),
        )?;
        controller.start();

        Ok(Self {
            controller,
            flag,
            telemetry: TelemetryRecorder::new(),
            transcript: None,
            started_at: HostInstant::now(),
        })
    }

    /// Mirrors every command and response into a transcript file at `path`.
    pub fn with_transcript(mut self, path: &Path, header: &str) -> io::Result<Self> {
        self.transcript = Some(TranscriptLogger::new(path, header)?);
        Ok(self)
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.started_at.elapsed();
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.append_line(elapsed, TranscriptRole::Host, trimmed)?;
        }

        let lines = match execute(trimmed, &mut self.controller, self.flag) {
            Ok(CommandOutcome::Scanned(batch)) => self.describe_scans(&batch),
            Ok(CommandOutcome::Polled(result)) => vec![describe_poll(result)],
            Ok(CommandOutcome::Status(summary)) => self.describe_status(&summary),
            Ok(CommandOutcome::Zones(zones)) => describe_zones(zones),
            Ok(CommandOutcome::Help(topic)) => describe_help(topic),
            Err(CommandError::Parse(err)) => vec![format!("ERR syntax {err}")],
            Err(CommandError::UnknownTopic(target)) => vec![
                format!("No help available for `{target}`."),
                format!("Available topics: {}", help_topic_list()),
            ],
        };

        if let Some(transcript) = self.transcript.as_mut() {
            for response in &lines {
                transcript.append_line(elapsed, TranscriptRole::Emulator, response)?;
            }
        }
        Ok(lines)
    }

    pub fn controller(&self) -> &HostController<'f> {
        &self.controller
    }

    fn describe_scans(&mut self, batch: &ScanBatch) -> Vec<String> {
        let mut lines = Vec::new();
        for report in &batch.reports {
            self.telemetry.record_report(report);
            match report.outcome {
                CycleOutcome::Processed { decision, .. } => {
                    if let Some(line) = report.position_line() {
                        lines.push(line.to_string().trim_end().to_string());
                    }
                    if decision.changed {
                        let led = self.controller.sink().describe(decision.output);
                        lines.push(format!("LED {led}"));
                    }
                }
                CycleOutcome::Skipped(err) => {
                    lines.push(format!("WARN cycle {} skipped: {err}", report.cycle));
                }
            }
        }

        if let Some(err) = batch.stopped_by {
            self.telemetry.record_error(self.controller.cycles(), &err);
            lines.push(format!("ERR gate {err}"));
            return lines;
        }

        lines.push(format!(
            "OK scan cycles={} gate={} output={}",
            batch.reports.len(),
            self.controller.classification(),
            on_off(self.controller.output()),
        ));
        lines
    }

    fn describe_status(&self, summary: &StatusSummary) -> Vec<String> {
        let [b0, b1] = summary.buttons;
        let mut lines = vec![
            format!(
                "state={} cycles={} skipped={} threshold={}",
                summary.state, summary.cycles, summary.skipped, summary.confirm_threshold
            ),
            format!(
                "buttons b0={} b1={} position={}",
                u8::from(b0),
                u8::from(b1),
                summary
                    .position
                    .map_or_else(|| "none".to_string(), |p| p.to_string()),
            ),
            format!(
                "gate={} output={} led={} edges={}",
                summary.classification,
                on_off(summary.output),
                self.controller.sink().describe(self.controller.sink().is_lit()),
                self.controller.sink().edges(),
            ),
            format!(
                "tuner frames={} bytes={}",
                self.controller.tuner().publish_count(),
                hex(self.controller.tuner().latest()),
            ),
        ];

        let skip = self.telemetry.len().saturating_sub(STATUS_EVENTS);
        let recent: Vec<String> = self
            .telemetry
            .oldest_first()
            .skip(skip)
            .map(|event| format!("  {event}"))
            .collect();
        if recent.is_empty() {
            lines.push("events: none".to_string());
        } else {
            lines.push("events:".to_string());
            lines.extend(recent);
        }
        lines
    }
}

fn describe_poll(result: Result<SensorSnapshot, GateError>) -> String {
    match result {
        Ok(snapshot) => format!(
            "OK poll b0={} b1={} slider={}",
            u8::from(snapshot.button_states[0]),
            u8::from(snapshot.button_states[1]),
            snapshot
                .touched_position()
                .map_or_else(|| "untouched".to_string(), |p| p.to_string()),
        ),
        Err(err) => format!("ERR poll {err}"),
    }
}

fn describe_zones(zones: &[Zone]) -> Vec<String> {
    zones
        .iter()
        .map(|zone| {
            format!(
                "  [{}, {}) {}",
                zone.lower_bound, zone.upper_bound, zone.combinator
            )
        })
        .collect()
}

fn describe_help(topic: Option<&CommandSpec>) -> Vec<String> {
    match topic {
        Some(spec) => vec![spec.usage.to_string(), format!("  {}", spec.summary)],
        None => {
            let mut lines = vec!["Available commands:".to_string()];
            for spec in commands::commands() {
                lines.push(format!("  {:<48} - {}", spec.usage, spec.summary));
            }
            lines.push("Type `help <topic>` for a specific command.".to_string());
            lines
        }
    }
}

fn help_topic_list() -> String {
    commands::commands()
        .iter()
        .map(|spec| spec.name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn on_off(active: bool) -> &'static str {
    if active { "on" } else { "off" }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

struct TranscriptLogger {
    writer: BufWriter<fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path, header: &str) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        writeln!(logger.writer, "# {header}")?;
        writeln!(
            logger.writer,
            "# Timestamps are milliseconds since session start"
        )?;
        writeln!(logger.writer)?;
        logger.writer.flush()?;
        Ok(logger)
    }

    fn append_line(&mut self, elapsed: Duration, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
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
    use super::*;
    use gate_core::config::DEFAULT_GATE_CONFIG;

    fn run(session: &mut Session<'_>, line: &str) -> Vec<String> {
        session.handle_command(line).expect("command handled")
    }

    #[test]
    fn scan_prints_position_and_led_edges() {
        let flag = ScanFlag::new();
        let mut session = Session::new(&DEFAULT_GATE_CONFIG, &flag).expect("session");

        let lines = run(&mut session, "scan b0=1 pos=50");
        assert_eq!(
            lines,
            [
                "Slider Position: 50",
                "LED on (100%)",
                "OK scan cycles=1 gate=OR output=on",
            ]
        );

        let lines = run(&mut session, "scan b0=1 pos=150 count=3");
        assert_eq!(
            lines,
            [
                "Slider Position: 150",
                "LED off",
                "OK scan cycles=3 gate=AND output=off",
            ]
        );
        assert_eq!(session.controller().sink().edges(), 2);
        assert_eq!(session.controller().driver().scans_started(), 5);
    }

    #[test]
    fn poll_between_scans_reports_not_ready() {
        let flag = ScanFlag::new();
        let mut session = Session::new(&DEFAULT_GATE_CONFIG, &flag).expect("session");
        let lines = run(&mut session, "poll");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("ERR poll"), "{lines:?}");
    }

    #[test]
    fn status_lists_recent_events() {
        let flag = ScanFlag::new();
        let mut session = Session::new(&DEFAULT_GATE_CONFIG, &flag).expect("session");
        run(&mut session, "scan b0=1 b1=1 pos=250");

        let lines = run(&mut session, "status");
        assert_eq!(lines[0], "state=scanning cycles=1 skipped=0 threshold=1");
        assert_eq!(lines[1], "buttons b0=1 b1=1 position=250");
        assert_eq!(lines[2], "gate=XOR output=off led=off edges=0");
        assert!(lines[3].starts_with("tuner frames=1 bytes=544701"));
        assert_eq!(lines[4], "events:");
        assert_eq!(lines[5], "  #1 position 250");
        assert_eq!(lines[6], "  #1 zone XOR");
    }

    #[test]
    fn errors_and_help() {
        let flag = ScanFlag::new();
        let mut session = Session::new(&DEFAULT_GATE_CONFIG, &flag).expect("session");

        let lines = run(&mut session, "scan b0=7");
        assert!(lines[0].starts_with("ERR syntax"), "{lines:?}");

        let lines = run(&mut session, "help nope");
        assert_eq!(lines[0], "No help available for `nope`.");
        assert_eq!(lines[1], "Available topics: scan, poll, status, zones, help");

        let lines = run(&mut session, "zones");
        assert_eq!(lines, ["  [0, 100) OR", "  [100, 200) AND", "  [200, 300) XOR"]);
    }

    #[test]
    fn threshold_delays_confirmation() {
        let flag = ScanFlag::new();
        let config = DEFAULT_GATE_CONFIG.with_confirm_threshold(3);
        let mut session = Session::new(&config, &flag).expect("session");

        let lines = run(&mut session, "scan b0=1 pos=20 count=2");
        assert_eq!(lines, ["OK scan cycles=2 gate=no-op output=off"]);

        let lines = run(&mut session, "scan b0=1 pos=20");
        assert_eq!(
            lines,
            [
                "Slider Position: 20",
                "LED on (100%)",
                "OK scan cycles=1 gate=OR output=on",
            ]
        );
    }
}
