//! Console command catalog and dispatcher.
//!
//! Parsed commands drive a [`CycleController`] whose touch driver can be fed
//! simulated inputs. The dispatcher plays the role of the scan-complete
//! interrupt: it loads the inputs, raises the [`ScanFlag`], and polls the
//! controller once per requested scan.

use heapless::Vec;

use super::grammar::{self, Command, MAX_SCAN_COUNT, ScanCommand};
use crate::cycle::{CycleController, CycleReport, CycleState, ScanFlag};
use crate::decision::OutputSink;
use crate::error::GateError;
use crate::snapshot::{BUTTON_COUNT, SensorSnapshot, TouchDriver};
use crate::tuner::TunerSync;
use crate::zones::{Classification, Zone};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandTag {
    Scan,
    Poll,
    Status,
    Zones,
    Help,
}

/// Catalog entry describing a console command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub tag: CommandTag,
    pub usage: &'static str,
    pub summary: &'static str,
}

const COMMANDS: [CommandSpec; 5] = [
    CommandSpec {
        name: "scan",
        tag: CommandTag::Scan,
        usage: "scan [b0=<0|1>] [b1=<0|1>] [pos=<n>] [count=<n>]",
        summary: "run scan cycles with the given inputs; omitted pos leaves the slider untouched",
    },
    CommandSpec {
        name: "poll",
        tag: CommandTag::Poll,
        usage: "poll",
        summary: "read the snapshot provider without completing a scan",
    },
    CommandSpec {
        name: "status",
        tag: CommandTag::Status,
        usage: "status",
        summary: "show cycle state, confirmed inputs, gate, and output",
    },
    CommandSpec {
        name: "zones",
        tag: CommandTag::Zones,
        usage: "zones",
        summary: "list slider zones and their combinators",
    },
    CommandSpec {
        name: "help",
        tag: CommandTag::Help,
        usage: "help [command]",
        summary: "list commands or describe one",
    },
];

/// Returns the full command catalog.
#[must_use]
pub const fn commands() -> &'static [CommandSpec] {
    &COMMANDS
}

/// Finds a command by name (case insensitive).
#[must_use]
pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

/// Touch driver that can be loaded with simulated readings.
pub trait ScanInjector {
    /// Stores the readings for the armed scan and marks it complete.
    fn inject(&mut self, buttons: [bool; BUTTON_COUNT], position: Option<u16>);
}

impl<T: ScanInjector + ?Sized> ScanInjector for &mut T {
    fn inject(&mut self, buttons: [bool; BUTTON_COUNT], position: Option<u16>) {
        (**self).inject(buttons, position);
    }
}

/// Reports collected by one `scan` command.
pub type ScanReports = Vec<CycleReport, MAX_SCAN_COUNT>;

/// Result of a `scan` command: every completed cycle, plus the error that
/// stopped the batch early, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanBatch {
    pub reports: ScanReports,
    pub stopped_by: Option<GateError>,
}

/// Point-in-time view of the controller for `status`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusSummary {
    pub state: CycleState,
    pub cycles: u32,
    pub skipped: u32,
    pub confirm_threshold: u8,
    pub buttons: [bool; BUTTON_COUNT],
    pub position: Option<u16>,
    pub classification: Classification,
    pub output: bool,
}

/// Command execution successes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Scanned(ScanBatch),
    Polled(Result<SensorSnapshot, GateError>),
    Status(StatusSummary),
    Zones(&'static [Zone]),
    Help(Option<&'static CommandSpec>),
}

/// Errors surfaced while executing a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandError<'a> {
    Parse(grammar::ParseError<'a>),
    UnknownTopic(&'a str),
}

impl<'a> From<grammar::ParseError<'a>> for CommandError<'a> {
    fn from(error: grammar::ParseError<'a>) -> Self {
        Self::Parse(error)
    }
}

/// Parses `line` and executes it against `controller`.
///
/// `flag` must be the flag the controller was built with.
pub fn execute<'a, D, S, T>(
    line: &'a str,
    controller: &mut CycleController<'_, D, S, T>,
    flag: &ScanFlag,
) -> Result<CommandOutcome, CommandError<'a>>
where
    D: TouchDriver + ScanInjector,
    S: OutputSink,
    T: TunerSync,
{
    match grammar::parse(line)? {
        Command::Scan(scan) => Ok(CommandOutcome::Scanned(run_scans(&scan, controller, flag))),
        Command::Poll => Ok(CommandOutcome::Polled(controller.read_provider())),
        Command::Status => Ok(CommandOutcome::Status(status(controller))),
        Command::Zones => Ok(CommandOutcome::Zones(controller.zones().zones())),
        Command::Help(help) => match help.topic {
            None => Ok(CommandOutcome::Help(None)),
            Some(topic) => find(topic)
                .map(|spec| CommandOutcome::Help(Some(spec)))
                .ok_or(CommandError::UnknownTopic(topic)),
        },
    }
}

fn run_scans<D, S, T>(
    scan: &ScanCommand,
    controller: &mut CycleController<'_, D, S, T>,
    flag: &ScanFlag,
) -> ScanBatch
where
    D: TouchDriver + ScanInjector,
    S: OutputSink,
    T: TunerSync,
{
    controller.start();
    let mut reports = ScanReports::new();

    for _ in 0..scan.count {
        controller.driver_mut().inject(scan.buttons, scan.position);
        flag.raise();
        match controller.poll() {
            Ok(Some(report)) => {
                // count is bounded by MAX_SCAN_COUNT, the vector capacity
                let _ = reports.push(report);
            }
            Ok(None) => {}
            Err(error) => {
                return ScanBatch {
                    reports,
                    stopped_by: Some(error),
                };
            }
        }
    }

    ScanBatch {
        reports,
        stopped_by: None,
    }
}

/// Summarises the controller for `status`.
#[must_use]
pub fn status<D, S, T>(controller: &CycleController<'_, D, S, T>) -> StatusSummary
where
    D: TouchDriver,
    S: OutputSink,
    T: TunerSync,
{
    let debounced = controller.debounced();
    StatusSummary {
        state: controller.state(),
        cycles: controller.cycles(),
        skipped: controller.skipped(),
        confirm_threshold: controller.confirm_threshold(),
        buttons: debounced.confirmed_buttons,
        position: debounced.confirmed_slider_position,
        classification: controller.classification(),
        output: controller.output(),
    }
}
