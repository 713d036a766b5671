//! Gate telemetry and logging helpers.
//!
//! Wraps the core event ring, stamps each new event with the time it was
//! observed, and mirrors it to defmt on target or stdout on the host so
//! bring-up sessions can follow the gate without a tuner attached.

use core::fmt::{self, Write};

use embassy_time::{Duration, Instant};
use gate_core::cycle::CycleReport;
use gate_core::error::GateError;
use gate_core::telemetry::{GateEvent, GateEventKind, TelemetryRecorder};

/// Number of gate events kept on the device.
pub const TELEMETRY_RING_CAPACITY: usize = 32;

/// Event recorder used by the gate task.
pub struct GateTelemetry {
    recorder: TelemetryRecorder<TELEMETRY_RING_CAPACITY>,
    last_event_at: Option<Instant>,
}

impl GateTelemetry {
    pub const fn new() -> Self {
        Self {
            recorder: TelemetryRecorder::new(),
            last_event_at: None,
        }
    }

    /// Records the events derived from `report` and logs each one.
    pub fn record_report(&mut self, report: &CycleReport, timestamp: Instant) {
        self.recorder.record_report(report);
        self.log_cycle_events(report.cycle, timestamp);
    }

    /// Records the error that ended a cycle and logs it.
    pub fn record_error(&mut self, cycle: u32, error: &GateError, timestamp: Instant) {
        self.recorder.record_error(cycle, error);
        self.log_cycle_events(cycle, timestamp);
    }

    pub fn recorder(&self) -> &TelemetryRecorder<TELEMETRY_RING_CAPACITY> {
        &self.recorder
    }

    /// Logs the events stamped with `cycle`, which are always the newest ones.
    fn log_cycle_events(&mut self, cycle: u32, timestamp: Instant) {
        let added = self
            .recorder
            .oldest_first()
            .rev()
            .take_while(|event| event.cycle == cycle)
            .count();
        if added == 0 {
            return;
        }

        let elapsed = self
            .last_event_at
            .map(|previous| timestamp.saturating_duration_since(previous));
        self.last_event_at = Some(timestamp);

        let skip = self.recorder.len() - added;
        for event in self.recorder.oldest_first().skip(skip) {
            log_event(event, timestamp, elapsed);
        }
    }
}

impl Default for GateTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

fn log_event(event: &GateEvent, timestamp: Instant, elapsed: Option<Duration>) {
    let timestamp_us = timestamp.as_micros();
    let delta_us = elapsed.map(|value| value.as_micros());
    emit_log(event.cycle, event.kind, timestamp_us, delta_us);
}

#[cfg(target_os = "none")]
fn emit_log(cycle: u32, kind: GateEventKind, timestamp_us: u64, delta_us: Option<u64>) {
    let label = EventLabel(kind);
    match (kind, delta_us) {
        (GateEventKind::CycleSkipped | GateEventKind::SyncOverflow, _) => {
            defmt::warn!("telemetry:gate #{} {} t={}us", cycle, label, timestamp_us);
        }
        (_, Some(delta)) => defmt::info!(
            "telemetry:gate #{} {} t={}us Δ={}us",
            cycle,
            label,
            timestamp_us,
            delta
        ),
        (_, None) => defmt::info!("telemetry:gate #{} {} t={}us", cycle, label, timestamp_us),
    }
}

#[cfg(not(target_os = "none"))]
fn emit_log(cycle: u32, kind: GateEventKind, timestamp_us: u64, delta_us: Option<u64>) {
    if let Some(delta) = delta_us {
        println!("telemetry:gate #{cycle} {kind} t={timestamp_us}us Δ={delta}us");
    } else {
        println!("telemetry:gate #{cycle} {kind} t={timestamp_us}us");
    }
}

#[cfg(target_os = "none")]
struct EventLabel(GateEventKind);

#[cfg(target_os = "none")]
impl defmt::Format for EventLabel {
    fn format(&self, f: defmt::Formatter) {
        match self.0 {
            GateEventKind::OutputChanged(true) => defmt::write!(f, "output-on"),
            GateEventKind::OutputChanged(false) => defmt::write!(f, "output-off"),
            GateEventKind::PositionConfirmed(position) => defmt::write!(f, "position {}", position),
            GateEventKind::ZoneChanged(zone) => match zone.combinator() {
                Some(combinator) => defmt::write!(f, "zone {}", combinator.label()),
                None => defmt::write!(f, "zone no-op"),
            },
            GateEventKind::CycleSkipped => defmt::write!(f, "cycle-skipped"),
            GateEventKind::SyncOverflow => defmt::write!(f, "sync-overflow"),
            GateEventKind::Custom(code) => defmt::write!(f, "custom({})", code),
        }
    }
}

const BANNER_TITLE: &str = "CapSense Touch Gate Selector";

/// Writes the startup banner: clear screen, cursor home, then a boxed title.
pub fn write_banner<W: Write>(out: &mut W) -> fmt::Result {
    let rule = Rule(BANNER_TITLE.len() + 4);
    out.write_str("\x1b[2J\x1b[;H")?;
    write!(out, "{rule}\r\n* {BANNER_TITLE} *\r\n{rule}\r\n\r\n")
}

/// Row of asterisks `n` wide.
struct Rule(usize);

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.0 {
            f.write_char('*')?;
        }
        Ok(())
    }
}
