//! Gate event catalog and in-memory history.
//!
//! Events carry compact numeric codes so firmware and host tooling can share
//! a transcript format. The recorder keeps the most recent events in a
//! fixed-size ring, indexed by the cycle that produced them.

use core::fmt;

use heapless::HistoryBuf;

use crate::cycle::{CycleOutcome, CycleReport};
use crate::error::GateError;
use crate::zones::{Classification, Combinator};

/// Total number of events retained in memory.
pub const EVENT_RING_CAPACITY: usize = 64;

/// Events emitted while processing scan cycles.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GateEventKind {
    /// The gate output changed level.
    OutputChanged(bool),
    /// A new slider position was confirmed.
    PositionConfirmed(u16),
    /// The confirmed position moved into a different zone.
    ZoneChanged(Classification),
    /// A cycle was skipped because no snapshot was available.
    CycleSkipped,
    /// The tuner buffer could not hold a frame.
    SyncOverflow,
    Custom(u16),
}

impl GateEventKind {
    const OUTPUT_LOW_CODE: u16 = 0x0000;
    const OUTPUT_HIGH_CODE: u16 = 0x0001;
    const ZONE_BASE: u16 = 0x0010;
    const CYCLE_SKIPPED_CODE: u16 = 0x0020;
    const SYNC_OVERFLOW_CODE: u16 = 0x0021;
    const POSITION_BASE: u16 = 0x1000;

    /// Encodes the event into a compact discriminant.
    ///
    /// Positions occupy `0x1000..0x2000`; positions outside that window
    /// cannot be represented and encode as the window base.
    #[must_use]
    pub fn to_raw(self) -> u16 {
        match self {
            GateEventKind::OutputChanged(false) => Self::OUTPUT_LOW_CODE,
            GateEventKind::OutputChanged(true) => Self::OUTPUT_HIGH_CODE,
            GateEventKind::PositionConfirmed(position) => {
                Self::POSITION_BASE + position.min(Self::POSITION_BASE - 1)
            }
            GateEventKind::ZoneChanged(classification) => {
                Self::ZONE_BASE + u16::from(classification.to_raw())
            }
            GateEventKind::CycleSkipped => Self::CYCLE_SKIPPED_CODE,
            GateEventKind::SyncOverflow => Self::SYNC_OVERFLOW_CODE,
            GateEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant, falling back to [`GateEventKind::Custom`].
    #[must_use]
    pub fn from_raw(code: u16) -> Self {
        match code {
            Self::OUTPUT_LOW_CODE => GateEventKind::OutputChanged(false),
            Self::OUTPUT_HIGH_CODE => GateEventKind::OutputChanged(true),
            Self::CYCLE_SKIPPED_CODE => GateEventKind::CycleSkipped,
            Self::SYNC_OVERFLOW_CODE => GateEventKind::SyncOverflow,
            value if (Self::ZONE_BASE..Self::ZONE_BASE + 4).contains(&value) => {
                u8::try_from(value - Self::ZONE_BASE)
                    .ok()
                    .and_then(Classification::from_raw)
                    .map_or(GateEventKind::Custom(value), GateEventKind::ZoneChanged)
            }
            value if (Self::POSITION_BASE..2 * Self::POSITION_BASE).contains(&value) => {
                GateEventKind::PositionConfirmed(value - Self::POSITION_BASE)
            }
            other => GateEventKind::Custom(other),
        }
    }
}

impl fmt::Display for GateEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateEventKind::OutputChanged(true) => f.write_str("output-on"),
            GateEventKind::OutputChanged(false) => f.write_str("output-off"),
            GateEventKind::PositionConfirmed(position) => write!(f, "position {position}"),
            GateEventKind::ZoneChanged(classification) => write!(f, "zone {classification}"),
            GateEventKind::CycleSkipped => f.write_str("cycle-skipped"),
            GateEventKind::SyncOverflow => f.write_str("sync-overflow"),
            GateEventKind::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl From<Combinator> for GateEventKind {
    fn from(combinator: Combinator) -> Self {
        GateEventKind::ZoneChanged(Classification::Gate(combinator))
    }
}

/// Event stored in the ring buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GateEvent {
    pub cycle: u32,
    pub kind: GateEventKind,
}

impl fmt::Display for GateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.cycle, self.kind)
    }
}

/// Records gate events into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = EVENT_RING_CAPACITY> {
    ring: HistoryBuf<GateEvent, CAPACITY>,
    zone: Option<Classification>,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            zone: None,
        }
    }

    /// Appends a single event, evicting the oldest when full.
    pub fn record(&mut self, cycle: u32, kind: GateEventKind) {
        self.ring.write(GateEvent { cycle, kind });
    }

    /// Derives events from a cycle report and appends them in order:
    /// position, zone, then output.
    pub fn record_report<const N: usize>(&mut self, report: &CycleReport<N>) {
        match report.outcome {
            CycleOutcome::Processed {
                classification,
                decision,
                position_changed,
                ..
            } => {
                if let Some(position) = position_changed {
                    self.record(report.cycle, GateEventKind::PositionConfirmed(position));
                }
                if self.zone != Some(classification) && position_changed.is_some() {
                    self.zone = Some(classification);
                    self.record(report.cycle, GateEventKind::ZoneChanged(classification));
                }
                if decision.changed {
                    self.record(report.cycle, GateEventKind::OutputChanged(decision.output));
                }
            }
            CycleOutcome::Skipped(_) => self.record(report.cycle, GateEventKind::CycleSkipped),
        }
    }

    /// Records a controller error that ended a cycle.
    pub fn record_error(&mut self, cycle: u32, error: &GateError) {
        let kind = match error {
            GateError::DriverNotReady => GateEventKind::CycleSkipped,
            GateError::SyncBufferOverflow { .. } => GateEventKind::SyncOverflow,
            GateError::InvalidZoneTable(_) => return,
        };
        self.record(cycle, kind);
    }

    /// Returns an iterator over the recorded events in chronological order.
    pub fn oldest_first(&self) -> impl DoubleEndedIterator<Item = &GateEvent> + '_ {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent event, if available.
    #[must_use]
    pub fn latest(&self) -> Option<&GateEvent> {
        self.ring.recent()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
