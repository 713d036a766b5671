//! Error taxonomy for the gate engine.

use core::fmt;

/// Reasons a zone table is rejected at startup.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ZoneTableError {
    /// The table contains no zones at all.
    Empty,
    /// Zone at `index` has `lower_bound >= upper_bound`.
    EmptyZone { index: usize },
    /// Zone at `index` starts before its predecessor.
    Unordered { index: usize },
    /// Zone at `index` starts inside its predecessor.
    Overlapping { index: usize },
    /// Zone at `index` extends past the slider's maximum position.
    OutOfRange { index: usize },
}

impl fmt::Display for ZoneTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneTableError::Empty => f.write_str("zone table is empty"),
            ZoneTableError::EmptyZone { index } => write!(f, "zone {index} has no positions"),
            ZoneTableError::Unordered { index } => {
                write!(f, "zone {index} is not ordered by lower bound")
            }
            ZoneTableError::Overlapping { index } => {
                write!(f, "zone {index} overlaps the previous zone")
            }
            ZoneTableError::OutOfRange { index } => {
                write!(f, "zone {index} exceeds the slider range")
            }
        }
    }
}

/// Errors surfaced by the gate engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GateError {
    /// The snapshot provider was polled before a scan was armed and completed,
    /// or polled twice for the same scan.
    DriverNotReady,
    /// The configured zone table is malformed. Fatal at startup.
    InvalidZoneTable(ZoneTableError),
    /// The tuner buffer cannot hold the published frame.
    SyncBufferOverflow { required: usize, capacity: usize },
}

impl GateError {
    /// Returns `true` for errors the cycle controller recovers from by
    /// skipping the cycle and re-arming the scan.
    pub const fn is_transient(self) -> bool {
        matches!(self, GateError::DriverNotReady)
    }
}

impl From<ZoneTableError> for GateError {
    fn from(error: ZoneTableError) -> Self {
        GateError::InvalidZoneTable(error)
    }
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::DriverNotReady => f.write_str("touch driver not ready"),
            GateError::InvalidZoneTable(reason) => write!(f, "invalid zone table: {reason}"),
            GateError::SyncBufferOverflow { required, capacity } => write!(
                f,
                "tuner buffer overflow: frame needs {required} bytes, buffer holds {capacity}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_driver_not_ready_is_transient() {
        assert!(GateError::DriverNotReady.is_transient());
        assert!(!GateError::InvalidZoneTable(ZoneTableError::Empty).is_transient());
        assert!(
            !GateError::SyncBufferOverflow {
                required: 16,
                capacity: 8
            }
            .is_transient()
        );
    }

    #[test]
    fn zone_errors_convert_into_gate_errors() {
        let error: GateError = ZoneTableError::Overlapping { index: 2 }.into();
        assert_eq!(
            error,
            GateError::InvalidZoneTable(ZoneTableError::Overlapping { index: 2 })
        );
    }
}
