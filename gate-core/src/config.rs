//! Engine configuration.

use crate::debounce::DEFAULT_CONFIRM_THRESHOLD;
use crate::error::ZoneTableError;
use crate::zones::{DEFAULT_ZONES, MAX_POSITION, Zone, ZoneTable};

/// Tunables for the gate engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GateConfig {
    /// Number of identical scans required before a change is confirmed.
    pub confirm_threshold: u8,
    /// Slider zones, ordered and non-overlapping.
    pub zones: &'static [Zone],
    /// Exclusive upper bound of slider positions.
    pub max_position: u16,
    /// Gate selection assumed before the slider is first touched.
    pub initial_position: Option<u16>,
    /// LED brightness in percent when the output is on.
    pub led_brightness: u8,
}

impl GateConfig {
    pub const fn default() -> Self {
        Self {
            confirm_threshold: DEFAULT_CONFIRM_THRESHOLD,
            zones: &DEFAULT_ZONES,
            max_position: MAX_POSITION,
            initial_position: None,
            led_brightness: 100,
        }
    }

    /// Returns a copy with a different confirm threshold.
    pub const fn with_confirm_threshold(mut self, threshold: u8) -> Self {
        self.confirm_threshold = threshold;
        self
    }

    /// Returns a copy with a different zone table.
    pub const fn with_zones(mut self, zones: &'static [Zone]) -> Self {
        self.zones = zones;
        self
    }

    /// Returns a copy that assumes `position` before the first touch.
    pub const fn with_initial_position(mut self, position: Option<u16>) -> Self {
        self.initial_position = position;
        self
    }

    /// Checks the zone table against the slider range.
    pub fn validate(&self) -> Result<ZoneTable<'static>, ZoneTableError> {
        ZoneTable::new(self.zones, self.max_position)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::default()
    }
}

/// Configuration of the reference board.
pub const DEFAULT_GATE_CONFIG: GateConfig = GateConfig::default();
