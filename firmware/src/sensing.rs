//! Widget detection on raw TSC counts.
//!
//! A touch adds capacitance to the electrode, so fewer charge transfers are
//! needed to fill the sampling capacitor and the count drops. Detection
//! compares each count against a reference captured while the board is idle
//! after reset.

use gate_core::snapshot::BUTTON_COUNT;
use gate_core::zones::MAX_POSITION;

use crate::config::{
    BUTTON_TOUCH_THRESHOLD, CALIBRATION_SCANS, CHANNEL_COUNT, SLIDER_SEGMENTS,
    SLIDER_TOUCH_THRESHOLD, TOUCH_HYSTERESIS,
};

/// Detection result for one completed scan.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TouchReadings {
    pub buttons: [bool; BUTTON_COUNT],
    pub slider_touched: bool,
    pub slider_position: u16,
}

/// Reference counts and per-widget touch state.
pub struct Sensing {
    sums: [u32; CHANNEL_COUNT],
    calibration_scans: u8,
    reference: [u16; CHANNEL_COUNT],
    readings: TouchReadings,
}

impl Sensing {
    pub const fn new() -> Self {
        Self {
            sums: [0; CHANNEL_COUNT],
            calibration_scans: 0,
            reference: [0; CHANNEL_COUNT],
            readings: TouchReadings {
                buttons: [false; BUTTON_COUNT],
                slider_touched: false,
                slider_position: 0,
            },
        }
    }

    /// Returns `true` once the reference counts have been captured.
    pub const fn is_calibrated(&self) -> bool {
        self.calibration_scans >= CALIBRATION_SCANS
    }

    pub const fn reference(&self) -> &[u16; CHANNEL_COUNT] {
        &self.reference
    }

    /// Interprets `counts` without changing any state. Everything reads as
    /// untouched until calibration completes.
    pub fn evaluate(&self, counts: &[u16; CHANNEL_COUNT]) -> TouchReadings {
        if !self.is_calibrated() {
            return TouchReadings::default();
        }

        let deltas: [u16; CHANNEL_COUNT] =
            core::array::from_fn(|index| self.reference[index].saturating_sub(counts[index]));

        let buttons = core::array::from_fn(|index| {
            exceeds(
                deltas[index],
                BUTTON_TOUCH_THRESHOLD,
                self.readings.buttons[index],
            )
        });

        let segments = &deltas[BUTTON_COUNT..];
        let strongest = segments.iter().copied().max().unwrap_or(0);
        let slider_touched = exceeds(
            strongest,
            SLIDER_TOUCH_THRESHOLD,
            self.readings.slider_touched,
        );
        let slider_position = if slider_touched {
            centroid(segments)
        } else {
            self.readings.slider_position
        };

        TouchReadings {
            buttons,
            slider_touched,
            slider_position,
        }
    }

    /// Folds a completed scan into the state: accumulates the reference while
    /// calibrating, afterwards latches the readings used for hysteresis.
    pub fn commit(&mut self, counts: &[u16; CHANNEL_COUNT]) {
        if self.is_calibrated() {
            self.readings = self.evaluate(counts);
            return;
        }

        for (sum, count) in self.sums.iter_mut().zip(counts) {
            *sum += u32::from(*count);
        }
        self.calibration_scans += 1;

        if self.is_calibrated() {
            let scans = u32::from(self.calibration_scans);
            self.reference = core::array::from_fn(|index| {
                u16::try_from(self.sums[index] / scans).unwrap_or(u16::MAX)
            });
        }
    }
}

impl Default for Sensing {
    fn default() -> Self {
        Self::new()
    }
}

fn exceeds(delta: u16, threshold: u16, touched: bool) -> bool {
    if touched {
        delta >= threshold.saturating_sub(TOUCH_HYSTERESIS)
    } else {
        delta >= threshold
    }
}

/// Weighted centroid of the segment deltas, scaled to `0..MAX_POSITION`.
fn centroid(deltas: &[u16]) -> u16 {
    let span = u32::from(MAX_POSITION - 1);
    let last = u32::try_from(SLIDER_SEGMENTS - 1).unwrap_or(1).max(1);

    let (weighted, total) = deltas
        .iter()
        .zip(0u32..)
        .fold((0u32, 0u32), |(weighted, total), (delta, segment)| {
            let delta = u32::from(*delta);
            (weighted + delta * segment * span / last, total + delta)
        });

    if total == 0 {
        return 0;
    }
    u16::try_from(weighted / total).unwrap_or(MAX_POSITION - 1)
}
