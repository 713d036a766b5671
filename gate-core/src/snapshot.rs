//! Touch driver abstraction and per-cycle sensor snapshots.
//!
//! The [`TouchDriver`] trait is the only contract the engine has with the
//! capacitive sensing hardware. [`SnapshotProvider`] wraps a driver and
//! enforces the arm, complete, read-once sequence of a scan cycle.

use crate::error::GateError;

/// Number of buttons on the reference board.
pub const BUTTON_COUNT: usize = 2;

/// Logical sensing element known to the touch driver.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WidgetId {
    Button(u8),
    Slider,
}

/// Detection state reported for a widget after a scan.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct WidgetState {
    pub active: bool,
}

impl WidgetState {
    pub const fn new(active: bool) -> Self {
        Self { active }
    }
}

/// Capabilities the engine needs from the capacitive sensing driver.
pub trait TouchDriver {
    /// Begins scanning every widget.
    fn start_scan(&mut self);

    /// Returns `true` once the scan started by [`start_scan`](Self::start_scan)
    /// has finished.
    fn is_scan_complete(&self) -> bool;

    /// Reads the detection state of a widget from the last completed scan.
    fn read_widget_state(&self, widget: WidgetId) -> WidgetState;

    /// Reads the slider position from the last completed scan.
    fn read_slider_position(&self) -> u16;
}

impl<T: TouchDriver + ?Sized> TouchDriver for &mut T {
    fn start_scan(&mut self) {
        (**self).start_scan();
    }

    fn is_scan_complete(&self) -> bool {
        (**self).is_scan_complete()
    }

    fn read_widget_state(&self, widget: WidgetId) -> WidgetState {
        (**self).read_widget_state(widget)
    }

    fn read_slider_position(&self) -> u16 {
        (**self).read_slider_position()
    }
}

/// Immutable view of every widget captured from one completed scan.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SensorSnapshot<const N: usize = BUTTON_COUNT> {
    pub button_states: [bool; N],
    pub slider_touched: bool,
    pub slider_position: u16,
}

impl<const N: usize> SensorSnapshot<N> {
    pub const fn new(button_states: [bool; N], slider_touched: bool, slider_position: u16) -> Self {
        Self {
            button_states,
            slider_touched,
            slider_position,
        }
    }

    /// Slider position when the slider is touched.
    pub const fn touched_position(&self) -> Option<u16> {
        if self.slider_touched {
            Some(self.slider_position)
        } else {
            None
        }
    }

    /// Packs the button states into a bitmask (bit `n` = button `n`).
    pub fn button_mask(&self) -> u8 {
        pack_buttons(&self.button_states)
    }
}

/// Packs up to eight button states into a bitmask.
pub(crate) fn pack_buttons(states: &[bool]) -> u8 {
    states
        .iter()
        .take(8)
        .enumerate()
        .fold(0u8, |mask, (index, active)| {
            if *active { mask | (1 << index) } else { mask }
        })
}

/// Progress of the scan owned by a [`SnapshotProvider`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ScanPhase {
    Disarmed,
    Armed,
    Consumed,
}

/// Produces one [`SensorSnapshot`] per completed scan.
pub struct SnapshotProvider<D, const N: usize = BUTTON_COUNT> {
    driver: D,
    phase: ScanPhase,
    max_position: u16,
}

impl<D: TouchDriver, const N: usize> SnapshotProvider<D, N> {
    /// Wraps `driver`; positions at or above `max_position` are clamped.
    pub const fn new(driver: D, max_position: u16) -> Self {
        Self {
            driver,
            phase: ScanPhase::Disarmed,
            max_position,
        }
    }

    /// Starts the next scan.
    pub fn arm(&mut self) {
        self.driver.start_scan();
        self.phase = ScanPhase::Armed;
    }

    /// Returns `true` when a scan has been started and not yet read.
    pub fn is_armed(&self) -> bool {
        self.phase == ScanPhase::Armed
    }

    /// Reads the snapshot of the completed scan.
    ///
    /// Fails with [`GateError::DriverNotReady`] when no scan is armed, the
    /// armed scan has not finished, or the scan was already read.
    pub fn poll(&mut self) -> Result<SensorSnapshot<N>, GateError> {
        if self.phase != ScanPhase::Armed || !self.driver.is_scan_complete() {
            return Err(GateError::DriverNotReady);
        }

        let mut button_states = [false; N];
        for (index, state) in button_states.iter_mut().enumerate() {
            let id = u8::try_from(index).unwrap_or(u8::MAX);
            *state = self.driver.read_widget_state(WidgetId::Button(id)).active;
        }
        let slider_touched = self.driver.read_widget_state(WidgetId::Slider).active;
        let slider_position = self
            .driver
            .read_slider_position()
            .min(self.max_position.saturating_sub(1));

        self.phase = ScanPhase::Consumed;
        Ok(SensorSnapshot::new(
            button_states,
            slider_touched,
            slider_position,
        ))
    }

    /// Provides access to the wrapped driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Provides mutable access to the wrapped driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
