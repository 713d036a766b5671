//! Debounce/confirm filter for touch snapshots.
//!
//! Capacitive sensors glitch. Each button, and the slider position as a single
//! value, must read the same for `threshold` consecutive scans before the
//! filter treats it as confirmed. A threshold of one confirms on the first
//! observation.

use crate::snapshot::{BUTTON_COUNT, SensorSnapshot, pack_buttons};

/// Default number of identical scans required to confirm a change.
pub const DEFAULT_CONFIRM_THRESHOLD: u8 = 1;

/// Candidate value waiting for confirmation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Pending<T> {
    pub candidate: Option<T>,
    pub count: u8,
}

impl<T: Copy + PartialEq> Pending<T> {
    pub const fn new() -> Self {
        Self {
            candidate: None,
            count: 0,
        }
    }

    /// Feeds one observation and returns it once it has been seen `threshold`
    /// times in a row.
    pub fn observe(&mut self, value: T, threshold: u8) -> Option<T> {
        match self.candidate {
            Some(candidate) if candidate == value => {
                self.count = self.count.saturating_add(1);
            }
            _ => {
                self.candidate = Some(value);
                self.count = 1;
            }
        }

        (self.count >= threshold).then_some(value)
    }

    /// Drops the candidate.
    pub fn clear(&mut self) {
        self.candidate = None;
        self.count = 0;
    }
}

impl<T: Copy + PartialEq> Default for Pending<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Confirmed inputs plus the candidates still waiting for confirmation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DebouncedState<const N: usize = BUTTON_COUNT> {
    pub confirmed_buttons: [bool; N],
    /// Last confirmed slider position. It stays latched after the finger
    /// leaves the slider so the selected gate persists.
    pub confirmed_slider_position: Option<u16>,
    pub pending_buttons: [Pending<bool>; N],
    pub pending_slider: Pending<u16>,
}

impl<const N: usize> DebouncedState<N> {
    pub const fn new(initial_position: Option<u16>) -> Self {
        Self {
            confirmed_buttons: [false; N],
            confirmed_slider_position: initial_position,
            pending_buttons: [Pending::new(); N],
            pending_slider: Pending::new(),
        }
    }

    /// Confirmed state of a single button; missing buttons read as released.
    pub fn button(&self, index: usize) -> bool {
        self.confirmed_buttons.get(index).copied().unwrap_or(false)
    }

    /// Gate inputs: the first two confirmed buttons.
    pub fn gate_inputs(&self) -> (bool, bool) {
        (self.button(0), self.button(1))
    }

    /// Packs the confirmed buttons into a bitmask.
    pub fn button_mask(&self) -> u8 {
        pack_buttons(&self.confirmed_buttons)
    }
}

/// Applies the confirm threshold to consecutive snapshots.
pub struct DebounceFilter<const N: usize = BUTTON_COUNT> {
    state: DebouncedState<N>,
    threshold: u8,
}

impl<const N: usize> DebounceFilter<N> {
    /// Creates a filter; a threshold of zero behaves like one.
    pub const fn new(threshold: u8, initial_position: Option<u16>) -> Self {
        Self {
            state: DebouncedState::new(initial_position),
            threshold: if threshold == 0 { 1 } else { threshold },
        }
    }

    /// Number of identical scans required to confirm a change.
    pub const fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Current confirmed state.
    pub const fn state(&self) -> &DebouncedState<N> {
        &self.state
    }

    /// Folds one snapshot into the persistent state.
    pub fn update(&mut self, snapshot: &SensorSnapshot<N>) -> &DebouncedState<N> {
        let threshold = self.threshold;
        let state = &mut self.state;

        for ((observed, pending), confirmed) in snapshot
            .button_states
            .iter()
            .zip(state.pending_buttons.iter_mut())
            .zip(state.confirmed_buttons.iter_mut())
        {
            if let Some(value) = pending.observe(*observed, threshold) {
                *confirmed = value;
            }
        }

        match snapshot.touched_position() {
            Some(position) => {
                if let Some(value) = state.pending_slider.observe(position, threshold) {
                    state.confirmed_slider_position = Some(value);
                }
            }
            None => state.pending_slider.clear(),
        }

        &self.state
    }
}
