//! Acquisition sequencing for the TSC.
//!
//! The TSC samples one I/O per group at a time, so a full scan of every
//! channel takes several acquisition phases. The interrupt handler only
//! acknowledges the peripheral and raises [`ACQUISITION_FLAG`]. The gate task
//! then stores the finished phase's counts in a [`ScanProgress`], programs the
//! next phase, and raises [`SCAN_FLAG`] once the last phase is in.

use gate_core::cycle::ScanFlag;

use crate::config::{CHANNEL_COUNT, CHANNELS, SAMPLING_CAPS, TscIo};

/// Raised by the TSC interrupt at the end of every acquisition phase.
pub static ACQUISITION_FLAG: ScanFlag = ScanFlag::new();

/// Raised once every channel has fresh counts.
pub static SCAN_FLAG: ScanFlag = ScanFlag::new();

/// Number of acquisition phases needed to sample every channel.
#[must_use]
pub fn phase_count() -> u8 {
    CHANNELS
        .iter()
        .map(|channel| channel_phase(*channel) + 1)
        .max()
        .unwrap_or(0)
}

/// Channels sampled during `phase`, with their snapshot index.
pub fn phase_channels(phase: u8) -> impl Iterator<Item = (usize, TscIo)> {
    CHANNELS
        .iter()
        .copied()
        .enumerate()
        .filter(move |(_, channel)| channel_phase(*channel) == phase)
}

fn channel_phase(channel: TscIo) -> u8 {
    let cap_io = SAMPLING_CAPS
        .iter()
        .find(|cap| cap.group == channel.group)
        .map_or(1, |cap| cap.io);
    // I/Os after the sampling capacitor are numbered from phase 0.
    channel.io - 1 - u8::from(channel.io > cap_io)
}

/// Channel control bits (`IOCCR`) for `phase`.
#[must_use]
pub fn channel_bits(phase: u8) -> u32 {
    phase_channels(phase).fold(0, |bits, (_, channel)| bits | channel.mask())
}

/// Sampling capacitor bits (`IOSCR`).
#[must_use]
pub fn sampling_bits() -> u32 {
    SAMPLING_CAPS.iter().fold(0, |bits, cap| bits | cap.mask())
}

/// Group enable bits (`IOGCSR`) for the groups sampled during `phase`.
#[must_use]
pub fn group_bits(phase: u8) -> u32 {
    phase_channels(phase).fold(0, |bits, (_, channel)| {
        bits | 1 << (u32::from(channel.group) - 1)
    })
}

/// Phase and counts of the scan in flight.
#[derive(Debug, Default)]
pub struct ScanProgress {
    phase: Option<u8>,
    counts: [u16; CHANNEL_COUNT],
}

impl ScanProgress {
    pub const fn new() -> Self {
        Self {
            phase: None,
            counts: [0; CHANNEL_COUNT],
        }
    }

    /// Marks the first phase as running.
    pub fn begin(&mut self) {
        self.phase = Some(0);
    }

    /// Phase currently being acquired, if any.
    pub fn current(&self) -> Option<u8> {
        self.phase
    }

    /// Stores the counts of the running phase, reading each channel's group
    /// through `group_count`, and moves on.
    ///
    /// Returns the next phase to start, or `None` once the scan is complete.
    /// Does nothing while idle.
    pub fn complete_phase(&mut self, mut group_count: impl FnMut(u8) -> u16) -> Option<u8> {
        let phase = self.phase?;
        for (index, channel) in phase_channels(phase) {
            self.counts[index] = group_count(channel.group);
        }

        let next = phase + 1;
        self.phase = (next < phase_count()).then_some(next);
        self.phase
    }

    /// Counts from the last completed phases.
    pub fn counts(&self) -> &[u16; CHANNEL_COUNT] {
        &self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slider_group_needs_three_phases() {
        assert_eq!(phase_count(), 3);
        let first: Vec<usize> = phase_channels(0).map(|(index, _)| index).collect();
        assert_eq!(first, vec![0, 1, 2]);
        let last: Vec<usize> = phase_channels(2).map(|(index, _)| index).collect();
        assert_eq!(last, vec![4]);
    }

    #[test]
    fn register_masks_match_wiring() {
        // G1_IO2, G2_IO2, G4_IO2
        assert_eq!(channel_bits(0), 1 << 1 | 1 << 5 | 1 << 13);
        assert_eq!(group_bits(0), 0b1011);
        assert_eq!(group_bits(1), 0b1000);
        assert_eq!(sampling_bits(), 1 | 1 << 4 | 1 << 12);
    }

    #[test]
    fn progress_walks_every_phase_once() {
        let mut progress = ScanProgress::new();
        assert_eq!(progress.current(), None);
        assert_eq!(progress.complete_phase(|_| 1), None);
        assert_eq!(progress.counts(), &[0; CHANNEL_COUNT]);

        progress.begin();
        assert_eq!(progress.current(), Some(0));
        assert_eq!(progress.complete_phase(|group| u16::from(group) * 100), Some(1));
        assert_eq!(progress.complete_phase(|_| 700), Some(2));
        assert_eq!(progress.complete_phase(|_| 650), None);
        assert_eq!(progress.current(), None);

        assert_eq!(progress.counts(), &[100, 200, 400, 700, 650]);
    }

    #[test]
    fn restarted_scan_overwrites_counts() {
        let mut progress = ScanProgress::new();
        progress.begin();
        while progress.complete_phase(|_| 900).is_some() {}

        progress.begin();
        assert_eq!(progress.complete_phase(|_| 300), Some(1));
        assert_eq!(progress.counts(), &[300, 300, 300, 900, 900]);
    }
}
