//! Board wiring and sensing constants for the Nucleo-L476RG touch board.

use gate_core::snapshot::BUTTON_COUNT;

/// Number of copper segments making up the linear slider.
pub const SLIDER_SEGMENTS: usize = 3;

/// Total number of TSC sensing channels (buttons first, then slider segments).
pub const CHANNEL_COUNT: usize = BUTTON_COUNT + SLIDER_SEGMENTS;

/// A TSC analog I/O, addressed by group and I/O index (both 1-based, as in
/// the reference manual).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TscIo {
    pub group: u8,
    pub io: u8,
}

impl TscIo {
    pub const fn new(group: u8, io: u8) -> Self {
        Self { group, io }
    }

    /// Bit position of this I/O in the `IOxxCR` registers.
    #[must_use]
    pub fn bit(self) -> u32 {
        (u32::from(self.group) - 1) * 4 + (u32::from(self.io) - 1)
    }

    /// Bit mask of this I/O in the `IOxxCR` registers.
    #[must_use]
    pub fn mask(self) -> u32 {
        1 << self.bit()
    }
}

/// Sensing channels indexed like the snapshot: `B0`, `B1`, then slider
/// segments from the low end of the slider.
pub static CHANNELS: [TscIo; CHANNEL_COUNT] = [
    // B0: PB13
    TscIo::new(1, 2),
    // B1: PB5
    TscIo::new(2, 2),
    // slider: PC7, PC8, PC9
    TscIo::new(4, 2),
    TscIo::new(4, 3),
    TscIo::new(4, 4),
];

/// Sampling capacitor I/Os, one per used group (PB12, PB4, PC6).
pub static SAMPLING_CAPS: [TscIo; 3] = [TscIo::new(1, 1), TscIo::new(2, 1), TscIo::new(4, 1)];

/// Number of scans averaged into the reference counts after reset.
pub const CALIBRATION_SCANS: u8 = 8;

/// Count drop that marks a button as touched.
pub const BUTTON_TOUCH_THRESHOLD: u16 = 120;
/// Count drop that marks a slider segment as touched.
pub const SLIDER_TOUCH_THRESHOLD: u16 = 80;
/// Margin subtracted from a threshold while the widget is already touched.
pub const TOUCH_HYSTERESIS: u16 = 20;

/// Diagnostic UART baud rate (ST-LINK virtual COM port).
pub const DIAGNOSTIC_BAUD: u32 = 115_200;

/// PWM frequency of the LED output.
pub const LED_PWM_HZ: u32 = 1_000;

/// Bytes reserved for the tuner frame shared with the debugger.
pub const TUNER_BUFFER_LEN: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_bits_follow_register_layout() {
        assert_eq!(TscIo::new(1, 1).bit(), 0);
        assert_eq!(TscIo::new(2, 2).bit(), 5);
        assert_eq!(TscIo::new(4, 4).mask(), 1 << 15);
    }

    #[test]
    fn channels_do_not_reuse_sampling_caps() {
        for channel in CHANNELS {
            assert!(!SAMPLING_CAPS.contains(&channel));
            assert!(
                SAMPLING_CAPS.iter().any(|cap| cap.group == channel.group),
                "group {} has no sampling capacitor",
                channel.group
            );
        }
    }
}
