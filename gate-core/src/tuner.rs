//! Tuner synchronisation frame.
//!
//! Once per cycle the controller serialises its view of the inputs into a
//! fixed 16-byte little-endian frame and hands it to a [`TunerSync`]
//! implementation. The host tool owns the transport; the core only writes.
//!
//! | offset | size | field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 2    | magic `b"TG"`                           |
//! | 2      | 1    | layout version                          |
//! | 3      | 1    | cycle state code                        |
//! | 4      | 4    | cycle counter                           |
//! | 8      | 1    | raw button bitmask                      |
//! | 9      | 1    | confirmed button bitmask                |
//! | 10     | 1    | slider touched                          |
//! | 11     | 1    | classification code                     |
//! | 12     | 2    | confirmed slider position (`0xFFFF` none) |
//! | 14     | 1    | output                                  |
//! | 15     | 1    | skipped cycles (wrapping)               |

use crate::cycle::CycleState;
use crate::zones::Classification;

/// Size of an encoded frame.
pub const TUNER_FRAME_LEN: usize = 16;
/// Leading bytes of every frame.
pub const TUNER_MAGIC: [u8; 2] = *b"TG";
/// Frame layout revision.
pub const TUNER_LAYOUT_VERSION: u8 = 1;
/// Position value used when no slider position has been confirmed.
pub const NO_POSITION: u16 = 0xFFFF;

/// Destination of the per-cycle tuner frame.
pub trait TunerSync {
    /// Number of bytes the shared buffer can hold.
    fn capacity(&self) -> usize;

    /// Copies `frame` into the shared buffer. Only called with frames that fit.
    fn publish(&mut self, frame: &[u8]);
}

impl<T: TunerSync + ?Sized> TunerSync for &mut T {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn publish(&mut self, frame: &[u8]) {
        (**self).publish(frame);
    }
}

/// Tuner endpoint for builds without a host tool attached.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopTuner;

impl NoopTuner {
    pub const fn new() -> Self {
        Self
    }
}

impl TunerSync for NoopTuner {
    fn capacity(&self) -> usize {
        usize::MAX
    }

    fn publish(&mut self, _: &[u8]) {}
}

/// In-memory tuner buffer holding the latest published frame.
#[derive(Clone, Debug)]
pub struct TunerBuffer<const N: usize> {
    bytes: [u8; N],
    len: usize,
    publishes: u32,
}

impl<const N: usize> TunerBuffer<N> {
    pub const fn new() -> Self {
        Self {
            bytes: [0; N],
            len: 0,
            publishes: 0,
        }
    }

    /// Bytes of the most recent frame.
    pub fn latest(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Number of frames published so far.
    pub const fn publish_count(&self) -> u32 {
        self.publishes
    }
}

impl<const N: usize> Default for TunerBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TunerSync for TunerBuffer<N> {
    fn capacity(&self) -> usize {
        N
    }

    fn publish(&mut self, frame: &[u8]) {
        let len = frame.len().min(N);
        self.bytes[..len].copy_from_slice(&frame[..len]);
        self.len = len;
        self.publishes = self.publishes.wrapping_add(1);
    }
}

/// Decoded contents of a tuner frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TunerFrame {
    pub state: CycleState,
    pub cycle: u32,
    pub raw_buttons: u8,
    pub confirmed_buttons: u8,
    pub slider_touched: bool,
    pub classification: Classification,
    pub confirmed_position: Option<u16>,
    pub output: bool,
    pub skipped: u8,
}

impl TunerFrame {
    /// Serialises the frame into its wire layout.
    pub fn encode(&self) -> [u8; TUNER_FRAME_LEN] {
        let mut bytes = [0u8; TUNER_FRAME_LEN];
        bytes[0..2].copy_from_slice(&TUNER_MAGIC);
        bytes[2] = TUNER_LAYOUT_VERSION;
        bytes[3] = self.state.to_raw();
        bytes[4..8].copy_from_slice(&self.cycle.to_le_bytes());
        bytes[8] = self.raw_buttons;
        bytes[9] = self.confirmed_buttons;
        bytes[10] = u8::from(self.slider_touched);
        bytes[11] = self.classification.to_raw();
        let position = self.confirmed_position.unwrap_or(NO_POSITION);
        bytes[12..14].copy_from_slice(&position.to_le_bytes());
        bytes[14] = u8::from(self.output);
        bytes[15] = self.skipped;
        bytes
    }

    /// Parses a frame, returning `None` for short buffers, a foreign magic or
    /// version, or unknown codes.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let bytes = bytes.get(..TUNER_FRAME_LEN)?;
        if bytes[0..2] != TUNER_MAGIC || bytes[2] != TUNER_LAYOUT_VERSION {
            return None;
        }

        let cycle = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let position = u16::from_le_bytes([bytes[12], bytes[13]]);
        Some(Self {
            state: CycleState::from_raw(bytes[3])?,
            cycle,
            raw_buttons: bytes[8],
            confirmed_buttons: bytes[9],
            slider_touched: bytes[10] != 0,
            classification: Classification::from_raw(bytes[11])?,
            confirmed_position: (position != NO_POSITION).then_some(position),
            output: bytes[14] != 0,
            skipped: bytes[15],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::Combinator;

    #[test]
    fn frame_layout_is_little_endian() {
        let frame = TunerFrame {
            state: CycleState::Processing,
            cycle: 0x0102_0304,
            raw_buttons: 0b10,
            confirmed_buttons: 0b01,
            slider_touched: true,
            classification: Classification::Gate(Combinator::And),
            confirmed_position: Some(150),
            output: true,
            skipped: 3,
        };

        let bytes = frame.encode();
        assert_eq!(&bytes[0..3], b"TG\x01");
        assert_eq!(&bytes[4..8], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[12..14], &150u16.to_le_bytes());
        assert_eq!(TunerFrame::decode(&bytes), Some(frame));
    }

    #[test]
    fn missing_position_uses_sentinel() {
        let frame = TunerFrame {
            state: CycleState::Idle,
            cycle: 0,
            raw_buttons: 0,
            confirmed_buttons: 0,
            slider_touched: false,
            classification: Classification::NoOp,
            confirmed_position: None,
            output: false,
            skipped: 0,
        };
        let bytes = frame.encode();
        assert_eq!(&bytes[12..14], &[0xFF, 0xFF]);
        assert_eq!(TunerFrame::decode(&bytes[..8]), None);
    }

    #[test]
    fn buffer_keeps_latest_frame() {
        let mut buffer = TunerBuffer::<4>::new();
        buffer.publish(&[1, 2, 3]);
        buffer.publish(&[9, 8]);
        assert_eq!(buffer.latest(), &[9, 8]);
        assert_eq!(buffer.publish_count(), 2);
        assert_eq!(buffer.capacity(), 4);
    }
}
