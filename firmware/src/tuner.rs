//! Tuner buffer exposed to the debugger.
//!
//! The host tool reads [`TUNER_SHARED`] over SWD while the firmware runs. A
//! sequence counter brackets every write: it is odd while a frame is being
//! copied and even once the frame is complete, so the reader retries until it
//! sees the same even value before and after copying the bytes. Every byte is
//! its own atomic, so a torn copy is discarded rather than undefined.

use core::sync::atomic::fence;

use gate_core::tuner::TunerSync;
use portable_atomic::{AtomicU8, AtomicU32, Ordering};

use crate::config::TUNER_BUFFER_LEN;

/// Fixed-size frame buffer guarded by a sequence counter.
#[repr(C)]
pub struct SharedTunerBuffer<const N: usize> {
    sequence: AtomicU32,
    len: AtomicU32,
    bytes: [AtomicU8; N],
}

impl<const N: usize> SharedTunerBuffer<N> {
    pub const fn new() -> Self {
        Self {
            sequence: AtomicU32::new(0),
            len: AtomicU32::new(0),
            bytes: [const { AtomicU8::new(0) }; N],
        }
    }

    /// Writes `frame`, truncated to the buffer size. The gate task is the only
    /// writer.
    pub fn write(&self, frame: &[u8]) {
        let len = frame.len().min(N);
        self.sequence.fetch_add(1, Ordering::AcqRel);
        fence(Ordering::Release);
        for (slot, byte) in self.bytes.iter().zip(frame) {
            slot.store(*byte, Ordering::Relaxed);
        }
        self.len
            .store(u32::try_from(len).unwrap_or(u32::MAX), Ordering::Relaxed);
        self.sequence.fetch_add(1, Ordering::Release);
    }

    /// Number of completed writes.
    #[cfg(test)]
    pub fn generation(&self) -> u32 {
        self.sequence.load(Ordering::Acquire) / 2
    }

    /// Copies a consistent frame into `out`, returning its length. Returns
    /// `None` when a write kept racing the copy.
    ///
    /// Mirrors what the host tool does over SWD.
    #[cfg(test)]
    pub fn read(&self, out: &mut [u8; N]) -> Option<usize> {
        for _ in 0..4 {
            let before = self.sequence.load(Ordering::Acquire);
            if before % 2 == 1 {
                continue;
            }
            for (byte, slot) in out.iter_mut().zip(&self.bytes) {
                *byte = slot.load(Ordering::Relaxed);
            }
            let len = usize::try_from(self.len.load(Ordering::Relaxed)).unwrap_or(N);
            fence(Ordering::Acquire);
            if self.sequence.load(Ordering::Relaxed) == before {
                return Some(len.min(N));
            }
        }
        None
    }
}

impl<const N: usize> Default for SharedTunerBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Buffer read by the tuner host tool. The symbol name is part of the host
/// interface.
#[unsafe(no_mangle)]
pub static TUNER_SHARED: SharedTunerBuffer<TUNER_BUFFER_LEN> = SharedTunerBuffer::new();

/// [`TunerSync`] endpoint backed by a static [`SharedTunerBuffer`].
#[derive(Copy, Clone)]
pub struct SharedTuner<const N: usize> {
    buffer: &'static SharedTunerBuffer<N>,
}

impl<const N: usize> SharedTuner<N> {
    pub const fn new(buffer: &'static SharedTunerBuffer<N>) -> Self {
        Self { buffer }
    }
}

impl<const N: usize> TunerSync for SharedTuner<N> {
    fn capacity(&self) -> usize {
        N
    }

    fn publish(&mut self, frame: &[u8]) {
        self.buffer.write(frame);
    }
}
