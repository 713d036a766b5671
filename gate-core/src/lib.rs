#![no_std]

// Touch gate selector logic shared by the firmware and the host emulator.
//
// Everything here is hardware agnostic: the touch driver, LED, and tuner
// buffer are reached through traits so the same cycle controller runs on the
// MCU and inside host tests.

pub mod config;
pub mod console;
pub mod cycle;
pub mod debounce;
pub mod decision;
pub mod error;
pub mod snapshot;
pub mod telemetry;
pub mod tuner;
pub mod zones;
