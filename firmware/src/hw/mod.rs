#![cfg(target_os = "none")]

pub mod led;
pub mod touch;
pub mod uart;

pub use led::PwmLed;
pub use touch::{TscInterruptHandler, TscPins, TscTouchDriver};
pub use uart::DiagnosticPort;
