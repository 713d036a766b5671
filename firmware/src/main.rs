#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

mod config;
mod scan;
mod sensing;
mod telemetry;
mod tuner;

#[cfg(target_os = "none")]
mod hw;
#[cfg(target_os = "none")]
mod panic;
#[cfg(target_os = "none")]
mod runtime;

#[cfg(not(target_os = "none"))]
fn main() {}
