//! Line-oriented console driving the cycle controller from text commands.
//!
//! [`grammar`] turns a line into a [`grammar::Command`]; [`commands`] holds
//! the catalog and runs commands against a cycle controller.

pub mod commands;
pub mod grammar;

pub use commands::{
    CommandError, CommandOutcome, ScanBatch, ScanInjector, StatusSummary, execute,
};
pub use grammar::{Command, ParseError, parse};
