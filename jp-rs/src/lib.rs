//! jp-rs library
//!
//! Command definitions and output helpers behind the `jp-rs` binary.

pub mod cli;
pub mod commands;
pub mod utils;
