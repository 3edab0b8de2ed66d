//! Library half of the `sqlharbor` binary.
//!
//! Argument definitions and command execution live here so they can be
//! tested without spawning the binary.

pub mod cli;
pub mod commands;

pub use cli::Cli;
pub use commands::run;
