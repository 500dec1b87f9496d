//! Command-line interface for classical-library.
//!
//! This module provides commands for synchronizing the library from a
//! catalog, checking it for staleness, trying out the title parser, and
//! browsing what the store holds.

mod commands;

pub use commands::{Cli, Commands, run_command};
