//! Pinnacle CLI library.
//!
//! Command implementations for the `pinnacle` binary. Each command returns
//! an exit code; errors that stop a command propagate as `anyhow::Error`.

pub mod commands;
