//! Command implementations for diffcov CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod completions;
pub mod diff;
