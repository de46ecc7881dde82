//! CLI module for the image tool.
//!
//! This module provides the command-line interface for uploading and
//! managing custom Hetzner Cloud images.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, StateCommands};
pub use output::OutputFormatter;
