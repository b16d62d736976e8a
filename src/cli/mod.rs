//! CLI module for the supermodel server core.
//!
//! This module provides the command-line interface for inspecting a
//! registry loaded from a deployment manifest and resolving configs
//! against it.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
