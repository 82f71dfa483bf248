//! Launcher CLI for the Inkscape MCP servers.
//!
//! Implements the startup contract: resolve the workspace from
//! `INKS_WORKSPACE` (defaulting to `<home>/inkscape-workspace`), verify the
//! preconditions, and run the selected server variant in this process.

pub mod cli;
pub mod commands;
pub mod error;
pub mod formatter;
pub mod preflight;
