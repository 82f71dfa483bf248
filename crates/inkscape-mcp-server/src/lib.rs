//! MCP adapter for the Inkscape toolchain.
//!
//! Three stdio server variants share one implementation: the CLI server
//! drives a headless `inkscape` subprocess, the DOM server edits SVG
//! documents directly, and the combined server exposes both tool sets.

mod cli_tools;
mod dom_tools;
mod error;
mod runner;
mod server;
mod telemetry;

pub use crate::cli_tools::{ActionListResult, ActionRunArgs, ActionRunResult};
pub use crate::dom_tools::{
    DomCleanArgs, DomCleanResult, DomSetArgs, DomSetResult, DomValidateArgs, DomValidateResult,
};
pub use crate::error::{McpError, invalid_params, to_mcp_error};
pub use crate::runner::{ActionDescriptor, InkscapeRunner, RunOutcome, RunRequest};
pub use crate::server::{InkscapeMcpServer, ServerVariant, run_stdio_server};
pub use crate::telemetry::init_tracing;
