use std::io;

use tracing_subscriber::EnvFilter;

/// Initializes tracing for a server process. Logs must go to stderr:
/// stdout carries the MCP protocol stream.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
