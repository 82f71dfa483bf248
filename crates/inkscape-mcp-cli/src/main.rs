use std::process::ExitCode;

fn main() -> ExitCode {
    inkscape_mcp_cli::cli::run()
}
