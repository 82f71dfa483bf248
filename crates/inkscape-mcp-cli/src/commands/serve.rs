use clap::{Arg, ArgMatches, Command};
use tokio::runtime::Runtime;

use inkscape_mcp::InkscapeConfig;
use inkscape_mcp_server::{ServerVariant, run_stdio_server};

use crate::commands::CommandResult;
use crate::error::{CliError, ExitStatus};
use crate::preflight;

pub fn command() -> Command {
    Command::new("serve")
        .about("Run an Inkscape MCP server on stdio")
        .arg(
            Arg::new("variant")
                .value_name("VARIANT")
                .value_parser(["cli", "dom", "combined"])
                .default_value("combined")
                .help("Which tool surface to expose: cli (Inkscape actions), dom (SVG editing), or combined."),
        )
}

/// Launch sequence: resolve the workspace, run the preflight checks (fatal
/// with exit code 1 on failure), then serve in this process so signals and
/// the exit code belong to the server itself.
pub fn run(matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let variant: ServerVariant = matches
        .get_one::<String>("variant")
        .expect("variant has a default")
        .parse()
        .map_err(|err: inkscape_mcp::InkscapeError| {
            CliError::new(err.to_string(), ExitStatus::Usage)
        })?;

    let workspace = preflight::resolve_workspace();
    let report = preflight::check(variant, workspace.clone()).ensure()?;
    for check in &report.checks {
        if check.ok {
            tracing::info!("{}", check.message);
        } else {
            tracing::warn!("{}", check.message);
        }
    }
    tracing::info!(
        variant = variant.as_str(),
        workspace = %workspace.display(),
        "starting Inkscape MCP server"
    );

    let config = InkscapeConfig::from_env_with_workspace(workspace)?;
    let runtime = Runtime::new()?;
    runtime
        .block_on(run_stdio_server(config, variant))
        .map_err(|err| CliError::new(format!("server failed: {err}"), ExitStatus::Software))?;

    Ok(CommandResult::Served {
        variant: variant.as_str().to_string(),
    })
}
