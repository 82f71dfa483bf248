use clap::{Arg, ArgMatches, Command};

use inkscape_mcp_server::ServerVariant;

use crate::commands::CommandResult;
use crate::error::{CliError, ExitStatus};
use crate::preflight;

pub fn command() -> Command {
    Command::new("doctor")
        .about("Run the launch preconditions and report each check")
        .arg(
            Arg::new("variant")
                .long("variant")
                .value_name("VARIANT")
                .value_parser(["cli", "dom", "combined"])
                .default_value("combined")
                .help("Variant to check preconditions for; dom does not require inkscape."),
        )
}

pub fn run(matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let variant: ServerVariant = matches
        .get_one::<String>("variant")
        .expect("variant has a default")
        .parse()
        .map_err(|err: inkscape_mcp::InkscapeError| {
            CliError::new(err.to_string(), ExitStatus::Usage)
        })?;

    let workspace = preflight::resolve_workspace();
    let report = preflight::check(variant, workspace.clone());
    let healthy = report.healthy();

    Ok(CommandResult::Doctor {
        workspace: workspace.display().to_string(),
        checks: report.checks,
        healthy,
    })
}
