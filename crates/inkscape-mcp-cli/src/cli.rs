use std::ffi::OsString;
use std::io;
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::commands;
use crate::error::CliError;
use crate::formatter::{OutputFormat, emit_result};

const NAME: &str = "inkscape-mcp";

pub fn run() -> ExitCode {
    init_tracing();
    match run_cli(std::env::args()) {
        Ok(code) => code,
        Err(err) => {
            err.print();
            err.exit_code()
        }
    }
}

/// Parses CLI arguments and dispatches to the selected command. Returns a
/// deterministic `ExitCode`: preflight failures are always 1, usage errors
/// follow sysexits.
pub fn run_cli<I, S>(args: I) -> Result<ExitCode, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    let command = build_cli();
    let matches = command.try_get_matches_from(args)?;

    let output = if matches.get_flag("json") {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let result = dispatch(&matches)?;
    emit_result(result, output)
}

fn init_tracing() {
    // Status lines go to stderr: with `serve`, stdout belongs to the MCP
    // transport.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn build_cli() -> Command {
    Command::new(NAME)
        .about("Launcher for the Inkscape MCP servers")
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Emit JSON instead of human-readable text."),
        )
        .subcommand_required(true)
        .subcommand(commands::serve::command())
        .subcommand(commands::doctor::command())
}

fn dispatch(matches: &ArgMatches) -> Result<commands::CommandResult, CliError> {
    match matches.subcommand() {
        Some(("serve", sub)) => commands::serve::run(sub),
        Some(("doctor", sub)) => commands::doctor::run(sub),
        _ => Err(CliError::new(
            "missing command",
            crate::error::ExitStatus::Usage,
        )),
    }
}
