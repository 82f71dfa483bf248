use std::process::ExitCode;

use serde_json::json;

use crate::commands::CommandResult;
use crate::error::CliError;

pub enum OutputFormat {
    Text,
    Json,
}

/// Renders a `CommandResult` as human-readable text or JSON and converts
/// the outcome into a deterministic exit code.
pub fn emit_result(result: CommandResult, format: OutputFormat) -> Result<ExitCode, CliError> {
    match format {
        OutputFormat::Text => print_text(&result),
        OutputFormat::Json => print_json(&result),
    }
    Ok(ExitCode::from(result.exit_status().code()))
}

fn print_text(result: &CommandResult) {
    match result {
        CommandResult::Doctor {
            workspace,
            checks,
            healthy,
        } => {
            if *healthy {
                println!("Preflight: OK (workspace {workspace})");
            } else {
                println!("Preflight: FAIL (workspace {workspace})");
            }
            for check in checks {
                let mark = if check.ok {
                    "[OK]"
                } else if check.required {
                    "[FAIL]"
                } else {
                    "[WARN]"
                };
                println!("  {mark} {}: {}", check.name, check.message);
                if !check.ok {
                    if let Some(hint) = &check.hint {
                        println!("         {hint}");
                    }
                }
            }
        }
        CommandResult::Served { variant } => {
            // The interesting output already went to stderr via tracing;
            // a closed transport is a normal shutdown.
            eprintln!("{variant} server stopped");
        }
    }
}

fn print_json(result: &CommandResult) {
    let payload = json!(result);
    println!("{payload}");
}
