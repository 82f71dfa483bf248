use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use inkscape_mcp_server::ServerVariant;

use crate::error::{CliError, ExitStatus};

/// The external executable the CLI and combined servers shell out to.
pub const REQUIRED_TOOL: &str = "inkscape";

/// Name of the workspace environment variable.
pub const WORKSPACE_ENV: &str = "INKS_WORKSPACE";

/// Launcher-level workspace resolution: `INKS_WORKSPACE` when set, else
/// `<home>/inkscape-workspace`.
pub fn resolve_workspace() -> PathBuf {
    if let Some(path) = env::var_os(WORKSPACE_ENV).filter(|value| !value.is_empty()) {
        return PathBuf::from(path);
    }
    match dirs::home_dir() {
        Some(home) => home.join("inkscape-workspace"),
        None => PathBuf::from("./inkscape-workspace"),
    }
}

/// One precondition check, already evaluated.
#[derive(Clone, Debug, Serialize)]
pub struct CheckOutcome {
    pub name: String,
    pub ok: bool,
    /// A failed required check aborts the launch; a failed optional check
    /// is only reported.
    pub required: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Result of running every precondition check for a launch.
#[derive(Clone, Debug, Serialize)]
pub struct PreflightReport {
    pub workspace: PathBuf,
    pub checks: Vec<CheckOutcome>,
}

impl PreflightReport {
    pub fn healthy(&self) -> bool {
        self.checks.iter().all(|check| check.ok || !check.required)
    }

    pub fn first_failure(&self) -> Option<&CheckOutcome> {
        self.checks.iter().find(|check| !check.ok && check.required)
    }

    /// Converts a failed report into the launcher's fatal error: one
    /// diagnostic line plus one hint line on stderr, exit code 1.
    pub fn ensure(self) -> Result<Self, CliError> {
        if let Some(failure) = self.first_failure() {
            let mut message = format!("Error: {}", failure.message);
            if let Some(hint) = &failure.hint {
                message.push('\n');
                message.push_str(&format!("Hint: {hint}"));
            }
            return Err(CliError::new(message, ExitStatus::Preflight));
        }
        Ok(self)
    }
}

/// Runs the launch preconditions for a server variant.
///
/// Two checks, both modeled as explicit outcomes rather than uncaught spawn
/// failures: the required external tool must be on PATH (a warning only for
/// the DOM variant, which never spawns it), and the workspace location must
/// be usable, creating it if missing.
pub fn check(variant: ServerVariant, workspace: PathBuf) -> PreflightReport {
    let mut checks = Vec::new();

    match which::which(REQUIRED_TOOL) {
        Ok(path) => checks.push(CheckOutcome {
            name: REQUIRED_TOOL.to_string(),
            ok: true,
            required: variant.requires_inkscape(),
            message: format!("{REQUIRED_TOOL} found at {}", path.display()),
            hint: None,
        }),
        Err(_) => checks.push(CheckOutcome {
            name: REQUIRED_TOOL.to_string(),
            ok: false,
            required: variant.requires_inkscape(),
            message: format!("{REQUIRED_TOOL} is not installed or not on PATH"),
            hint: Some(
                "Install Inkscape from https://inkscape.org/ or with your system \
                 package manager, then re-run."
                    .to_string(),
            ),
        }),
    }

    match prepare_workspace_dir(&workspace) {
        Ok(()) => checks.push(CheckOutcome {
            name: "workspace".to_string(),
            ok: true,
            required: true,
            message: format!("workspace ready at {}", workspace.display()),
            hint: None,
        }),
        Err(reason) => checks.push(CheckOutcome {
            name: "workspace".to_string(),
            ok: false,
            required: true,
            message: format!("cannot use workspace {}: {reason}", workspace.display()),
            hint: Some(format!(
                "Set {WORKSPACE_ENV} to a writable directory."
            )),
        }),
    }

    PreflightReport { workspace, checks }
}

fn prepare_workspace_dir(path: &PathBuf) -> Result<(), String> {
    fs::create_dir_all(path).map_err(|err| err.to_string())?;
    if path.is_dir() {
        Ok(())
    } else {
        Err("not a directory".to_string())
    }
}
