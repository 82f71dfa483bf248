use serde::Serialize;

use crate::error::ExitStatus;
use crate::preflight::CheckOutcome;

pub mod doctor;
pub mod serve;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandResult {
    Doctor {
        workspace: String,
        checks: Vec<CheckOutcome>,
        healthy: bool,
    },
    /// The server ran and its transport closed normally.
    Served {
        variant: String,
    },
}

impl CommandResult {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            CommandResult::Doctor { healthy, .. } => {
                if *healthy {
                    ExitStatus::Ok
                } else {
                    ExitStatus::Preflight
                }
            }
            CommandResult::Served { .. } => ExitStatus::Ok,
        }
    }
}
