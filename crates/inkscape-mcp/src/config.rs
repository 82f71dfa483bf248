use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::InkscapeError;

/// Environment variable prefix shared by all Inkscape MCP binaries.
pub const ENV_PREFIX: &str = "INKS_";

const DEFAULT_WORKSPACE: &str = "./inkspace";
const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Runtime configuration for the Inkscape MCP servers.
///
/// Values come from `INKS_*` environment variables with conservative
/// defaults. Constructing a config through [`InkscapeConfig::new`] or one of
/// the `from_env` variants guarantees the workspace directory exists and is
/// canonicalized, so confinement checks downstream compare resolved paths.
#[derive(Clone, Debug)]
pub struct InkscapeConfig {
    /// Directory all document and export paths are confined to.
    pub workspace: PathBuf,
    /// Upper bound, in bytes, for input files and inline documents.
    pub max_file_size: u64,
    /// Timeout applied to Inkscape invocations when the caller does not
    /// provide one.
    pub timeout_default: Duration,
    /// Maximum number of concurrently running operations.
    pub max_concurrent: usize,
}

impl Default for InkscapeConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from(DEFAULT_WORKSPACE),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            timeout_default: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl InkscapeConfig {
    /// Builds a config with default limits and the given workspace, creating
    /// the directory if it is missing.
    pub fn new(workspace: impl Into<PathBuf>) -> Result<Self, InkscapeError> {
        let mut config = Self {
            workspace: workspace.into(),
            ..Self::default()
        };
        config.workspace = prepare_workspace(config.workspace)?;
        Ok(config)
    }

    /// Reads configuration from `INKS_*` environment variables.
    pub fn from_env() -> Result<Self, InkscapeError> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Reads configuration from environment variables with an explicit
    /// prefix. Used by tests to avoid clashing on the shared environment.
    pub fn from_env_with_prefix(prefix: &str) -> Result<Self, InkscapeError> {
        let workspace = env::var(format!("{prefix}WORKSPACE"))
            .ok()
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKSPACE));
        Self::from_env_parts(prefix, workspace)
    }

    /// Reads limits from the environment but pins the workspace explicitly.
    /// The launcher uses this after resolving its own workspace default.
    pub fn from_env_with_workspace(workspace: impl Into<PathBuf>) -> Result<Self, InkscapeError> {
        Self::from_env_parts(ENV_PREFIX, workspace.into())
    }

    fn from_env_parts(prefix: &str, workspace: PathBuf) -> Result<Self, InkscapeError> {
        let max_file_size = parse_env(prefix, "MAX_FILE", DEFAULT_MAX_FILE_SIZE)?;
        let timeout_secs = parse_env(prefix, "TIMEOUT", DEFAULT_TIMEOUT_SECS)?;
        let max_concurrent = parse_env(prefix, "MAX_CONC", DEFAULT_MAX_CONCURRENT)?;

        Ok(Self {
            workspace: prepare_workspace(workspace)?,
            max_file_size,
            timeout_default: Duration::from_secs(timeout_secs),
            max_concurrent,
        })
    }

    /// Creates the workspace directory if needed and resolves it. Idempotent.
    pub fn ensure_workspace(&mut self) -> Result<(), InkscapeError> {
        self.workspace = prepare_workspace(std::mem::take(&mut self.workspace))?;
        Ok(())
    }

    /// Effective timeout for one Inkscape run: the caller's override in
    /// seconds, or the configured default.
    pub fn timeout_for(&self, override_secs: Option<u64>) -> Duration {
        override_secs
            .map(Duration::from_secs)
            .unwrap_or(self.timeout_default)
    }
}

fn parse_env<T: FromStr>(prefix: &str, key: &str, default: T) -> Result<T, InkscapeError>
where
    T::Err: std::fmt::Display,
{
    let name = format!("{prefix}{key}");
    match env::var(&name) {
        Ok(raw) => raw
            .parse()
            .map_err(|err| InkscapeError::Config(format!("invalid {name} value '{raw}': {err}"))),
        Err(_) => Ok(default),
    }
}

fn prepare_workspace(path: PathBuf) -> Result<PathBuf, InkscapeError> {
    fs::create_dir_all(&path).map_err(|err| {
        InkscapeError::Config(format!("cannot use workspace {}: {err}", path.display()))
    })?;
    fs::canonicalize(&path).map_err(|err| {
        InkscapeError::Config(format!("cannot use workspace {}: {err}", path.display()))
    })
}
