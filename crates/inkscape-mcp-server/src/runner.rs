use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::sync::{Semaphore, SemaphorePermit};

use inkscape_mcp::{
    ActionPlan, DocSource, ExportSpec, InkscapeConfig, InkscapeError, Workspace, inkscape_command,
    random_hex, validate_actions,
};

/// `--action-list` is metadata-only and must never hold a slot for long.
const ACTION_LIST_TIMEOUT: Duration = Duration::from_secs(5);

/// One entry of Inkscape's action catalog.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct ActionDescriptor {
    pub id: String,
    pub doc: String,
}

/// Everything `action_run` needs for one invocation.
#[derive(Clone, Debug)]
pub struct RunRequest {
    pub doc: DocSource,
    pub actions: Vec<String>,
    pub export: Option<ExportSpec>,
    pub timeout_s: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct RunOutcome {
    /// Final export path, when an export was requested.
    pub out: Option<String>,
}

/// Executes headless Inkscape processes on behalf of the MCP tools.
///
/// Concurrency is bounded by the configured semaphore; runs against the same
/// real input file are additionally serialized through a per-path lock so
/// Inkscape never sees concurrent writers. Inline documents are spilled to
/// uniquely named files and need no lock.
pub struct InkscapeRunner {
    config: Arc<InkscapeConfig>,
    semaphore: Arc<Semaphore>,
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl InkscapeRunner {
    pub fn new(config: Arc<InkscapeConfig>, semaphore: Arc<Semaphore>) -> Self {
        Self {
            config,
            semaphore,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Lists the actions Inkscape advertises, parsed from `--action-list`.
    pub async fn action_list(&self) -> Result<Vec<ActionDescriptor>, InkscapeError> {
        let _permit = self.acquire().await?;

        let argv = vec!["inkscape".to_string(), "--action-list".to_string()];
        let output = match self.run_process(&argv, ACTION_LIST_TIMEOUT).await {
            Ok(output) => output,
            Err(InkscapeError::Tool(msg)) if msg.contains("timed out") => {
                return Err(InkscapeError::Tool("action-list timeout".to_string()));
            }
            Err(other) => return Err(other),
        };
        if !output.status.success() {
            return Err(InkscapeError::Tool("action-list failed".to_string()));
        }

        Ok(parse_action_list(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Runs allowlisted actions against a document, optionally exporting.
    pub async fn run_actions(&self, request: RunRequest) -> Result<RunOutcome, InkscapeError> {
        validate_actions(&request.actions)?;
        let workspace = Workspace::new(&self.config)?;
        let timeout = self.config.timeout_for(request.timeout_s);

        let _permit = self.acquire().await?;

        let (input, inline_spill) = match &request.doc {
            DocSource::File { path } => {
                let confined = workspace.confine(path)?;
                workspace.check_size(&confined)?;
                (confined, None)
            }
            DocSource::Inline { svg } => {
                let spill = workspace.write_inline(svg)?;
                (spill.clone(), Some(spill))
            }
        };

        // The export lands in a temp sibling first; only a fully written
        // file is renamed over the real target.
        let export = match &request.export {
            Some(spec) => {
                let final_path = workspace.confine(&spec.out)?;
                let tmp = temp_export_path(&final_path);
                Some((spec.clone(), tmp, final_path))
            }
            None => None,
        };

        let plan = ActionPlan::build(
            &request.actions,
            export.as_ref().map(|(spec, tmp, _)| (spec, tmp.as_path())),
        );
        let argv = inkscape_command(&input, &plan);

        let lock = request.doc.is_file().then(|| self.lock_for(&input));
        let _guard = match &lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let result = self
            .finish_run(
                argv,
                timeout,
                export.as_ref().map(|(_, tmp, fin)| (tmp.as_path(), fin.as_path())),
            )
            .await;

        if let Some(spill) = inline_spill {
            let _ = std::fs::remove_file(spill);
        }
        if let Some((_, tmp, _)) = &export {
            // Gone already on success; remove leftovers on failure.
            let _ = std::fs::remove_file(tmp);
        }

        result
    }

    async fn finish_run(
        &self,
        argv: Vec<String>,
        timeout: Duration,
        export: Option<(&Path, &Path)>,
    ) -> Result<RunOutcome, InkscapeError> {
        let output = self.run_process(&argv, timeout).await?;
        if !output.status.success() {
            tracing::debug!(
                stderr = %String::from_utf8_lossy(&output.stderr),
                "inkscape exited nonzero"
            );
            return Err(InkscapeError::Tool("inkscape failed".to_string()));
        }

        let out = match export {
            Some((tmp, final_path)) => {
                if !tmp.exists() {
                    return Err(InkscapeError::Tool("export missing".to_string()));
                }
                if let Some(parent) = final_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::rename(tmp, final_path)?;
                Some(final_path.display().to_string())
            }
            None => None,
        };

        Ok(RunOutcome { out })
    }

    async fn run_process(&self, argv: &[String], timeout: Duration) -> Result<Output, InkscapeError> {
        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            // Headless always: a DISPLAY would make Inkscape try the GUI.
            .env("DISPLAY", "")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|err| {
            InkscapeError::Tool(format!("failed to launch {}: {err}", argv[0]))
        })?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err)) => Err(InkscapeError::Io(err)),
            // Dropping the output future drops the child handle, which kills
            // the process (kill_on_drop).
            Err(_) => Err(InkscapeError::Tool("operation timed out".to_string())),
        }
    }

    async fn acquire(&self) -> Result<SemaphorePermit<'_>, InkscapeError> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| InkscapeError::Tool("server is shutting down".to_string()))
    }

    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

fn parse_action_list(stdout: &str) -> Vec<ActionDescriptor> {
    stdout
        .lines()
        .filter_map(|line| {
            let (id, doc) = line.split_once(" : ")?;
            Some(ActionDescriptor {
                id: id.trim().to_string(),
                doc: doc.trim().to_string(),
            })
        })
        .collect()
}

/// Temp sibling for an export target, keeping the extension so Inkscape
/// picks the right encoder.
fn temp_export_path(final_path: &Path) -> PathBuf {
    let stem = final_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("export");
    let suffix = final_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    final_path.with_file_name(format!("{stem}.tmp-{}{suffix}", random_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn runner_with_workspace() -> (tempfile::TempDir, InkscapeRunner) {
        let temp = tempdir().unwrap();
        let config = Arc::new(InkscapeConfig::new(temp.path().join("ws")).unwrap());
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
        (temp, InkscapeRunner::new(config, semaphore))
    }

    #[test]
    fn parses_action_list_output() {
        let stdout = "select-all : Select all objects\n\
                      garbage line without separator\n\
                      path-union  :  Union of selected paths\n";
        let actions = parse_action_list(stdout);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].id, "select-all");
        assert_eq!(actions[0].doc, "Select all objects");
        assert_eq!(actions[1].id, "path-union");
    }

    #[test]
    fn temp_export_keeps_the_extension() {
        let tmp = temp_export_path(Path::new("/ws/out.png"));
        let name = tmp.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("out.tmp-"));
        assert!(name.ends_with(".png"));
        assert_eq!(tmp.parent(), Some(Path::new("/ws")));
    }

    #[tokio::test]
    async fn unsafe_actions_fail_before_spawning() {
        let (_temp, runner) = runner_with_workspace();
        let err = runner
            .run_actions(RunRequest {
                doc: DocSource::Inline {
                    svg: "<svg/>".to_string(),
                },
                actions: vec!["shell-command".to_string()],
                export: None,
                timeout_s: None,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unsafe action"));
    }

    #[tokio::test]
    async fn traversal_paths_fail_before_spawning() {
        let (_temp, runner) = runner_with_workspace();
        let err = runner
            .run_actions(RunRequest {
                doc: DocSource::File {
                    path: "../../../etc/passwd".to_string(),
                },
                actions: vec!["select-all".to_string()],
                export: None,
                timeout_s: None,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("escapes workspace"));
    }

    #[tokio::test]
    async fn missing_input_file_is_a_validation_error() {
        let (_temp, runner) = runner_with_workspace();
        let err = runner
            .run_actions(RunRequest {
                doc: DocSource::File {
                    path: "missing.svg".to_string(),
                },
                actions: vec![],
                export: None,
                timeout_s: None,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn inline_spills_are_cleaned_up_even_when_inkscape_is_absent() {
        let (_temp, runner) = runner_with_workspace();
        let workspace_root = runner.config.workspace.clone();

        // Whether Inkscape is installed or not, the inline spill file must
        // be gone afterwards.
        let _ = runner
            .run_actions(RunRequest {
                doc: DocSource::Inline {
                    svg: "<svg xmlns=\"http://www.w3.org/2000/svg\"/>".to_string(),
                },
                actions: vec!["select-all".to_string()],
                export: None,
                timeout_s: Some(10),
            })
            .await;

        let spills: Vec<_> = std::fs::read_dir(&workspace_root)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("inline-"))
            .collect();
        assert!(spills.is_empty());
    }

    #[tokio::test]
    async fn run_errors_name_the_missing_tool() {
        let (_temp, runner) = runner_with_workspace();
        let result = runner
            .run_actions(RunRequest {
                doc: DocSource::Inline {
                    svg: "<svg xmlns=\"http://www.w3.org/2000/svg\"/>".to_string(),
                },
                actions: vec!["select-all".to_string()],
                export: None,
                timeout_s: Some(10),
            })
            .await;

        match result {
            // Inkscape happens to be installed here; a plain run has no export.
            Ok(outcome) => assert!(outcome.out.is_none()),
            Err(err) => {
                let message = err.to_string().to_lowercase();
                assert!(
                    message.contains("inkscape") || message.contains("timed out"),
                    "unexpected error: {message}"
                );
            }
        }
    }
}
