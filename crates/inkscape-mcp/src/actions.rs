use std::path::Path;

use crate::document::ExportSpec;
use crate::error::InkscapeError;

/// Explicit allowlist of Inkscape actions safe to run headless on behalf of
/// a remote caller. Anything off this list is rejected before a process is
/// spawned.
pub const SAFE_ACTIONS: &[&str] = &[
    "select-all",
    "select-clear",
    "select-by-id",
    "select-by-class",
    "select-by-element",
    "path-union",
    "path-difference",
    "path-intersection",
    "path-division",
    "path-exclusion",
    "path-simplify",
    "object-to-path",
    "object-stroke-to-path",
    "selection-group",
    "selection-ungroup",
    "export-area-page",
    "export-area-drawing",
    "export-type",
    "export-filename",
    "export-dpi",
    "export-do",
    "file-save",
    "file-close",
    "transform-translate",
    "transform-scale",
    "transform-rotate",
    "query-x",
    "query-y",
    "query-width",
    "query-height",
    "query-all",
];

/// The action identifier: everything before the first `:` argument separator.
pub fn action_id(action: &str) -> &str {
    action.split(':').next().unwrap_or(action)
}

pub fn is_safe_action(action: &str) -> bool {
    SAFE_ACTIONS.contains(&action_id(action))
}

/// Validates a requested action list against the allowlist.
pub fn validate_actions(actions: &[String]) -> Result<(), InkscapeError> {
    for action in actions {
        if !is_safe_action(action) {
            return Err(InkscapeError::Validation(format!(
                "unsafe action: {action}"
            )));
        }
    }
    Ok(())
}

/// Ordered action sequence handed to one Inkscape invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionPlan {
    actions: Vec<String>,
}

impl ActionPlan {
    /// Assembles the action sequence for a run.
    ///
    /// Selection and query actions operate on the current selection, so a
    /// `select-clear` is prepended whenever any are requested. An export
    /// request appends the full export chain targeting `tmp_export`; the
    /// caller renames the temp file over the real target afterwards.
    pub fn build(requested: &[String], export: Option<(&ExportSpec, &Path)>) -> Self {
        let mut actions = Vec::with_capacity(requested.len() + 6);

        if requested
            .iter()
            .any(|a| a.starts_with("select-") || a.starts_with("query-"))
        {
            actions.push("select-clear".to_string());
        }
        actions.extend(requested.iter().cloned());

        if let Some((spec, tmp_export)) = export {
            actions.push(spec.area.action().to_string());
            actions.push(format!("export-type:{}", spec.format.as_str()));
            actions.push(format!("export-filename:{}", tmp_export.display()));
            if let Some(dpi) = spec.dpi {
                actions.push(format!("export-dpi:{dpi}"));
            }
            actions.push("export-do".to_string());
        }

        Self { actions }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.actions
    }

    /// Renders the plan as the value of Inkscape's `--actions=` argument.
    pub fn to_arg(&self) -> String {
        self.actions.join(";")
    }
}

/// Full argv for one headless Inkscape run.
///
/// `file-close` is deliberately not appended: Inkscape exits on its own in
/// batch mode, and closing explicitly crashes some releases.
pub fn inkscape_command(input: &Path, plan: &ActionPlan) -> Vec<String> {
    vec![
        "inkscape".to_string(),
        input.display().to_string(),
        format!("--actions={}", plan.to_arg()),
        "--batch-process".to_string(),
    ]
}
