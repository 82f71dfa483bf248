use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::InkscapeConfig;
use crate::error::InkscapeError;

/// Filesystem view scoped to the configured workspace directory.
///
/// Every user-supplied path flows through [`Workspace::confine`] before it is
/// touched; reads are bounded by the configured size limit and writes go
/// through a temp-file-and-rename so partially written documents are never
/// observable.
#[derive(Clone, Debug)]
pub struct Workspace {
    root: PathBuf,
    max_file_size: u64,
}

impl Workspace {
    /// Builds a workspace view from a prepared config. The workspace
    /// directory must already exist (config constructors guarantee that).
    pub fn new(config: &InkscapeConfig) -> Result<Self, InkscapeError> {
        let root = fs::canonicalize(&config.workspace).map_err(|err| {
            InkscapeError::Config(format!(
                "cannot use workspace {}: {err}",
                config.workspace.display()
            ))
        })?;
        Ok(Self {
            root,
            max_file_size: config.max_file_size,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a caller-supplied path and ensures it stays inside the
    /// workspace. Relative paths are joined to the workspace root; `.`/`..`
    /// segments are resolved lexically and the deepest existing ancestor is
    /// canonicalized so symlinked roots compare consistently.
    pub fn confine(&self, path: impl AsRef<Path>) -> Result<PathBuf, InkscapeError> {
        let candidate = path.as_ref();
        let absolute = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };

        let resolved = resolve_existing_prefix(&lexical_normalize(&absolute));
        if resolved == self.root || resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(InkscapeError::Validation(format!(
                "path {} escapes workspace {}",
                candidate.display(),
                self.root.display()
            )))
        }
    }

    /// Rejects files over the configured size limit. Missing files are a
    /// validation error so callers surface a clean "file not found".
    pub fn check_size(&self, path: &Path) -> Result<(), InkscapeError> {
        let metadata = fs::metadata(path)
            .map_err(|_| InkscapeError::Validation(format!("file not found: {}", path.display())))?;
        if metadata.len() > self.max_file_size {
            return Err(InkscapeError::Validation(format!(
                "file too large: {} bytes (limit {})",
                metadata.len(),
                self.max_file_size
            )));
        }
        Ok(())
    }

    /// Reads a confined file, enforcing the size limit first.
    pub fn read_bounded(&self, path: &Path) -> Result<String, InkscapeError> {
        self.check_size(path)?;
        fs::read_to_string(path).map_err(InkscapeError::from)
    }

    /// Rejects inline documents over the configured size limit.
    pub fn check_inline(&self, svg: &str) -> Result<(), InkscapeError> {
        if svg.len() as u64 > self.max_file_size {
            return Err(InkscapeError::Validation(format!(
                "inline SVG too large: {} bytes (limit {})",
                svg.len(),
                self.max_file_size
            )));
        }
        Ok(())
    }

    /// Spills an inline document into the workspace under a unique name.
    /// The caller is responsible for removing it afterwards.
    pub fn write_inline(&self, svg: &str) -> Result<PathBuf, InkscapeError> {
        self.check_inline(svg)?;
        let path = self.root.join(format!("inline-{}.svg", random_hex()));
        fs::write(&path, svg)?;
        Ok(path)
    }

    /// Writes `text` to `path` atomically: content lands in a uniquely named
    /// sibling first and is renamed over the target. Parent directories are
    /// created on demand.
    pub fn atomic_write(&self, path: &Path, text: &str) -> Result<(), InkscapeError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                InkscapeError::Validation(format!("invalid target path: {}", path.display()))
            })?;
        let tmp = path.with_file_name(format!("{file_name}.tmp-{}", random_hex()));

        if let Some(parent) = tmp.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&tmp, text)?;
        if let Err(err) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }
}

/// Unique hex suffix for temp files. Falls back to a clock-derived value if
/// the OS entropy source is unavailable.
pub fn random_hex() -> String {
    let mut bytes = [0u8; 16];
    if getrandom::getrandom(&mut bytes).is_err() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        for (idx, byte) in bytes.iter_mut().enumerate() {
            *byte = ((now >> (idx * 8)) & 0xFF) as u8;
        }
    }
    hex::encode(bytes)
}

/// Resolves `.` and `..` components without touching the filesystem.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if normalized
                    .components()
                    .next_back()
                    .is_some_and(|c| matches!(c, Component::Normal(_)))
                {
                    normalized.pop();
                }
                // Attempts to go above the root of an absolute path are
                // dropped; the confinement check catches real escapes.
            }
            Component::Normal(part) => normalized.push(part),
        }
    }

    normalized
}

/// Canonicalizes the deepest existing ancestor of `path` and re-joins the
/// remaining components, so not-yet-created targets still resolve through
/// any symlinks on the existing part of the path.
fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut remainder = Vec::new();

    while !existing.exists() {
        match existing.file_name() {
            Some(name) => {
                remainder.push(name.to_os_string());
                existing.pop();
            }
            None => return path.to_path_buf(),
        }
    }

    let mut resolved = fs::canonicalize(&existing).unwrap_or(existing);
    for part in remainder.into_iter().rev() {
        resolved.push(part);
    }
    resolved
}
