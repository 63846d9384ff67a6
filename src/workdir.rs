//! Per-test working directory
//!
//! Ephemeral directories are owned by a `tempfile::TempDir`, so they are
//! removed on every exit path including unwinding. [`WorkDir::finish`]
//! removes them explicitly to observe removal errors. Persisted directories
//! are never cleaned at the end of a run, whatever the outcome; outputs a
//! previous run left in them are cleared before the next one starts.

use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::{io_context, ForgeResult, PtoForgeError};

#[derive(Debug)]
pub enum WorkDir {
    Ephemeral(TempDir),
    Persistent(PathBuf),
}

impl WorkDir {
    /// Fresh uniquely-named directory under the system temp dir
    pub fn ephemeral(test_name: &str) -> ForgeResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("pto_test_{}_", test_name))
            .tempdir()
            .map_err(|e| io_context(e, "creating temporary work directory"))?;
        debug!(work_dir = %dir.path().display(), "Created ephemeral work directory");
        Ok(WorkDir::Ephemeral(dir))
    }

    /// `path`, created if absent, kept after the run
    pub fn persistent(path: PathBuf) -> ForgeResult<Self> {
        std::fs::create_dir_all(&path)
            .map_err(|e| io_context(e, format!("creating work directory {}", path.display())))?;
        debug!(work_dir = %path.display(), "Using persistent work directory");
        Ok(WorkDir::Persistent(path))
    }

    /// Remove stale entries named in `outputs` from a persistent directory
    ///
    /// Anything else in the directory is left alone. No-op when ephemeral.
    pub fn clear_outputs(&self, outputs: &[&str]) -> ForgeResult<()> {
        let WorkDir::Persistent(root) = self else {
            return Ok(());
        };
        for entry in outputs {
            let path = root.join(entry);
            let removed = match std::fs::symlink_metadata(&path) {
                Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(&path),
                Ok(_) => std::fs::remove_file(&path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => Err(e),
            };
            removed.map_err(|e| io_context(e, format!("removing stale {}", path.display())))?;
            debug!(path = %path.display(), "Removed output of a previous run");
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        match self {
            WorkDir::Ephemeral(dir) => dir.path(),
            WorkDir::Persistent(path) => path,
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, WorkDir::Ephemeral(_))
    }

    /// Path that outlives the run, if any
    pub fn retained_path(&self) -> Option<PathBuf> {
        match self {
            WorkDir::Ephemeral(_) => None,
            WorkDir::Persistent(path) => Some(path.clone()),
        }
    }

    /// End of the run: remove an ephemeral directory recursively
    pub fn finish(self) -> ForgeResult<()> {
        match self {
            WorkDir::Ephemeral(dir) => {
                let path = dir.path().to_path_buf();
                dir.close()
                    .map_err(|source| PtoForgeError::Cleanup { path: path.clone(), source })?;
                debug!(work_dir = %path.display(), "Removed ephemeral work directory");
                Ok(())
            }
            WorkDir::Persistent(_) => Ok(()),
        }
    }
}

/// Reject test names that would not stay a single directory under the parent
pub fn validate_test_name(test_name: &str) -> ForgeResult<()> {
    let mut components = Path::new(test_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None)
            if part == test_name && !test_name.contains(['/', '\\']) =>
        {
            Ok(())
        }
        _ => Err(PtoForgeError::InvalidTestName(test_name.to_string())),
    }
}
