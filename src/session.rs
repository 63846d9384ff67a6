//! Session-level output directory
//!
//! One [`SessionContext`] is created by the top-level test-run invocation and
//! shared by every runner in it. The first request creates
//! `<output_root>/output_<YYYYmmdd_HHMMSS>/`; later requests return the same
//! path. Processes are not coordinated, so two sessions started within the
//! same second share a directory.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::info;

use crate::environment::Environment;
use crate::error::{ForgeResult, PtoForgeError};

#[derive(Debug)]
pub struct SessionContext {
    output_root: PathBuf,
    session_dir: OnceCell<PathBuf>,
}

impl SessionContext {
    /// Session whose directory will be created under `output_root`
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        SessionContext {
            output_root: output_root.into(),
            session_dir: OnceCell::new(),
        }
    }

    /// Session under the framework's `build/outputs` directory
    pub fn from_environment(env: &Environment) -> Self {
        Self::new(env.output_root())
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// The session directory, created with all missing parents on first use
    pub fn session_dir(&self) -> ForgeResult<&Path> {
        self.session_dir
            .get_or_try_init(|| {
                let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
                let dir = self.output_root.join(format!("output_{}", timestamp));
                std::fs::create_dir_all(&dir).map_err(|source| {
                    PtoForgeError::SessionDirectory {
                        path: dir.clone(),
                        source,
                    }
                })?;
                info!(session_dir = %dir.display(), "Created session output directory");
                Ok(dir)
            })
            .map(PathBuf::as_path)
    }

    /// Session directory if one was already created
    pub fn existing_dir(&self) -> Option<&Path> {
        self.session_dir.get().map(PathBuf::as_path)
    }
}
