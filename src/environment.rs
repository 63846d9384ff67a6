//! Locating the external dependencies of the pipeline
//!
//! The code generator (PyPTO) and the execution engine (simpler) are Python
//! packages outside this crate. Their roots are found through environment
//! variables first, then through the `3rdparty/` directory of the framework
//! root.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{ForgeResult, PtoForgeError};

pub const FRAMEWORK_ROOT_ENV: &str = "FRAMEWORK_ROOT";
pub const PYPTO_ROOT_ENV: &str = "PYPTO_ROOT";
pub const SIMPLER_ROOT_ENV: &str = "SIMPLER_ROOT";
pub const PYTHON_ENV: &str = "PTOFORGE_PYTHON";

const DEFAULT_PYTHON: &str = "python3";

/// Resolved dependency locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub framework_root: PathBuf,
    pub pypto_root: Option<PathBuf>,
    pub simpler_root: Option<PathBuf>,
    /// Interpreter used to drive the Python-side tools
    pub python: PathBuf,
}

impl Environment {
    /// Resolve all locations from the process environment
    pub fn from_env() -> Self {
        let framework_root = std::env::var_os(FRAMEWORK_ROOT_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")));

        let pypto_root = lookup_root(PYPTO_ROOT_ENV, &framework_root, "pypto");
        let simpler_root = lookup_root(SIMPLER_ROOT_ENV, &framework_root, "simpler");

        let python = std::env::var_os(PYTHON_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PYTHON));

        Environment {
            framework_root,
            pypto_root,
            simpler_root,
            python,
        }
    }

    /// Environment rooted at `framework_root` with explicit dependency roots
    pub fn with_roots(
        framework_root: impl Into<PathBuf>,
        pypto_root: Option<PathBuf>,
        simpler_root: Option<PathBuf>,
    ) -> Self {
        Environment {
            framework_root: framework_root.into(),
            pypto_root,
            simpler_root,
            python: PathBuf::from(DEFAULT_PYTHON),
        }
    }

    /// Default parent of all session output directories
    pub fn output_root(&self) -> PathBuf {
        self.framework_root.join("build").join("outputs")
    }

    /// PyPTO root directory, required
    pub fn require_pypto_root(&self) -> ForgeResult<&Path> {
        self.pypto_root
            .as_deref()
            .ok_or(PtoForgeError::DependencyNotFound {
                dependency: "PyPTO",
                env_var: PYPTO_ROOT_ENV,
                hint: "./build_and_install.sh --with-pypto",
            })
    }

    /// Simpler root directory, required
    pub fn require_simpler_root(&self) -> ForgeResult<&Path> {
        self.simpler_root
            .as_deref()
            .ok_or(PtoForgeError::DependencyNotFound {
                dependency: "Simpler",
                env_var: SIMPLER_ROOT_ENV,
                hint: "./build_and_install.sh --with-runtime",
            })
    }

    pub fn pypto_python_path(&self) -> Option<PathBuf> {
        self.pypto_root.as_ref().map(|root| root.join("python"))
    }

    pub fn simpler_python_path(&self) -> Option<PathBuf> {
        self.simpler_root.as_ref().map(|root| root.join("python"))
    }

    pub fn simpler_scripts_path(&self) -> Option<PathBuf> {
        self.simpler_root
            .as_ref()
            .map(|root| root.join("examples").join("scripts"))
    }

    /// `PYTHONPATH` value for tool subprocesses: every known dependency path
    /// that exists, followed by the inherited `PYTHONPATH`.
    pub fn python_path(&self) -> ForgeResult<OsString> {
        let mut entries: Vec<PathBuf> = [
            self.pypto_python_path(),
            self.simpler_python_path(),
            self.simpler_scripts_path(),
        ]
        .into_iter()
        .flatten()
        .filter(|p| p.exists())
        .collect();

        if let Some(inherited) = std::env::var_os("PYTHONPATH") {
            for path in std::env::split_paths(&inherited) {
                if !entries.contains(&path) {
                    entries.push(path);
                }
            }
        }

        std::env::join_paths(entries)
            .map_err(|e| PtoForgeError::InvalidConfiguration(format!("PYTHONPATH: {}", e)))
    }
}

fn lookup_root(env_var: &str, framework_root: &Path, name: &str) -> Option<PathBuf> {
    if let Some(root) = std::env::var_os(env_var) {
        return Some(PathBuf::from(root));
    }

    let fallback = framework_root.join("3rdparty").join(name);
    fallback.exists().then_some(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard(Vec<(&'static str, Option<OsString>)>);

    impl EnvGuard {
        fn set(vars: &[(&'static str, Option<&Path>)]) -> Self {
            let saved = vars
                .iter()
                .map(|(k, _)| (*k, std::env::var_os(k)))
                .collect();
            for (k, v) in vars {
                match v {
                    Some(v) => std::env::set_var(k, v),
                    None => std::env::remove_var(k),
                }
            }
            EnvGuard(saved)
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (k, v) in &self.0 {
                match v {
                    Some(v) => std::env::set_var(k, v),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    #[test]
    #[serial]
    fn test_env_vars_take_precedence() {
        let root = tempfile::tempdir().unwrap();
        let pypto = root.path().join("custom_pypto");
        let _guard = EnvGuard::set(&[
            (FRAMEWORK_ROOT_ENV, Some(root.path())),
            (PYPTO_ROOT_ENV, Some(&pypto)),
            (SIMPLER_ROOT_ENV, None),
        ]);

        let env = Environment::from_env();
        assert_eq!(env.framework_root, root.path());
        assert_eq!(env.pypto_root.as_deref(), Some(pypto.as_path()));
        assert_eq!(env.pypto_python_path(), Some(pypto.join("python")));
        assert!(env.simpler_root.is_none());
        assert_eq!(env.output_root(), root.path().join("build").join("outputs"));
    }

    #[test]
    #[serial]
    fn test_third_party_fallback() {
        let root = tempfile::tempdir().unwrap();
        let simpler = root.path().join("3rdparty").join("simpler");
        std::fs::create_dir_all(&simpler).unwrap();
        let _guard = EnvGuard::set(&[
            (FRAMEWORK_ROOT_ENV, Some(root.path())),
            (PYPTO_ROOT_ENV, None),
            (SIMPLER_ROOT_ENV, None),
        ]);

        let env = Environment::from_env();
        assert!(env.pypto_root.is_none());
        assert_eq!(env.simpler_root.as_deref(), Some(simpler.as_path()));
        assert_eq!(
            env.simpler_scripts_path(),
            Some(simpler.join("examples").join("scripts"))
        );
    }

    #[test]
    fn test_require_missing_dependency() {
        let env = Environment::with_roots("/nonexistent", None, None);
        let err = env.require_pypto_root().unwrap_err();
        assert_eq!(err.kind(), "DependencyNotFound");
        assert!(err.to_string().contains("PYPTO_ROOT"));

        let err = env.require_simpler_root().unwrap_err();
        assert!(err.to_string().contains("SIMPLER_ROOT"));
    }

    #[test]
    #[serial]
    fn test_python_path_skips_missing_dirs() {
        let root = tempfile::tempdir().unwrap();
        let pypto = root.path().join("pypto");
        std::fs::create_dir_all(pypto.join("python")).unwrap();
        let _guard = EnvGuard::set(&[("PYTHONPATH", None)]);

        let env = Environment::with_roots(root.path(), Some(pypto.clone()), Some(root.path().join("absent")));
        let joined = env.python_path().unwrap();
        let paths: Vec<PathBuf> = std::env::split_paths(&joined).collect();
        assert_eq!(paths, vec![pypto.join("python")]);
    }
}
