//! Generated artifacts and the orchestration decision
//!
//! Artifacts are created once per run, by the code generator or the fallback
//! path, and only ever annotated afterwards (func_id assignment).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::error::PtoForgeError;

/// Execution-unit kind a kernel targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoreType {
    /// Vector engine
    Aiv,
    /// Cube (matrix) engine
    Aic,
}

impl CoreType {
    /// Subdirectory of `kernels/` and descriptor spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            CoreType::Aiv => "aiv",
            CoreType::Aic => "aic",
        }
    }

    /// Enumerator used in orchestration sources
    pub fn cpp_enum(&self) -> &'static str {
        match self {
            CoreType::Aiv => "CoreType::AIV",
            CoreType::Aic => "CoreType::AIC",
        }
    }

    /// Scan order of kernel subdirectories
    pub const ALL: [CoreType; 2] = [CoreType::Aiv, CoreType::Aic];
}

impl fmt::Display for CoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoreType {
    type Err = PtoForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aiv" => Ok(CoreType::Aiv),
            "aic" => Ok(CoreType::Aic),
            other => Err(PtoForgeError::InvalidConfiguration(format!(
                "unknown core type '{}'",
                other
            ))),
        }
    }
}

/// One generated kernel source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KernelArtifact {
    pub source: PathBuf,
    pub core_type: CoreType,
    /// Sequence identifier; assigned by the pipeline when the generator gave none
    pub func_id: Option<u32>,
}

impl KernelArtifact {
    pub fn new(source: impl Into<PathBuf>, core_type: CoreType) -> Self {
        KernelArtifact {
            source: source.into(),
            core_type,
            func_id: None,
        }
    }

    /// Kernel function name, taken from the file stem
    pub fn name(&self) -> String {
        self.source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Number kernels `0..n` in generation order
pub fn assign_func_ids(kernels: &mut [KernelArtifact]) {
    for (func_id, kernel) in kernels.iter_mut().enumerate() {
        kernel.func_id = Some(func_id as u32);
    }
}

/// Generated orchestration source plus its exported entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrchestrationArtifact {
    pub source: PathBuf,
    pub function_name: String,
}

/// Everything the code generator reported
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodegenOutput {
    pub kernels: Vec<KernelArtifact>,
    pub orchestration: Option<OrchestrationArtifact>,
}

/// Which path produced the orchestration of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrchestrationKind {
    Generated,
    Fallback,
}

impl fmt::Display for OrchestrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestrationKind::Generated => write!(f, "generated"),
            OrchestrationKind::Fallback => write!(f, "fallback"),
        }
    }
}

/// Orchestration decision, taken once right after code generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationPlan {
    /// The generator emitted orchestration; adopt it as-is
    Generated {
        kernels: Vec<KernelArtifact>,
        orchestration: OrchestrationArtifact,
    },
    /// Orchestration must be synthesized from the kernel list
    NeedsFallback { kernels: Vec<KernelArtifact> },
}

impl OrchestrationPlan {
    pub fn kind(&self) -> OrchestrationKind {
        match self {
            OrchestrationPlan::Generated { .. } => OrchestrationKind::Generated,
            OrchestrationPlan::NeedsFallback { .. } => OrchestrationKind::Fallback,
        }
    }

    pub fn kernels(&self) -> &[KernelArtifact] {
        match self {
            OrchestrationPlan::Generated { kernels, .. }
            | OrchestrationPlan::NeedsFallback { kernels } => kernels,
        }
    }
}

impl From<CodegenOutput> for OrchestrationPlan {
    fn from(output: CodegenOutput) -> Self {
        match output.orchestration {
            Some(orchestration) => OrchestrationPlan::Generated {
                kernels: output.kernels,
                orchestration,
            },
            None => OrchestrationPlan::NeedsFallback {
                kernels: output.kernels,
            },
        }
    }
}

/// Path of `path` relative to `base` when it lies inside it
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}
