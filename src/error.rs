//! Unified error handling for pto-forge
//!
//! Every failure the pipeline can observe is a [`PtoForgeError`]. Variants are
//! grouped into an [`ErrorCategory`]:
//! - Configuration errors (external dependency not locatable, bad settings)
//! - Precondition errors (missing program, empty kernel set, missing artifacts)
//! - External tool errors (code generator or execution engine failures)
//! - Cleanup errors (work-directory removal)
//! - Internal errors (panics captured from collaborators, unexpected I/O)
//!
//! The test runner never lets one of these escape `run()`; they are flattened
//! into a [`crate::result::TestError`] instead.

use std::fmt;
use std::path::PathBuf;

// Re-export thiserror for convenience
pub use thiserror;

/// Unified error type for pto-forge
#[derive(Debug, thiserror::Error)]
pub enum PtoForgeError {
    // ========== Configuration Errors ==========
    /// Required external dependency could not be located
    #[error("{dependency} not found. Please either:\n  1. Set {env_var} environment variable, or\n  2. Run: {hint}")]
    DependencyNotFound {
        dependency: &'static str,
        env_var: &'static str,
        hint: &'static str,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Session output directory could not be created
    #[error("Failed to create session output directory {}", .path.display())]
    SessionDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ========== Precondition Errors ==========
    /// Test case resolved to no program object
    #[error("Test case {0} must implement program() to return a PyPTO program")]
    MissingProgram(String),

    /// Code generation produced zero kernels
    #[error("No kernels generated for {0}")]
    NoKernelsGenerated(String),

    /// Tensor declarations of a test case are inconsistent
    #[error("Invalid tensor spec: {0}")]
    InvalidTensorSpec(String),

    /// Golden computation is empty or references unknown tensors
    #[error("Invalid golden computation: {0}")]
    InvalidGolden(String),

    /// Test name cannot be used as a single directory name
    #[error("Invalid test name '{0}': must be one path component without separators")]
    InvalidTestName(String),

    /// An artifact the execution engine needs is absent
    #[error("Missing artifact: {}", .0.display())]
    MissingArtifact(PathBuf),

    // ========== External Tool Errors ==========
    /// The code generator failed
    #[error("Code generation failed for {test_name}")]
    Codegen {
        test_name: String,
        #[source]
        source: Box<PtoForgeError>,
    },

    /// The execution engine failed
    #[error("Execution failed for {test_name}")]
    Execution {
        test_name: String,
        #[source]
        source: Box<PtoForgeError>,
    },

    /// An external tool could not be started
    #[error("Failed to launch {tool}")]
    ToolLaunch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// An external tool ran and exited unsuccessfully
    #[error("{tool} exited with {status}: {stderr}")]
    ToolExited {
        tool: String,
        status: String,
        stderr: String,
    },

    /// Failure reported by a collaborator that has no better variant
    #[error("{0}")]
    ToolFailure(String),

    // ========== Cleanup Errors ==========
    /// Ephemeral work directory could not be removed
    #[error("Failed to remove work directory {}", .path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ========== Internal Errors ==========
    /// A collaborator panicked inside the pipeline
    #[error("Pipeline panicked: {0}")]
    Panicked(String),

    /// File I/O error with context
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Internal error (indicates a bug)
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl PtoForgeError {
    /// Categorize the error for reporting
    pub fn category(&self) -> ErrorCategory {
        match self {
            PtoForgeError::DependencyNotFound { .. }
            | PtoForgeError::InvalidConfiguration(_)
            | PtoForgeError::SessionDirectory { .. } => ErrorCategory::Configuration,

            PtoForgeError::MissingProgram(_)
            | PtoForgeError::NoKernelsGenerated(_)
            | PtoForgeError::InvalidTensorSpec(_)
            | PtoForgeError::InvalidGolden(_)
            | PtoForgeError::InvalidTestName(_)
            | PtoForgeError::MissingArtifact(_) => ErrorCategory::Precondition,

            PtoForgeError::Codegen { .. }
            | PtoForgeError::Execution { .. }
            | PtoForgeError::ToolLaunch { .. }
            | PtoForgeError::ToolExited { .. }
            | PtoForgeError::ToolFailure(_) => ErrorCategory::ExternalTool,

            PtoForgeError::Cleanup { .. } => ErrorCategory::Cleanup,

            PtoForgeError::Panicked(_)
            | PtoForgeError::Io { .. }
            | PtoForgeError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// Stable short name of the variant, used as the error kind in results
    pub fn kind(&self) -> &'static str {
        match self {
            PtoForgeError::DependencyNotFound { .. } => "DependencyNotFound",
            PtoForgeError::InvalidConfiguration(_) => "InvalidConfiguration",
            PtoForgeError::SessionDirectory { .. } => "SessionDirectory",
            PtoForgeError::MissingProgram(_) => "MissingProgram",
            PtoForgeError::NoKernelsGenerated(_) => "NoKernelsGenerated",
            PtoForgeError::InvalidTensorSpec(_) => "InvalidTensorSpec",
            PtoForgeError::InvalidGolden(_) => "InvalidGolden",
            PtoForgeError::InvalidTestName(_) => "InvalidTestName",
            PtoForgeError::MissingArtifact(_) => "MissingArtifact",
            PtoForgeError::Codegen { .. } => "Codegen",
            PtoForgeError::Execution { .. } => "Execution",
            PtoForgeError::ToolLaunch { .. } => "ToolLaunch",
            PtoForgeError::ToolExited { .. } => "ToolExited",
            PtoForgeError::ToolFailure(_) => "ToolFailure",
            PtoForgeError::Cleanup { .. } => "Cleanup",
            PtoForgeError::Panicked(_) => "Panicked",
            PtoForgeError::Io { .. } => "Io",
            PtoForgeError::InternalError(_) => "InternalError",
        }
    }

    /// Check if this is a precondition failure of the test case itself
    pub fn is_precondition(&self) -> bool {
        matches!(self.category(), ErrorCategory::Precondition)
    }

    /// Check if this error came out of the code generator or execution engine
    pub fn is_external(&self) -> bool {
        matches!(self.category(), ErrorCategory::ExternalTool)
    }
}

/// Error category, mirroring the failure taxonomy of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorCategory {
    /// Environment or settings problem, fatal before any pipeline step
    Configuration,
    /// The test case or its generated artifacts are incomplete
    Precondition,
    /// Code generator or execution engine failure
    ExternalTool,
    /// Work-directory removal failure
    Cleanup,
    /// Bug or unexpected condition
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "Configuration"),
            ErrorCategory::Precondition => write!(f, "Precondition"),
            ErrorCategory::ExternalTool => write!(f, "ExternalTool"),
            ErrorCategory::Cleanup => write!(f, "Cleanup"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}

// Helper type alias for Results using PtoForgeError
pub type ForgeResult<T> = std::result::Result<T, PtoForgeError>;

/// Create an internal error with context
///
/// # Examples
/// ```ignore
/// return Err(internal_error!("kernel {} lost its func_id", name));
/// ```
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::error::PtoForgeError::InternalError($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::PtoForgeError::InternalError(format!($fmt, $($arg)*))
    };
}

/// Wrap an IO error with context
///
/// # Examples
/// ```ignore
/// fs::write(&path, text).map_err(|e| io_context(e, format!("writing {}", path.display())))?;
/// ```
pub fn io_context(err: std::io::Error, msg: impl Into<String>) -> PtoForgeError {
    PtoForgeError::Io {
        context: msg.into(),
        source: err,
    }
}
