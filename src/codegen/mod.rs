//! Code generation and artifact assembly
//!
//! - [`CodeGenerator`]: seam to the external kernel compiler
//! - [`pypto`]: PyPTO-backed generator and the artifact scan of its output
//! - [`orchestration`]: fallback orchestration source
//! - [`config_writer`]: `kernel_config.py` descriptor
//! - [`golden`]: `golden.py` reference script

pub mod config_writer;
pub mod golden;
pub mod orchestration;
pub mod pypto;
pub mod pyrepr;

use std::path::PathBuf;

use crate::artifacts::CodegenOutput;
use crate::case::program::{OptimizationStrategy, Program};
use crate::error::ForgeResult;

pub use config_writer::{ConfigDescriptorWriter, KERNEL_CONFIG_FILE};
pub use golden::{GoldenReferenceEmitter, GOLDEN_DATA_DIR, GOLDEN_FILE};
pub use orchestration::{OrchestrationFallbackGenerator, FALLBACK_ENTRY_POINT, FALLBACK_ORCHESTRATION_PATH};
pub use pypto::{
    collect_artifacts, ensure_orchestration_headers, PyptoCodeGenerator, KERNELS_DIR,
    ORCHESTRATION_DIR, PROGRAM_DIR,
};

/// One code generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenRequest {
    pub program: Program,
    /// Work directory; sources land under `kernels/` and `orchestration/`
    pub output_dir: PathBuf,
    pub strategy: OptimizationStrategy,
    pub dump_passes: bool,
}

/// Kernel compiler seam
///
/// Implementations write their files under `request.output_dir` and report
/// what they produced. A returned orchestration artifact is adopted as-is.
pub trait CodeGenerator {
    fn generate(&self, request: &CodegenRequest) -> ForgeResult<CodegenOutput>;
}
