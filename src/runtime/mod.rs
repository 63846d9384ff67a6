//! Execution engine seam
//!
//! The engine compiles the kernels and orchestration described by
//! `kernel_config.py`, runs them on the simulator or a device, and compares
//! the outputs against `golden.py`. A returned error means the test failed.

pub mod code_runner;

use std::path::PathBuf;

use crate::config::Platform;
use crate::error::ForgeResult;

pub use code_runner::CodeRunnerEngine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Work directory holding the kernels, descriptor and golden script
    pub work_dir: PathBuf,
    pub golden_path: PathBuf,
    pub platform: Platform,
    pub device_id: u32,
}

pub trait ExecutionEngine {
    fn execute(&self, request: &ExecutionRequest) -> ForgeResult<()>;
}
