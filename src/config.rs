//! Run configuration for the test runner
//!
//! [`TestConfig`] controls where generated artifacts live, whether the
//! execution engine runs, and which target it runs on. A runner takes its
//! configuration by value and never mutates it.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::PtoForgeError;

/// Execution target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    /// Cycle simulator
    #[default]
    Simulator,
    /// Real device
    Device,
}

impl Platform {
    /// Name the execution engine expects
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Simulator => "a2a3sim",
            Platform::Device => "a2a3",
        }
    }

    pub fn is_hardware(&self) -> bool {
        matches!(self, Platform::Device)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = PtoForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a2a3sim" => Ok(Platform::Simulator),
            "a2a3" => Ok(Platform::Device),
            other => Err(PtoForgeError::InvalidConfiguration(format!(
                "unknown platform '{}' (expected a2a3sim or a2a3)",
                other
            ))),
        }
    }
}

/// Configuration of a test run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestConfig {
    pub platform: Platform,

    /// Device identifier on hardware platforms
    pub device_id: u32,

    /// Keep the work directory after the run
    pub save_kernels: bool,

    /// Parent of persisted work directories; the session directory when unset
    pub save_kernels_dir: Option<PathBuf>,

    /// Ask the code generator to dump intermediate IR after each pass
    pub dump_passes: bool,

    /// Stop after artifact assembly, never invoke the execution engine
    pub codegen_only: bool,

    /// Seed for rule-generated inputs; drawn once per runner when unset
    pub seed: Option<u64>,
}

impl TestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_device_id(mut self, device_id: u32) -> Self {
        self.device_id = device_id;
        self
    }

    pub fn with_save_kernels(mut self, save_kernels: bool) -> Self {
        self.save_kernels = save_kernels;
        self
    }

    /// Persist work directories under `dir`; implies `save_kernels`
    pub fn with_save_kernels_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_kernels = true;
        self.save_kernels_dir = Some(dir.into());
        self
    }

    pub fn with_dump_passes(mut self, dump_passes: bool) -> Self {
        self.dump_passes = dump_passes;
        self
    }

    pub fn with_codegen_only(mut self, codegen_only: bool) -> Self {
        self.codegen_only = codegen_only;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
