//! pto-forge - test orchestration for generated PTO kernels
//!
//! Takes a test case (tensor declarations, a PyPTO program and a golden
//! computation) through kernel code generation, assembles the artifacts the
//! execution engine needs, runs the engine on the simulator or a device, and
//! reports pass/fail per case.

#![allow(clippy::new_without_default)]

pub mod artifacts;
pub mod case;
pub mod codegen;
pub mod config;
pub mod environment;
pub mod error;
pub mod logging;
pub mod result;
pub mod runner;
pub mod runtime;
pub mod session;
pub mod suite;
pub mod tool;
pub mod workdir;

pub use artifacts::{CodegenOutput, CoreType, KernelArtifact, OrchestrationArtifact, OrchestrationKind, OrchestrationPlan};
pub use case::{DataType, GoldenComputation, OptimizationStrategy, Program, TensorSpec, TestCase};
pub use codegen::{CodeGenerator, CodegenRequest};
pub use config::{Platform, TestConfig};
pub use environment::Environment;
pub use error::{ErrorCategory, ForgeResult, PtoForgeError};
pub use result::{TestError, TestResult};
pub use runner::TestRunner;
pub use runtime::{ExecutionEngine, ExecutionRequest};
pub use session::SessionContext;
pub use suite::{SuiteResults, SuiteSummary, TestSuite};
