//! Outcome of running one test case

use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::artifacts::OrchestrationKind;
use crate::error::{ErrorCategory, PtoForgeError};

/// Structured failure recorded on a [`TestResult`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestError {
    pub category: ErrorCategory,
    /// Variant name of the originating error, e.g. `MissingProgram`
    pub kind: String,
    pub message: String,
    /// Messages of the `source()` chain, outermost first
    pub causes: Vec<String>,
}

impl TestError {
    /// Flatten an error and its cause chain
    pub fn from_error(err: &PtoForgeError) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        TestError {
            category: err.category(),
            kind: err.kind().to_string(),
            message: err.to_string(),
            causes,
        }
    }

    /// Append an error that happened after the primary failure
    pub fn push_cause(&mut self, err: &PtoForgeError) {
        self.causes.push(format!("{} ({})", err, err.kind()));
        let mut source = err.source();
        while let Some(cause) = source {
            self.causes.push(cause.to_string());
            source = cause.source();
        }
    }
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        for cause in &self.causes {
            write!(f, "\n  caused by: {}", cause)?;
        }
        Ok(())
    }
}

/// Result of one `TestRunner::run` call; immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub passed: bool,
    pub test_name: String,
    pub execution_time: Duration,
    pub error: Option<TestError>,
    /// Number of kernel artifacts the run produced
    pub kernel_count: usize,
    /// Orchestration path taken, when code generation got that far
    pub orchestration: Option<OrchestrationKind>,
    /// Whether the execution engine was invoked
    pub executed: bool,
    /// Seed written into the golden script
    pub seed: u64,
    /// Retained work directory (persisted mode only)
    pub work_dir: Option<PathBuf>,
}

impl TestResult {
    pub fn failure(&self) -> Option<&TestError> {
        self.error.as_ref()
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "PASS" } else { "FAIL" };
        write!(
            f,
            "[{}] {} ({:.2}s)",
            status,
            self.test_name,
            self.execution_time.as_secs_f64()
        )?;
        if let Some(error) = &self.error {
            write!(f, ": {}", error)?;
        }
        Ok(())
    }
}
