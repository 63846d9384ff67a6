//! Result aggregation over a collection of test cases

use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::case::TestCase;
use crate::result::TestResult;
use crate::runner::TestRunner;

/// Named, ordered collection of test cases
pub struct TestSuite {
    name: String,
    cases: Vec<Box<dyn TestCase>>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>) -> Self {
        TestSuite {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_test(&mut self, case: impl TestCase + 'static) -> &mut Self {
        self.cases.push(Box::new(case));
        self
    }

    pub fn add_boxed(&mut self, case: Box<dyn TestCase>) -> &mut Self {
        self.cases.push(case);
        self
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Run every case, in insertion order, through one runner
    ///
    /// A failing case never stops the ones after it.
    pub fn run_all(&self, runner: &TestRunner) -> SuiteResults {
        info!(suite = %self.name, tests = self.cases.len(), "Running test suite");
        let mut results = SuiteResults::default();
        for case in &self.cases {
            let result = runner.run(case.as_ref());
            info!(suite = %self.name, "{}", result);
            results.insert(result);
        }
        results
    }

    pub fn summary(&self, results: &SuiteResults) -> SuiteSummary {
        let failures = results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| FailedTest {
                name: r.test_name.clone(),
                error: r
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_default(),
            })
            .collect();

        SuiteSummary {
            suite: self.name.clone(),
            total: results.len(),
            passed: results.passed(),
            failures,
        }
    }
}

/// Results keyed by test name, in run order
///
/// A later result with an existing name replaces the earlier one in place.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct SuiteResults {
    results: Vec<TestResult>,
}

impl SuiteResults {
    pub fn insert(&mut self, result: TestResult) {
        match self
            .results
            .iter_mut()
            .find(|r| r.test_name == result.test_name)
        {
            Some(existing) => *existing = result,
            None => self.results.push(result),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TestResult> {
        self.results.iter().find(|r| r.test_name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedTest {
    pub name: String,
    pub error: String,
}

/// Pass/fail counts plus the recorded error of every failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteSummary {
    pub suite: String,
    pub total: usize,
    pub passed: usize,
    pub failures: Vec<FailedTest>,
}

impl SuiteSummary {
    pub fn failed(&self) -> usize {
        self.total - self.passed
    }
}

impl fmt::Display for SuiteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);
        writeln!(f)?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Test Suite: {}", self.suite)?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Passed: {}/{}", self.passed, self.total)?;
        write!(f, "Failed: {}/{}", self.failed(), self.total)?;

        if !self.failures.is_empty() {
            write!(f, "\n\nFailed tests:")?;
            for failure in &self.failures {
                write!(f, "\n  - {}: {}", failure.name, failure.error)?;
            }
        }
        Ok(())
    }
}
