//! The test-case interface implemented by test authors

use crate::case::golden::GoldenComputation;
use crate::case::program::{OptimizationStrategy, Program};
use crate::case::tensor::TensorSpec;

/// A user-authored test case
///
/// Implementations are read-only for the duration of a run; the runner calls
/// each method at most once per `run()`.
pub trait TestCase {
    /// Identity of the test, stable across runs of the same logical test
    fn name(&self) -> String;

    /// Declared tensors, inputs and outputs, in argument order
    fn tensor_specs(&self) -> Vec<TensorSpec>;

    /// Program under test; `None` is reported as a failed test
    fn program(&self) -> Option<Program>;

    /// Reference computation of the expected outputs
    fn golden(&self) -> GoldenComputation;

    fn strategy(&self) -> OptimizationStrategy {
        OptimizationStrategy::Default
    }
}
