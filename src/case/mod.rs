//! Test-case description: tensors, program under test, golden computation

pub mod builtin;
pub mod golden;
pub mod program;
pub mod tensor;
pub mod test_case;

pub use builtin::{MatmulCase, TileBinaryCase};
pub use golden::{BinaryOp, GoldenComputation, GoldenStep, ParamValue, Tolerance};
pub use program::{OptimizationStrategy, Program, ProgramSource};
pub use tensor::{validate_tensor_name, validate_tensor_specs, ArrayLiteral, DataType, InitRule, InitValue, TensorSpec};
pub use test_case::TestCase;
