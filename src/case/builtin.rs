//! Ready-made test cases for tile-level operations
//!
//! Each case renders its own PyPTO program. PyPTO requires compile-time
//! constant shapes in type annotations, so the dimensions are substituted
//! into the program text.

use crate::case::golden::{BinaryOp, GoldenComputation, GoldenStep};
use crate::case::program::{OptimizationStrategy, Program};
use crate::case::tensor::{DataType, InitRule, InitValue, TensorSpec};
use crate::case::test_case::TestCase;

/// Element-wise binary operation over two `rows x cols` FP32 tiles
#[derive(Debug, Clone)]
pub struct TileBinaryCase {
    pub op: BinaryOp,
    pub rows: usize,
    pub cols: usize,
    pub strategy: OptimizationStrategy,
    pub lhs_init: InitValue,
    pub rhs_init: InitValue,
}

impl TileBinaryCase {
    pub fn new(op: BinaryOp, rows: usize, cols: usize) -> Self {
        TileBinaryCase {
            op,
            rows,
            cols,
            strategy: OptimizationStrategy::Default,
            lhs_init: InitValue::Scalar(2.0),
            rhs_init: InitValue::Scalar(3.0),
        }
    }

    pub fn add(rows: usize, cols: usize) -> Self {
        Self::new(BinaryOp::Add, rows, cols)
    }

    /// Multiplication with a random left operand
    pub fn mul(rows: usize, cols: usize) -> Self {
        Self::new(BinaryOp::Mul, rows, cols).with_lhs_init(InitRule::randn())
    }

    pub fn with_strategy(mut self, strategy: OptimizationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_lhs_init(mut self, init: impl Into<InitValue>) -> Self {
        self.lhs_init = init.into();
        self
    }

    pub fn with_rhs_init(mut self, init: impl Into<InitValue>) -> Self {
        self.rhs_init = init.into();
        self
    }

    fn program_source(&self) -> String {
        let (r, c) = (self.rows, self.cols);
        let op = self.op.name();
        let tensor = format!("pl.Tensor[[{r}, {c}], pl.FP32]");
        format!(
            r#"import pypto.language as pl


@pl.program
class Tile{class}Program:
    @pl.function
    def tile_{op}(
        self,
        a: {tensor},
        b: {tensor},
        c: {tensor},
    ) -> {tensor}:
        tile_a = pl.op.block.load(a, 0, 0, {r}, {c})
        tile_b = pl.op.block.load(b, 0, 0, {r}, {c})
        tile_c = pl.op.block.{op}(tile_a, tile_b)
        out_c = pl.op.block.store(tile_c, 0, 0, {r}, {c}, c)
        return out_c

    @pl.function(type=pl.FunctionType.Orchestration)
    def orchestrator(self, a: {tensor}, b: {tensor}) -> {tensor}:
        out_c = self.tile_{op}(a, b)
        return out_c
"#,
            class = capitalize(op),
        )
    }
}

impl TestCase for TileBinaryCase {
    fn name(&self) -> String {
        match self.strategy {
            OptimizationStrategy::Default => {
                format!("tile_{}_{}x{}", self.op.name(), self.rows, self.cols)
            }
            OptimizationStrategy::Ptoas => {
                format!("tile_{}_ptoas_{}x{}", self.op.name(), self.rows, self.cols)
            }
        }
    }

    fn tensor_specs(&self) -> Vec<TensorSpec> {
        let shape = vec![self.rows, self.cols];
        vec![
            TensorSpec::input("a", shape.clone(), DataType::FP32).with_init(self.lhs_init.clone()),
            TensorSpec::input("b", shape.clone(), DataType::FP32).with_init(self.rhs_init.clone()),
            TensorSpec::output("c", shape, DataType::FP32),
        ]
    }

    fn program(&self) -> Option<Program> {
        Some(Program::inline(
            self.program_source(),
            format!("Tile{}Program", capitalize(self.op.name())),
        ))
    }

    fn golden(&self) -> GoldenComputation {
        GoldenComputation::new().step(GoldenStep::binary(self.op, "a", "b", "c"))
    }

    fn strategy(&self) -> OptimizationStrategy {
        self.strategy
    }
}

/// Cube-unit matrix multiplication of two `rows x cols` FP32 matrices
///
/// The loaded tiles share one shape, so only square shapes are
/// well-formed; `is_square` lets callers skip the rest.
#[derive(Debug, Clone)]
pub struct MatmulCase {
    pub rows: usize,
    pub cols: usize,
}

impl MatmulCase {
    pub fn new(rows: usize, cols: usize) -> Self {
        MatmulCase { rows, cols }
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }
}

impl TestCase for MatmulCase {
    fn name(&self) -> String {
        format!("matmul_{}x{}", self.rows, self.cols)
    }

    fn tensor_specs(&self) -> Vec<TensorSpec> {
        let shape = vec![self.rows, self.cols];
        vec![
            TensorSpec::input("a", shape.clone(), DataType::FP32).with_init(2.0),
            TensorSpec::input("b", shape.clone(), DataType::FP32).with_init(3.0),
            TensorSpec::output("c", shape, DataType::FP32),
        ]
    }

    fn program(&self) -> Option<Program> {
        let (r, c) = (self.rows, self.cols);
        let tensor = format!("pl.Tensor[[{r}, {c}], pl.FP32]");
        // Memory spaces: 2 = L1, 3 = L0A, 4 = L0B
        let source = format!(
            r#"import pypto.language as pl


@pl.program
class MatmulProgram:
    @pl.function(type=pl.FunctionType.InCore)
    def matmul(
        self,
        a: {tensor},
        b: {tensor},
        c: {tensor},
    ) -> {tensor}:
        tile_a_l1 = pl.op.block.load(a, 0, 0, {r}, {c}, target_memory=2)
        tile_b_l1 = pl.op.block.load(b, 0, 0, {r}, {c}, target_memory=2)
        tile_a_l0a = pl.op.block.move(tile_a_l1, target_memory=3)
        tile_b_l0b = pl.op.block.move(tile_b_l1, target_memory=4)
        tile_c_l0c = pl.op.block.matmul(tile_a_l0a, tile_b_l0b)
        out_c = pl.op.block.l0c_store(tile_c_l0c, 0, 0, {r}, {c}, c)
        return out_c

    @pl.function(type=pl.FunctionType.Orchestration)
    def orchestrator(self, a: {tensor}, b: {tensor}) -> {tensor}:
        out_c = self.matmul(a, b)
        return out_c
"#
        );
        Some(Program::inline(source, "MatmulProgram"))
    }

    fn golden(&self) -> GoldenComputation {
        GoldenComputation::new().step(GoldenStep::matmul("a", "b", "c"))
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::program::ProgramSource;
    use crate::case::tensor::validate_tensor_specs;

    #[test]
    fn test_tile_add_case() {
        let case = TileBinaryCase::add(128, 128);
        assert_eq!(case.name(), "tile_add_128x128");
        assert!(validate_tensor_specs(&case.tensor_specs()).is_ok());
        assert!(case.golden().validate(&case.tensor_specs()).is_ok());

        let program = case.program().unwrap();
        assert_eq!(program.symbol, "TileAddProgram");
        match program.source {
            ProgramSource::Inline(text) => {
                assert!(text.contains("class TileAddProgram:"));
                assert!(text.contains("pl.op.block.add(tile_a, tile_b)"));
                assert!(text.contains("pl.Tensor[[128, 128], pl.FP32]"));
            }
            other => panic!("expected inline program, got {:?}", other),
        }
    }

    #[test]
    fn test_ptoas_name() {
        let case = TileBinaryCase::add(64, 64).with_strategy(OptimizationStrategy::Ptoas);
        assert_eq!(case.name(), "tile_add_ptoas_64x64");
        assert_eq!(case.strategy(), OptimizationStrategy::Ptoas);
    }

    #[test]
    fn test_tile_mul_uses_random_lhs() {
        let case = TileBinaryCase::mul(64, 64);
        let specs = case.tensor_specs();
        assert!(matches!(specs[0].init, Some(InitValue::Rule(rule)) if rule.is_random()));
        assert_eq!(specs[1].init, Some(InitValue::Scalar(3.0)));
    }

    #[test]
    fn test_matmul_case() {
        let case = MatmulCase::new(64, 64);
        assert_eq!(case.name(), "matmul_64x64");
        let program = case.program().unwrap();
        assert_eq!(program.symbol, "MatmulProgram");
        assert!(case.golden().validate(&case.tensor_specs()).is_ok());
    }

    #[test]
    fn test_rectangular_matmul_fails_validation() {
        let case = MatmulCase::new(64, 128);
        assert!(!case.is_square());
        let err = case.golden().validate(&case.tensor_specs()).unwrap_err();
        assert_eq!(err.kind(), "InvalidGolden");
    }
}
