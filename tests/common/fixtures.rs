//! Test-case fixtures

use pto_forge::case::{BinaryOp, GoldenStep};
use pto_forge::{DataType, GoldenComputation, Program, TensorSpec, TestCase};

/// `c = a + b` over two FP32 tensors; the program text is never compiled
#[derive(Debug, Clone)]
pub struct AddCase {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
}

impl AddCase {
    pub fn new(rows: usize, cols: usize) -> Self {
        AddCase {
            name: format!("add_{}x{}", rows, cols),
            rows,
            cols,
        }
    }

    pub fn named(name: &str) -> Self {
        AddCase {
            name: name.to_string(),
            ..AddCase::new(16, 16)
        }
    }
}

impl TestCase for AddCase {
    fn name(&self) -> String {
        self.name.clone()
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
        Some(Program::inline("# placeholder program\n", "AddProgram"))
    }

    fn golden(&self) -> GoldenComputation {
        GoldenComputation::new().step(GoldenStep::binary(BinaryOp::Add, "a", "b", "c"))
    }
}

/// Case whose program resolves to nothing
#[derive(Debug, Clone)]
pub struct NoProgramCase;

impl TestCase for NoProgramCase {
    fn name(&self) -> String {
        "no_program".to_string()
    }

    fn tensor_specs(&self) -> Vec<TensorSpec> {
        AddCase::new(4, 4).tensor_specs()
    }

    fn program(&self) -> Option<Program> {
        None
    }

    fn golden(&self) -> GoldenComputation {
        AddCase::new(4, 4).golden()
    }
}

/// Case whose golden computation panics while being built
#[derive(Debug, Clone)]
pub struct PanickingCase;

impl TestCase for PanickingCase {
    fn name(&self) -> String {
        "panicking_case".to_string()
    }

    fn tensor_specs(&self) -> Vec<TensorSpec> {
        AddCase::new(4, 4).tensor_specs()
    }

    fn program(&self) -> Option<Program> {
        AddCase::new(4, 4).program()
    }

    fn golden(&self) -> GoldenComputation {
        panic!("golden computation exploded")
    }
}
