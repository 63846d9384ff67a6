//! Reference computation of a test case
//!
//! The golden computation never runs on the target. It is rendered into the
//! golden script and evaluated by the execution engine on the host.

use std::collections::BTreeMap;

use crate::case::tensor::TensorSpec;
use crate::error::{ForgeResult, PtoForgeError};

/// Element-wise binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    /// Lower-case name, also the PyPTO block op name
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
        }
    }
}

/// One statement of the reference computation
#[derive(Debug, Clone, PartialEq)]
pub enum GoldenStep {
    /// `out = lhs <op> rhs`
    Binary {
        op: BinaryOp,
        lhs: String,
        rhs: String,
        out: String,
    },
    /// `out = lhs @ rhs`
    Matmul {
        lhs: String,
        rhs: String,
        out: String,
    },
    /// `dst = src`
    Copy { src: String, dst: String },
    /// Raw statements over `tensors` and `params`, emitted verbatim
    Script(String),
}

impl GoldenStep {
    pub fn binary(op: BinaryOp, lhs: &str, rhs: &str, out: &str) -> Self {
        GoldenStep::Binary {
            op,
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
            out: out.to_string(),
        }
    }

    pub fn matmul(lhs: &str, rhs: &str, out: &str) -> Self {
        GoldenStep::Matmul {
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
            out: out.to_string(),
        }
    }

    /// Tensors read by the step
    fn sources(&self) -> Vec<&str> {
        match self {
            GoldenStep::Binary { lhs, rhs, .. } | GoldenStep::Matmul { lhs, rhs, .. } => {
                vec![lhs.as_str(), rhs.as_str()]
            }
            GoldenStep::Copy { src, .. } => vec![src.as_str()],
            GoldenStep::Script(_) => Vec::new(),
        }
    }

    /// Tensor written by the step
    fn destination(&self) -> Option<&str> {
        match self {
            GoldenStep::Binary { out, .. } | GoldenStep::Matmul { out, .. } => Some(out.as_str()),
            GoldenStep::Copy { dst, .. } => Some(dst.as_str()),
            GoldenStep::Script(_) => None,
        }
    }
}

/// Scalar parameter passed to `compute_golden`
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

/// Comparison tolerance used by the execution engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance {
            rtol: 1e-5,
            atol: 1e-5,
        }
    }
}

/// Reference computation producing the expected outputs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoldenComputation {
    pub steps: Vec<GoldenStep>,
    pub params: BTreeMap<String, ParamValue>,
    pub tolerance: Tolerance,
}

impl GoldenComputation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: GoldenStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn with_tolerance(mut self, rtol: f64, atol: f64) -> Self {
        self.tolerance = Tolerance { rtol, atol };
        self
    }

    /// Check the computation against the declared tensors
    pub fn validate(&self, specs: &[TensorSpec]) -> ForgeResult<()> {
        if self.steps.is_empty() {
            return Err(PtoForgeError::InvalidGolden(
                "golden computation has no steps".to_string(),
            ));
        }

        let find = |name: &str| specs.iter().find(|s| s.name == name);

        for step in &self.steps {
            for src in step.sources() {
                if find(src).is_none() {
                    return Err(PtoForgeError::InvalidGolden(format!(
                        "step reads unknown tensor '{}'",
                        src
                    )));
                }
            }
            if let Some(dst) = step.destination() {
                match find(dst) {
                    None => {
                        return Err(PtoForgeError::InvalidGolden(format!(
                            "step writes unknown tensor '{}'",
                            dst
                        )))
                    }
                    Some(spec) if !spec.is_output => {
                        return Err(PtoForgeError::InvalidGolden(format!(
                            "step writes input tensor '{}'",
                            dst
                        )))
                    }
                    Some(_) => {}
                }
            }
            if let GoldenStep::Matmul { lhs, rhs, out } = step {
                if let (Some(l), Some(r), Some(o)) = (find(lhs), find(rhs), find(out)) {
                    check_matmul_shapes(l, r, o)?;
                }
            }
        }
        Ok(())
    }
}

/// `lhs[m, k] @ rhs[k, n] -> out[m, n]`
fn check_matmul_shapes(lhs: &TensorSpec, rhs: &TensorSpec, out: &TensorSpec) -> ForgeResult<()> {
    let compatible = match (lhs.shape.as_slice(), rhs.shape.as_slice(), out.shape.as_slice()) {
        ([m, k], [k2, n], [m2, n2]) => k == k2 && m == m2 && n == n2,
        _ => false,
    };
    if compatible {
        Ok(())
    } else {
        Err(PtoForgeError::InvalidGolden(format!(
            "matmul {:?} @ {:?} -> {:?} has incompatible shapes",
            lhs.shape, rhs.shape, out.shape
        )))
    }
}
