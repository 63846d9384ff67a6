//! Tensor declarations of a test case

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::error::{ForgeResult, PtoForgeError};

/// Element data type of a tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataType {
    FP32,
    FP16,
    INT32,
    INT16,
    INT8,
    UINT8,
    BOOL,
}

impl DataType {
    /// numpy dtype expression used in golden scripts
    pub fn numpy_dtype(&self) -> &'static str {
        match self {
            DataType::FP32 => "np.float32",
            DataType::FP16 => "np.float16",
            DataType::INT32 => "np.int32",
            DataType::INT16 => "np.int16",
            DataType::INT8 => "np.int8",
            DataType::UINT8 => "np.uint8",
            DataType::BOOL => "np.bool_",
        }
    }

    /// C++ element type used in orchestration sources
    pub fn cpp_type(&self) -> &'static str {
        match self {
            DataType::FP32 => "float",
            DataType::FP16 => "uint16_t",
            DataType::INT32 => "int32_t",
            DataType::INT16 => "int16_t",
            DataType::INT8 => "int8_t",
            DataType::UINT8 => "uint8_t",
            DataType::BOOL => "bool",
        }
    }

    pub fn size_bytes(&self) -> usize {
        match self {
            DataType::FP32 | DataType::INT32 => 4,
            DataType::FP16 | DataType::INT16 => 2,
            DataType::INT8 | DataType::UINT8 | DataType::BOOL => 1,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Dense literal array in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLiteral {
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

impl ArrayLiteral {
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Self {
        ArrayLiteral { shape, values }
    }

    /// `n x n` identity matrix
    pub fn eye(n: usize) -> Self {
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            values[i * n + i] = 1.0;
        }
        ArrayLiteral::new(vec![n, n], values)
    }

    /// Square matrix with `diag` on its diagonal
    pub fn diag(diag: &[f64]) -> Self {
        let n = diag.len();
        let mut values = vec![0.0; n * n];
        for (i, v) in diag.iter().enumerate() {
            values[i * n + i] = *v;
        }
        ArrayLiteral::new(vec![n, n], values)
    }

    /// The single value every element holds, if the array is constant
    pub fn uniform_value(&self) -> Option<f64> {
        let first = *self.values.first()?;
        self.values
            .iter()
            .all(|v| v.to_bits() == first.to_bits())
            .then_some(first)
    }
}

/// Shape-to-array initialization rule
///
/// Random rules are reproduced by the execution engine from the seed recorded
/// in the golden script.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitRule {
    RandomNormal { mean: f64, std: f64 },
    RandomUniform { low: f64, high: f64 },
    /// Rank-2 identity (ones on the main diagonal)
    Identity,
    /// `start + step * i` over the flattened tensor
    Arange { start: f64, step: f64 },
}

impl InitRule {
    /// Standard normal distribution
    pub fn randn() -> Self {
        InitRule::RandomNormal { mean: 0.0, std: 1.0 }
    }

    pub fn is_random(&self) -> bool {
        matches!(
            self,
            InitRule::RandomNormal { .. } | InitRule::RandomUniform { .. }
        )
    }
}

/// Source of a tensor's initial value
#[derive(Debug, Clone, PartialEq)]
pub enum InitValue {
    Scalar(f64),
    Array(ArrayLiteral),
    Rule(InitRule),
}

impl From<f64> for InitValue {
    fn from(value: f64) -> Self {
        InitValue::Scalar(value)
    }
}

impl From<ArrayLiteral> for InitValue {
    fn from(value: ArrayLiteral) -> Self {
        InitValue::Array(value)
    }
}

impl From<InitRule> for InitValue {
    fn from(value: InitRule) -> Self {
        InitValue::Rule(value)
    }
}

/// Declaration of one tensor in a test case
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSpec {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: DataType,
    pub is_output: bool,
    /// `None` means zero-initialized; always `None` for outputs
    pub init: Option<InitValue>,
}

impl TensorSpec {
    /// Input tensor, zero-initialized until `with_init` is applied
    pub fn input(name: impl Into<String>, shape: Vec<usize>, dtype: DataType) -> Self {
        TensorSpec {
            name: name.into(),
            shape,
            dtype,
            is_output: false,
            init: None,
        }
    }

    /// Output tensor, fully determined by the program under test
    pub fn output(name: impl Into<String>, shape: Vec<usize>, dtype: DataType) -> Self {
        TensorSpec {
            name: name.into(),
            shape,
            dtype,
            is_output: true,
            init: None,
        }
    }

    pub fn with_init(mut self, init: impl Into<InitValue>) -> Self {
        self.init = Some(init.into());
        self
    }

    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn size_bytes(&self) -> usize {
        self.num_elements() * self.dtype.size_bytes()
    }
}

/// Check the tensor declarations of a test case for consistency
pub fn validate_tensor_specs(specs: &[TensorSpec]) -> ForgeResult<()> {
    if specs.is_empty() {
        return Err(invalid("test case declares no tensors".to_string()));
    }

    let mut seen = HashSet::new();
    for spec in specs {
        validate_tensor_name(&spec.name)?;
        if !seen.insert(spec.name.as_str()) {
            return Err(invalid(format!("duplicate tensor name '{}'", spec.name)));
        }
        if spec.shape.is_empty() || spec.shape.contains(&0) {
            return Err(invalid(format!(
                "tensor '{}' has invalid shape {:?}",
                spec.name, spec.shape
            )));
        }
        if spec.is_output && spec.init.is_some() {
            return Err(invalid(format!(
                "output tensor '{}' must not carry an initial value",
                spec.name
            )));
        }
        match &spec.init {
            Some(InitValue::Array(array)) => {
                if array.values.len() != spec.num_elements() {
                    return Err(invalid(format!(
                        "tensor '{}' expects {} elements, literal has {}",
                        spec.name,
                        spec.num_elements(),
                        array.values.len()
                    )));
                }
            }
            Some(InitValue::Rule(InitRule::Identity)) if spec.shape.len() != 2 => {
                return Err(invalid(format!(
                    "identity init on tensor '{}' requires rank 2, got rank {}",
                    spec.name,
                    spec.shape.len()
                )));
            }
            _ => {}
        }
    }

    if !specs.iter().any(|s| s.is_output) {
        return Err(invalid("test case declares no output tensor".to_string()));
    }

    Ok(())
}

/// Tensor names become C++ identifiers and sidecar file names, so they
/// must match `[A-Za-z_][A-Za-z0-9_]*`
pub fn validate_tensor_name(name: &str) -> ForgeResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(invalid(format!(
            "tensor name '{}' is not an identifier ([A-Za-z_][A-Za-z0-9_]*)",
            name
        )))
    }
}

fn invalid(msg: String) -> PtoForgeError {
    PtoForgeError::InvalidTensorSpec(msg)
}
