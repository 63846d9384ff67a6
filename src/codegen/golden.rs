//! Golden reference script (`golden.py`)
//!
//! The script is self-contained apart from numpy: the execution engine calls
//! `generate_inputs(params)` to materialize every tensor, runs the kernels,
//! calls `compute_golden(tensors, params)` on a copy and compares the
//! `__outputs__` tensors with `RTOL`/`ATOL`.
//!
//! Large literal arrays are not inlined. They go to little-endian f64
//! sidecar files in `golden_data/` next to the script.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::case::golden::{GoldenComputation, GoldenStep};
use crate::case::tensor::{validate_tensor_name, ArrayLiteral, InitRule, InitValue, TensorSpec};
use crate::codegen::pyrepr::{py_float, py_float_list, py_param, py_shape, py_str, py_str_list};
use crate::error::{io_context, ForgeResult};

pub const GOLDEN_FILE: &str = "golden.py";
pub const GOLDEN_DATA_DIR: &str = "golden_data";

/// Literal arrays above this element count go to sidecar files
pub const INLINE_ARRAY_LIMIT: usize = 1024;

/// Tensor data written next to the script
#[derive(Debug, Clone, PartialEq)]
pub struct Sidecar {
    /// Path relative to the script's directory
    pub relative_path: PathBuf,
    pub values: Vec<f64>,
}

impl Sidecar {
    fn to_le_bytes(&self) -> Vec<u8> {
        self.values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }
}

/// Rendered script plus the sidecar files it loads
#[derive(Debug, Clone, PartialEq)]
pub struct GoldenScript {
    pub text: String,
    pub sidecars: Vec<Sidecar>,
}

#[derive(Debug, Clone, Copy)]
pub struct GoldenReferenceEmitter {
    seed: u64,
}

impl GoldenReferenceEmitter {
    pub fn new(seed: u64) -> Self {
        GoldenReferenceEmitter { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Write the script to `dest` and its sidecars next to it
    pub fn write(
        &self,
        test_name: &str,
        specs: &[TensorSpec],
        golden: &GoldenComputation,
        dest: &Path,
    ) -> ForgeResult<()> {
        for spec in specs {
            validate_tensor_name(&spec.name)?;
        }
        let script = self.render(test_name, specs, golden);
        let base = dest.parent().unwrap_or_else(|| Path::new("."));

        for sidecar in &script.sidecars {
            let path = base.join(&sidecar.relative_path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| io_context(e, format!("creating {}", parent.display())))?;
            }
            std::fs::write(&path, sidecar.to_le_bytes())
                .map_err(|e| io_context(e, format!("writing {}", path.display())))?;
        }

        std::fs::write(dest, &script.text)
            .map_err(|e| io_context(e, format!("writing {}", dest.display())))?;
        debug!(
            path = %dest.display(),
            sidecars = script.sidecars.len(),
            seed = self.seed,
            "Wrote golden reference"
        );
        Ok(())
    }

    pub fn render(&self, test_name: &str, specs: &[TensorSpec], golden: &GoldenComputation) -> GoldenScript {
        let mut sidecars = Vec::new();
        let mut out = String::new();

        let _ = writeln!(out, "# Golden reference for {}", test_name);
        out.push_str("# Auto-generated; regenerate instead of editing\n");
        out.push_str("from pathlib import Path\n\n");
        out.push_str("import numpy as np\n\n");

        let _ = writeln!(out, "SEED = {}", self.seed);
        let outputs = specs.iter().filter(|s| s.is_output).map(|s| s.name.as_str());
        let _ = writeln!(out, "__outputs__ = {}", py_str_list(outputs));
        let _ = writeln!(
            out,
            "TENSOR_ORDER = {}",
            py_str_list(specs.iter().map(|s| s.name.as_str()))
        );
        let _ = writeln!(out, "RTOL = {}", py_float(golden.tolerance.rtol));
        let _ = writeln!(out, "ATOL = {}", py_float(golden.tolerance.atol));
        let params: Vec<String> = golden
            .params
            .iter()
            .map(|(k, v)| format!("{}: {}", py_str(k), py_param(v)))
            .collect();
        let _ = writeln!(out, "PARAMS_LIST = [{{{}}}]", params.join(", "));
        let _ = writeln!(
            out,
            "_DATA_DIR = Path(__file__).resolve().parent / {}\n\n",
            py_str(GOLDEN_DATA_DIR)
        );

        out.push_str("def generate_inputs(params):\n");
        out.push_str("    rng = np.random.default_rng(SEED)\n");
        out.push_str("    tensors = {}\n");
        for spec in specs {
            let expr = init_expression(spec, &mut sidecars);
            let _ = writeln!(out, "    tensors[{}] = {}", py_str(&spec.name), expr);
        }
        out.push_str("    return tensors\n\n\n");

        out.push_str("def compute_golden(tensors, params):\n");
        for step in &golden.steps {
            for line in step_lines(step) {
                let _ = writeln!(out, "    {}", line);
            }
        }
        if golden.steps.is_empty() {
            out.push_str("    pass\n");
        }

        GoldenScript { text: out, sidecars }
    }
}

fn init_expression(spec: &TensorSpec, sidecars: &mut Vec<Sidecar>) -> String {
    let shape = py_shape(&spec.shape);
    let dtype = spec.dtype.numpy_dtype();

    match &spec.init {
        None => format!("np.zeros({}, dtype={})", shape, dtype),
        Some(InitValue::Scalar(v)) => full(&shape, *v, dtype),
        Some(InitValue::Array(array)) => array_expression(spec, array, sidecars),
        Some(InitValue::Rule(rule)) => match rule {
            InitRule::RandomNormal { mean, std } => format!(
                "rng.normal({}, {}, size={}).astype({})",
                py_float(*mean),
                py_float(*std),
                shape,
                dtype
            ),
            InitRule::RandomUniform { low, high } => format!(
                "rng.uniform({}, {}, size={}).astype({})",
                py_float(*low),
                py_float(*high),
                shape,
                dtype
            ),
            InitRule::Identity => {
                let rows = spec.shape.first().copied().unwrap_or(0);
                let cols = spec.shape.get(1).copied().unwrap_or(rows);
                format!("np.eye({}, {}, dtype={})", rows, cols, dtype)
            }
            InitRule::Arange { start, step } => format!(
                "({} + {} * np.arange({}, dtype=np.float64)).reshape({}).astype({})",
                py_float(*start),
                py_float(*step),
                spec.num_elements(),
                shape,
                dtype
            ),
        },
    }
}

fn array_expression(spec: &TensorSpec, array: &ArrayLiteral, sidecars: &mut Vec<Sidecar>) -> String {
    let shape = py_shape(&spec.shape);
    let dtype = spec.dtype.numpy_dtype();

    if let Some(v) = array.uniform_value() {
        return full(&shape, v, dtype);
    }

    if array.values.len() <= INLINE_ARRAY_LIMIT {
        return format!(
            "np.array({}, dtype=np.float64).reshape({}).astype({})",
            py_float_list(&array.values),
            shape,
            dtype
        );
    }

    let relative_path = PathBuf::from(GOLDEN_DATA_DIR).join(format!("{}.bin", spec.name));
    sidecars.push(Sidecar {
        relative_path,
        values: array.values.clone(),
    });
    format!(
        "np.fromfile(_DATA_DIR / {}, dtype=\"<f8\").reshape({}).astype({})",
        py_str(&format!("{}.bin", spec.name)),
        shape,
        dtype
    )
}

fn full(shape: &str, value: f64, dtype: &str) -> String {
    format!("np.full({}, {}, dtype={})", shape, py_float(value), dtype)
}

fn tensor_ref(name: &str) -> String {
    format!("tensors[{}]", py_str(name))
}

fn step_lines(step: &GoldenStep) -> Vec<String> {
    match step {
        GoldenStep::Binary { op, lhs, rhs, out } => vec![format!(
            "{}[:] = {} {} {}",
            tensor_ref(out),
            tensor_ref(lhs),
            op.symbol(),
            tensor_ref(rhs)
        )],
        GoldenStep::Matmul { lhs, rhs, out } => vec![format!(
            "{}[:] = np.matmul({}, {})",
            tensor_ref(out),
            tensor_ref(lhs),
            tensor_ref(rhs)
        )],
        GoldenStep::Copy { src, dst } => {
            vec![format!("{}[:] = {}", tensor_ref(dst), tensor_ref(src))]
        }
        GoldenStep::Script(body) => body.lines().map(str::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::golden::{BinaryOp, ParamValue};
    use crate::case::tensor::DataType;

    fn add_specs() -> Vec<TensorSpec> {
        vec![
            TensorSpec::input("a", vec![128, 128], DataType::FP32).with_init(2.0),
            TensorSpec::input("b", vec![128, 128], DataType::FP32).with_init(InitRule::randn()),
            TensorSpec::output("c", vec![128, 128], DataType::FP32),
        ]
    }

    #[test]
    fn test_header_and_inputs() {
        let golden = GoldenComputation::new()
            .step(GoldenStep::binary(BinaryOp::Add, "a", "b", "c"))
            .with_param("alpha", ParamValue::Float(0.5));
        let script = GoldenReferenceEmitter::new(42).render("tile_add", &add_specs(), &golden);
        let text = &script.text;

        assert!(text.contains("SEED = 42\n"));
        assert!(text.contains("__outputs__ = [\"c\"]\n"));
        assert!(text.contains("TENSOR_ORDER = [\"a\", \"b\", \"c\"]\n"));
        assert!(text.contains("RTOL = 1e-5\n"));
        assert!(text.contains("PARAMS_LIST = [{\"alpha\": 0.5}]\n"));
        assert!(text.contains("rng = np.random.default_rng(SEED)"));
        assert!(text.contains("tensors[\"a\"] = np.full((128, 128), 2.0, dtype=np.float32)"));
        assert!(text.contains(
            "tensors[\"b\"] = rng.normal(0.0, 1.0, size=(128, 128)).astype(np.float32)"
        ));
        assert!(text.contains("tensors[\"c\"] = np.zeros((128, 128), dtype=np.float32)"));
        assert!(text.contains("    tensors[\"c\"][:] = tensors[\"a\"] + tensors[\"b\"]\n"));
        assert!(script.sidecars.is_empty());
    }

    #[test]
    fn test_empty_params_list() {
        let golden = GoldenComputation::new().step(GoldenStep::matmul("a", "b", "c"));
        let script = GoldenReferenceEmitter::new(0).render("mm", &add_specs(), &golden);
        assert!(script.text.contains("PARAMS_LIST = [{}]\n"));
        assert!(script.text.contains("np.matmul(tensors[\"a\"], tensors[\"b\"])"));
    }

    #[test]
    fn test_small_literal_inlined() {
        let specs = vec![
            TensorSpec::input("m", vec![2, 2], DataType::FP32).with_init(ArrayLiteral::diag(&[1.0, 2.0])),
            TensorSpec::output("o", vec![2, 2], DataType::FP32),
        ];
        let golden = GoldenComputation::new().step(GoldenStep::Copy {
            src: "m".to_string(),
            dst: "o".to_string(),
        });
        let script = GoldenReferenceEmitter::new(1).render("copy", &specs, &golden);
        assert!(script.text.contains(
            "np.array([1.0, 0.0, 0.0, 2.0], dtype=np.float64).reshape((2, 2)).astype(np.float32)"
        ));
        assert!(script.sidecars.is_empty());
    }

    #[test]
    fn test_large_literal_goes_to_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let specs = vec![
            TensorSpec::input("w", vec![64, 64], DataType::FP32).with_init(ArrayLiteral::eye(64)),
            TensorSpec::output("o", vec![64, 64], DataType::FP32),
        ];
        let golden = GoldenComputation::new().step(GoldenStep::Script(
            "tensors[\"o\"][:] = tensors[\"w\"] * 2\ntensors[\"o\"][0, 0] = 0".to_string(),
        ));
        let dest = dir.path().join(GOLDEN_FILE);
        GoldenReferenceEmitter::new(9)
            .write("eye", &specs, &golden, &dest)
            .unwrap();

        let text = std::fs::read_to_string(&dest).unwrap();
        assert!(text.contains("np.fromfile(_DATA_DIR / \"w.bin\", dtype=\"<f8\").reshape((64, 64))"));
        assert!(text.contains("    tensors[\"o\"][0, 0] = 0\n"));

        let bytes = std::fs::read(dir.path().join(GOLDEN_DATA_DIR).join("w.bin")).unwrap();
        assert_eq!(bytes.len(), 64 * 64 * 8);
        assert_eq!(f64::from_le_bytes(bytes[0..8].try_into().unwrap()), 1.0);
        assert_eq!(f64::from_le_bytes(bytes[8..16].try_into().unwrap()), 0.0);
    }

    #[test]
    fn test_sidecar_name_cannot_escape_work_dir() {
        let root = tempfile::tempdir().unwrap();
        let work = root.path().join("a").join("b");
        std::fs::create_dir_all(&work).unwrap();
        let specs = vec![
            TensorSpec::input("../../escaped", vec![64, 64], DataType::FP32)
                .with_init(ArrayLiteral::eye(64)),
            TensorSpec::output("o", vec![64, 64], DataType::FP32),
        ];
        let golden = GoldenComputation::new().step(GoldenStep::Script("pass".to_string()));

        let err = GoldenReferenceEmitter::new(1)
            .write("escape", &specs, &golden, &work.join(GOLDEN_FILE))
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidTensorSpec");
        assert!(!root.path().join("a").join("escaped.bin").exists());
        assert!(!work.join(GOLDEN_FILE).exists());
    }

    #[test]
    fn test_rules_render() {
        let specs = vec![
            TensorSpec::input("i", vec![4, 4], DataType::FP16).with_init(InitRule::Identity),
            TensorSpec::input("r", vec![8], DataType::INT32)
                .with_init(InitRule::Arange { start: 1.0, step: 2.0 }),
            TensorSpec::input("u", vec![8], DataType::FP32)
                .with_init(InitRule::RandomUniform { low: -1.0, high: 1.0 }),
            TensorSpec::output("o", vec![4, 4], DataType::FP16),
        ];
        let golden = GoldenComputation::new().step(GoldenStep::Copy {
            src: "i".to_string(),
            dst: "o".to_string(),
        });
        let text = GoldenReferenceEmitter::new(3).render("rules", &specs, &golden).text;
        assert!(text.contains("np.eye(4, 4, dtype=np.float16)"));
        assert!(text.contains("(1.0 + 2.0 * np.arange(8, dtype=np.float64)).reshape((8,)).astype(np.int32)"));
        assert!(text.contains("rng.uniform(-1.0, 1.0, size=(8,)).astype(np.float32)"));
    }
}
