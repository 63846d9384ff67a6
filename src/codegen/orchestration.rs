//! Fallback orchestration source
//!
//! Used when the code generator emitted kernels but no orchestration
//! function. The generated function copies every input to the device,
//! registers every output for copy-back, and submits one task per kernel in
//! `func_id` order, each depending on the previous one. All kernels receive
//! every device tensor, in declaration order.
//!
//! Argument layout expected from the execution engine: the host pointers of
//! all tensors in declaration order, followed by their byte sizes in the
//! same order.

use std::fmt::Write as _;

use crate::artifacts::KernelArtifact;
use crate::case::tensor::TensorSpec;

/// Exported entry point of every fallback orchestration
pub const FALLBACK_ENTRY_POINT: &str = "build_test_graph";

/// Location of the fallback source, relative to the work directory
pub const FALLBACK_ORCHESTRATION_PATH: &str = "orchestration/orch.cpp";

pub struct OrchestrationFallbackGenerator;

impl OrchestrationFallbackGenerator {
    /// Render the orchestration source; identical inputs give identical text
    pub fn generate(specs: &[TensorSpec], kernels: &[KernelArtifact]) -> String {
        let mut ordered: Vec<(u32, &KernelArtifact)> = kernels
            .iter()
            .enumerate()
            .map(|(index, k)| (k.func_id.unwrap_or(index as u32), k))
            .collect();
        ordered.sort_by_key(|(func_id, _)| *func_id);

        let n = specs.len();
        let mut out = String::new();

        // fmt::Write into a String cannot fail
        let _ = writeln!(out, "// Auto-generated orchestration for {} kernel(s)", ordered.len());
        let _ = writeln!(out, "// Tensors: {}", tensor_summary(specs));
        out.push_str("#include \"runtime.h\"\n");
        out.push_str("#include <cstddef>\n");
        out.push_str("#include <cstdint>\n");
        out.push_str("#include <iostream>\n\n");

        out.push_str("extern \"C\" {\n\n");
        let _ = writeln!(
            out,
            "int {}(Runtime* runtime, uint64_t* args, int arg_count) {{",
            FALLBACK_ENTRY_POINT
        );
        let _ = writeln!(out, "    if (arg_count < {}) {{", 2 * n);
        let _ = writeln!(
            out,
            "        std::cerr << \"{}: expected {} args, got \" << arg_count << std::endl;",
            FALLBACK_ENTRY_POINT,
            2 * n
        );
        out.push_str("        return -1;\n    }\n\n");

        for (i, spec) in specs.iter().enumerate() {
            let _ = writeln!(
                out,
                "    void* host_{name} = reinterpret_cast<void*>(args[{i}]);",
                name = spec.name,
                i = i
            );
        }
        for (i, spec) in specs.iter().enumerate() {
            let _ = writeln!(
                out,
                "    uint64_t bytes_{name} = args[{i}];  // expected {bytes} bytes ({dtype} {shape:?})",
                name = spec.name,
                i = n + i,
                bytes = spec.size_bytes(),
                dtype = spec.dtype.cpp_type(),
                shape = spec.shape
            );
        }
        out.push('\n');

        for spec in specs {
            let name = &spec.name;
            let _ = writeln!(
                out,
                "    void* dev_{name} = runtime->host_api.device_malloc(bytes_{name});"
            );
            let _ = writeln!(out, "    if (dev_{name} == nullptr) {{");
            let _ = writeln!(
                out,
                "        std::cerr << \"device_malloc failed for {name}\" << std::endl;"
            );
            out.push_str("        return -1;\n    }\n");
            if spec.is_output {
                let _ = writeln!(
                    out,
                    "    runtime->record_tensor_pair(host_{name}, dev_{name}, bytes_{name});"
                );
            } else {
                let _ = writeln!(
                    out,
                    "    runtime->host_api.copy_to_device(dev_{name}, host_{name}, bytes_{name});"
                );
            }
        }
        out.push('\n');

        let mut previous_task: Option<String> = None;
        for (func_id, kernel) in &ordered {
            let task = format!("t{}", func_id);
            let _ = writeln!(out, "    // {} ({})", kernel.name(), kernel.core_type);
            let _ = writeln!(out, "    uint64_t args_{task}[{n}];");
            for (i, spec) in specs.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "    args_{task}[{i}] = reinterpret_cast<uint64_t>(dev_{name});",
                    name = spec.name
                );
            }
            let _ = writeln!(
                out,
                "    int {task} = runtime->add_task(args_{task}, {n}, {func_id}, {core});",
                core = kernel.core_type.cpp_enum()
            );
            if let Some(prev) = &previous_task {
                let _ = writeln!(out, "    runtime->add_successor({prev}, {task});");
            }
            out.push('\n');
            previous_task = Some(task);
        }

        out.push_str("    return 0;\n}\n\n}  // extern \"C\"\n");
        out
    }
}

fn tensor_summary(specs: &[TensorSpec]) -> String {
    let parts: Vec<String> = specs
        .iter()
        .map(|s| {
            let role = if s.is_output { "out" } else { "in" };
            format!("{}[{}]", s.name, role)
        })
        .collect();
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{assign_func_ids, CoreType};
    use crate::case::tensor::DataType;

    fn specs() -> Vec<TensorSpec> {
        vec![
            TensorSpec::input("a", vec![128, 128], DataType::FP32),
            TensorSpec::input("b", vec![128, 128], DataType::FP32),
            TensorSpec::output("c", vec![128, 128], DataType::FP32),
        ]
    }

    fn kernels() -> Vec<KernelArtifact> {
        let mut kernels = vec![
            KernelArtifact::new("/tmp/w/kernels/aiv/tile_add.cpp", CoreType::Aiv),
            KernelArtifact::new("/tmp/w/kernels/aic/tile_mm.cpp", CoreType::Aic),
        ];
        assign_func_ids(&mut kernels);
        kernels
    }

    #[test]
    fn test_fallback_structure() {
        let source = OrchestrationFallbackGenerator::generate(&specs(), &kernels());
        assert!(source.contains("int build_test_graph(Runtime* runtime, uint64_t* args, int arg_count)"));
        assert!(source.contains("if (arg_count < 6)"));
        assert!(source.contains("runtime->host_api.copy_to_device(dev_a, host_a, bytes_a);"));
        assert!(source.contains("runtime->record_tensor_pair(host_c, dev_c, bytes_c);"));
        assert!(source.contains("int t0 = runtime->add_task(args_t0, 3, 0, CoreType::AIV);"));
        assert!(source.contains("int t1 = runtime->add_task(args_t1, 3, 1, CoreType::AIC);"));
        assert!(source.contains("runtime->add_successor(t0, t1);"));
        assert!(source.contains("expected 65536 bytes"));
        // no absolute paths leak into the source
        assert!(!source.contains("/tmp/w"));
    }

    #[test]
    fn test_byte_counts_never_shadow_types() {
        let specs = vec![
            TensorSpec::input("t", vec![8], DataType::FP32),
            TensorSpec::output("out", vec![8], DataType::FP32),
        ];
        let source = OrchestrationFallbackGenerator::generate(&specs, &kernels());
        assert!(source.contains("    uint64_t bytes_t = args[2];"));
        assert!(!source.contains("static_cast<size_t>"));
        assert!(source.contains("device_malloc(bytes_out);"));
    }

    #[test]
    fn test_tasks_follow_func_id_order() {
        let mut kernels = kernels();
        kernels.swap(0, 1);
        let source = OrchestrationFallbackGenerator::generate(&specs(), &kernels);
        let t0 = source.find("int t0 =").unwrap();
        let t1 = source.find("int t1 =").unwrap();
        assert!(t0 < t1);
    }

    #[test]
    fn test_deterministic() {
        let a = OrchestrationFallbackGenerator::generate(&specs(), &kernels());
        let b = OrchestrationFallbackGenerator::generate(&specs(), &kernels());
        assert_eq!(a, b);
    }
}
