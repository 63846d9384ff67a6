//! Execution descriptor (`kernel_config.py`)
//!
//! The descriptor tells the execution engine which kernel sources exist,
//! which core each targets, and how to call the orchestration entry point.
//! Paths inside the work directory are written relative to the descriptor's
//! own location so a persisted work directory can be moved.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::artifacts::{relative_to, KernelArtifact};
use crate::codegen::pyrepr::py_str;
use crate::error::{io_context, ForgeResult};
use crate::internal_error;

pub const KERNEL_CONFIG_FILE: &str = "kernel_config.py";

pub struct ConfigDescriptorWriter;

impl ConfigDescriptorWriter {
    /// Write `kernel_config.py` into `dir`; every kernel must carry a func_id
    pub fn write(
        dir: &Path,
        kernels: &[KernelArtifact],
        orchestration: &Path,
        entry_point: &str,
    ) -> ForgeResult<PathBuf> {
        let text = Self::render(dir, kernels, orchestration, entry_point)?;
        let path = dir.join(KERNEL_CONFIG_FILE);
        std::fs::write(&path, text)
            .map_err(|e| io_context(e, format!("writing {}", path.display())))?;
        debug!(path = %path.display(), kernels = kernels.len(), entry_point, "Wrote kernel config");
        Ok(path)
    }

    pub fn render(
        dir: &Path,
        kernels: &[KernelArtifact],
        orchestration: &Path,
        entry_point: &str,
    ) -> ForgeResult<String> {
        let mut out = String::new();
        out.push_str("# Auto-generated kernel configuration\n");
        out.push_str("from pathlib import Path\n\n");
        out.push_str("_ROOT = Path(__file__).resolve().parent\n\n\n");

        out.push_str("def _source(path):\n");
        out.push_str("    return str((_ROOT / path).resolve())\n\n\n");

        out.push_str("ORCHESTRATION = {\n");
        let _ = writeln!(out, "    \"source\": _source({}),", path_literal(orchestration, dir));
        let _ = writeln!(out, "    \"function_name\": {},", py_str(entry_point));
        out.push_str("}\n\n");

        out.push_str("KERNELS = [\n");
        for kernel in kernels {
            let func_id = kernel
                .func_id
                .ok_or_else(|| internal_error!("kernel {} has no func_id", kernel.name()))?;
            let _ = writeln!(
                out,
                "    {{\"func_id\": {}, \"name\": {}, \"source\": _source({}), \"core_type\": {}}},",
                func_id,
                py_str(&kernel.name()),
                path_literal(&kernel.source, dir),
                py_str(kernel.core_type.as_str())
            );
        }
        out.push_str("]\n");
        Ok(out)
    }
}

fn path_literal(path: &Path, base: &Path) -> String {
    let relative = relative_to(path, base);
    py_str(&relative.to_string_lossy().replace('\\', "/"))
}
