//! PyPTO-backed code generator
//!
//! PyPTO is driven through a short Python driver: it loads the program
//! symbol from a module file and calls `ir.compile` with the CCE backend.
//! The compiler lays its output out as:
//!
//! ```text
//! <output_dir>/kernels/aiv/*.cpp
//! <output_dir>/kernels/aic/*.cpp
//! <output_dir>/orchestration/*.cpp     (only if the program has one)
//! <output_dir>/kernel_config.py        (only if the program has one)
//! <output_dir>/passes_dump/            (only with dump_passes)
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::artifacts::{CodegenOutput, CoreType, KernelArtifact, OrchestrationArtifact};
use crate::case::program::{Program, ProgramSource};
use crate::codegen::{CodeGenerator, CodegenRequest};
use crate::environment::Environment;
use crate::error::{io_context, ForgeResult, PtoForgeError};
use crate::tool::PythonTool;

/// Subdirectory inline programs are materialized into
pub const PROGRAM_DIR: &str = "program";
pub const KERNELS_DIR: &str = "kernels";
pub const ORCHESTRATION_DIR: &str = "orchestration";

const DRIVER: &str = r#"
import importlib.util
import sys

from pypto import ir
from pypto.ir.pass_manager import OptimizationStrategy

path, symbol, output_dir, strategy, dump = sys.argv[1:6]
spec = importlib.util.spec_from_file_location("pto_forge_program", path)
module = importlib.util.module_from_spec(spec)
spec.loader.exec_module(module)
program = getattr(module, symbol)
ir.compile(
    program,
    output_dir=output_dir,
    strategy=getattr(OptimizationStrategy, strategy),
    dump_passes=dump == "1",
    codegen=ir.CodegenBackend.CCE,
)
"#;

const RUNTIME_HEADER: &str = "#include \"runtime.h\"";
const IOSTREAM_HEADER: &str = "#include <iostream>";

#[derive(Debug, Clone)]
pub struct PyptoCodeGenerator {
    tool: PythonTool,
}

impl PyptoCodeGenerator {
    pub fn new(tool: PythonTool) -> Self {
        PyptoCodeGenerator { tool }
    }

    /// Requires a locatable PyPTO installation
    pub fn from_environment(env: &Environment) -> ForgeResult<Self> {
        let root = env.require_pypto_root()?;
        debug!(pypto_root = %root.display(), "Using PyPTO");
        Ok(Self::new(PythonTool::new("pypto", &env.python, env.python_path()?)))
    }

    /// Module file holding the program, materializing inline sources
    fn program_file(program: &Program, output_dir: &Path) -> ForgeResult<PathBuf> {
        match &program.source {
            ProgramSource::File(path) => Ok(path.clone()),
            ProgramSource::Inline(text) => {
                let dir = output_dir.join(PROGRAM_DIR);
                std::fs::create_dir_all(&dir)
                    .map_err(|e| io_context(e, format!("creating {}", dir.display())))?;
                let path = dir.join(format!("{}.py", program.symbol));
                std::fs::write(&path, text)
                    .map_err(|e| io_context(e, format!("writing {}", path.display())))?;
                Ok(path)
            }
        }
    }
}

impl CodeGenerator for PyptoCodeGenerator {
    fn generate(&self, request: &CodegenRequest) -> ForgeResult<CodegenOutput> {
        let program_file = Self::program_file(&request.program, &request.output_dir)?;
        info!(
            program = %request.program.symbol,
            strategy = %request.strategy,
            dump_passes = request.dump_passes,
            "Compiling program with PyPTO"
        );

        let cmd = self.tool.build_command(
            DRIVER,
            [
                program_file.into_os_string(),
                request.program.symbol.clone().into(),
                request.output_dir.clone().into_os_string(),
                request.strategy.as_str().into(),
                (if request.dump_passes { "1" } else { "0" }).into(),
            ],
        );
        self.tool.run(cmd)?;

        let output = collect_artifacts(&request.output_dir)?;
        if let Some(orchestration) = &output.orchestration {
            ensure_orchestration_headers(&orchestration.source)?;
        }
        Ok(output)
    }
}

/// Scan a code generator's output directory
///
/// Kernels come from `kernels/aiv` then `kernels/aic`, each sorted by file
/// name, with the core type taken from the subdirectory. The first sorted
/// `orchestration/*.cpp` becomes the orchestration, entry point
/// `Build<stem>`.
pub fn collect_artifacts(output_dir: &Path) -> ForgeResult<CodegenOutput> {
    let kernels_dir = output_dir.join(KERNELS_DIR);
    if !kernels_dir.is_dir() {
        return Err(PtoForgeError::ToolFailure(format!(
            "No kernels directory found in {}",
            output_dir.display()
        )));
    }

    let mut kernels = Vec::new();
    for core_type in CoreType::ALL {
        for source in sorted_sources(&kernels_dir.join(core_type.as_str()))? {
            kernels.push(KernelArtifact::new(source, core_type));
        }
    }

    let orchestration = sorted_sources(&output_dir.join(ORCHESTRATION_DIR))?
        .into_iter()
        .next()
        .map(|source| {
            let stem = source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            OrchestrationArtifact {
                source,
                function_name: format!("Build{}", stem),
            }
        });

    debug!(
        kernels = kernels.len(),
        orchestration = orchestration.is_some(),
        "Collected generated artifacts"
    );
    Ok(CodegenOutput {
        kernels,
        orchestration,
    })
}

/// `*.cpp` files of `dir` sorted by name; empty when `dir` is absent
fn sorted_sources(dir: &Path) -> ForgeResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries =
        std::fs::read_dir(dir).map_err(|e| io_context(e, format!("reading {}", dir.display())))?;

    let mut sources = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| io_context(e, format!("reading {}", dir.display())))?
            .path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "cpp") {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

/// Add the runtime headers to an adopted orchestration file if missing
///
/// Returns whether the file was changed.
pub fn ensure_orchestration_headers(path: &Path) -> ForgeResult<bool> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| io_context(e, format!("reading {}", path.display())))?;
    match with_orchestration_headers(&content) {
        Some(updated) => {
            std::fs::write(path, updated)
                .map_err(|e| io_context(e, format!("writing {}", path.display())))?;
            debug!(path = %path.display(), "Added runtime headers to orchestration");
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Headers go before the first line that is neither blank nor a comment
fn with_orchestration_headers(content: &str) -> Option<String> {
    let mut missing = Vec::new();
    if !content.contains(RUNTIME_HEADER) {
        missing.push(RUNTIME_HEADER);
    }
    if !content.contains(IOSTREAM_HEADER) {
        missing.push(IOSTREAM_HEADER);
    }
    if missing.is_empty() {
        return None;
    }

    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let insert_pos = lines
        .iter()
        .position(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty()
                && !trimmed.starts_with("//")
                && !trimmed.starts_with("/*")
                && !trimmed.starts_with('*')
        })
        .unwrap_or(0);

    let mut headers = missing.join("\n");
    headers.push('\n');
    if insert_pos > 0 {
        headers.push('\n');
    }

    let mut updated = String::with_capacity(content.len() + headers.len());
    for line in &lines[..insert_pos] {
        updated.push_str(line);
    }
    updated.push_str(&headers);
    for line in &lines[insert_pos..] {
        updated.push_str(line);
    }
    Some(updated)
}
