//! simpler's `CodeRunner` as the execution engine

use tracing::info;

use crate::environment::Environment;
use crate::error::ForgeResult;
use crate::runtime::{ExecutionEngine, ExecutionRequest};
use crate::tool::PythonTool;

const DRIVER: &str = r#"
import sys

from code_runner import CodeRunner

kernels_dir, golden_path, platform, device_id = sys.argv[1:5]
CodeRunner(
    kernels_dir=kernels_dir,
    golden_path=golden_path,
    platform=platform,
    device_id=int(device_id),
).run()
"#;

#[derive(Debug, Clone)]
pub struct CodeRunnerEngine {
    tool: PythonTool,
}

impl CodeRunnerEngine {
    pub fn new(tool: PythonTool) -> Self {
        CodeRunnerEngine { tool }
    }

    /// Requires a locatable simpler checkout
    pub fn from_environment(env: &Environment) -> ForgeResult<Self> {
        env.require_simpler_root()?;
        Self::unchecked(env)
    }

    /// Engine that fails only when invoked; used in codegen-only runs
    pub fn unchecked(env: &Environment) -> ForgeResult<Self> {
        Ok(Self::new(PythonTool::new("code_runner", &env.python, env.python_path()?)))
    }
}

impl ExecutionEngine for CodeRunnerEngine {
    fn execute(&self, request: &ExecutionRequest) -> ForgeResult<()> {
        info!(
            work_dir = %request.work_dir.display(),
            platform = %request.platform,
            device_id = request.device_id,
            "Running CodeRunner"
        );
        let cmd = self.tool.build_command(
            DRIVER,
            [
                request.work_dir.clone().into_os_string(),
                request.golden_path.clone().into_os_string(),
                request.platform.as_str().into(),
                request.device_id.to_string().into(),
            ],
        );
        self.tool.run(cmd)?;
        Ok(())
    }
}
