//! Running the Python-side tools as subprocesses

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::Instant;

use tracing::{debug, warn};

use crate::error::{ForgeResult, PtoForgeError};

/// Lines of stderr kept in a `ToolExited` error
const STDERR_TAIL_LINES: usize = 20;

/// Interpreter plus the `PYTHONPATH` handed to every driver script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonTool {
    /// Short name used in logs and errors
    pub name: &'static str,
    pub python: PathBuf,
    pub python_path: OsString,
}

impl PythonTool {
    pub fn new(name: &'static str, python: impl Into<PathBuf>, python_path: impl Into<OsString>) -> Self {
        PythonTool {
            name,
            python: python.into(),
            python_path: python_path.into(),
        }
    }

    /// `python -c <driver> <args...>` with `PYTHONPATH` set
    pub fn build_command<I, S>(&self, driver: &str, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut cmd = Command::new(&self.python);
        cmd.arg("-c").arg(driver);
        for arg in args {
            cmd.arg(arg.into());
        }
        cmd.env("PYTHONPATH", &self.python_path);
        cmd
    }

    /// Run to completion; non-zero exit becomes `ToolExited`
    pub fn run(&self, mut cmd: Command) -> ForgeResult<Output> {
        debug!(tool = self.name, command = ?cmd, "Launching tool");
        let start = Instant::now();
        let output = cmd.output().map_err(|source| PtoForgeError::ToolLaunch {
            tool: self.name.to_string(),
            source,
        })?;
        let elapsed = start.elapsed();

        if !output.status.success() {
            let stderr = stderr_tail(&output.stderr, STDERR_TAIL_LINES);
            warn!(tool = self.name, status = %output.status, elapsed_ms = elapsed.as_millis() as u64, "Tool failed");
            return Err(PtoForgeError::ToolExited {
                tool: self.name.to_string(),
                status: output.status.to_string(),
                stderr,
            });
        }

        debug!(tool = self.name, elapsed_ms = elapsed.as_millis() as u64, "Tool finished");
        Ok(output)
    }
}

/// Last `max_lines` non-empty lines of a captured stream
pub fn stderr_tail(bytes: &[u8], max_lines: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
