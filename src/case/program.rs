//! Program under test and optimization strategy selection

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::PtoForgeError;

/// Pass pipeline selector handed to the code generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationStrategy {
    #[default]
    Default,
    Ptoas,
}

impl OptimizationStrategy {
    /// Name of the strategy as the code generator spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationStrategy::Default => "Default",
            OptimizationStrategy::Ptoas => "PTOAS",
        }
    }
}

impl fmt::Display for OptimizationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationStrategy {
    type Err = PtoForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Default" | "default" => Ok(OptimizationStrategy::Default),
            "PTOAS" | "ptoas" => Ok(OptimizationStrategy::Ptoas),
            other => Err(PtoForgeError::InvalidConfiguration(format!(
                "unknown optimization strategy '{}' (expected Default or PTOAS)",
                other
            ))),
        }
    }
}

/// Where the front-end source of a program lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramSource {
    /// Python module on disk
    File(PathBuf),
    /// Python module text, materialized by the code generator before use
    Inline(String),
}

/// Program under test, opaque to the pipeline
///
/// `symbol` names the `@pl.program` class (or `ir.Program` value) inside the
/// source module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub symbol: String,
    pub source: ProgramSource,
}

impl Program {
    pub fn from_file(path: impl Into<PathBuf>, symbol: impl Into<String>) -> Self {
        Program {
            symbol: symbol.into(),
            source: ProgramSource::File(path.into()),
        }
    }

    pub fn inline(source: impl Into<String>, symbol: impl Into<String>) -> Self {
        Program {
            symbol: symbol.into(),
            source: ProgramSource::Inline(source.into()),
        }
    }
}
