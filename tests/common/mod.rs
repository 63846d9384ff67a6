//! Common test utilities for pipeline testing
//!
//! The real code generator and execution engine are Python tools that are
//! not available in CI. This module provides scripted stand-ins:
//! - [`FakeGenerator`] writes kernel sources under `kernels/` (and optionally
//!   an orchestration file) and reports them through the production
//!   artifact scan
//! - [`FakeEngine`] records every request and passes, fails or panics on
//!   demand
//!
//! Both share their call logs through an `Arc<Mutex<..>>` recorder, so tests can
//! inspect them after the runner has taken ownership of the fake.
//!
//! # Usage
//!
//! ```ignore
//! let (runner, recorders) = fake_runner(TestConfig::new().with_codegen_only(true), Behaviors::default());
//! let result = runner.run(&AddCase::new(128, 128));
//! assert!(result.passed);
//! assert_eq!(recorders.engine.calls(), 0);
//! ```

#![allow(dead_code)]

// Submodules
mod fixtures;
mod tempfile_helpers;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pto_forge::codegen::{collect_artifacts, ensure_orchestration_headers};
use pto_forge::{
    CodeGenerator, CodegenOutput, CodegenRequest, CoreType, ExecutionEngine, ExecutionRequest,
    ForgeResult, OrchestrationArtifact, PtoForgeError, SessionContext, TestConfig, TestRunner,
};
pub use serial_test::serial;

pub use fixtures::{AddCase, NoProgramCase, PanickingCase};
pub use tempfile_helpers::{create_temp_dir, list_files, TempDir};

/// What the fake generator does on each call
#[derive(Debug, Clone)]
pub enum GeneratorBehavior {
    /// Write the kernels, and `orchestration/orch.cpp` when the flag is set
    Emit {
        kernels: Vec<(CoreType, &'static str)>,
        orchestration: bool,
    },
    /// Create `kernels/` but write nothing into it
    Empty,
    /// Write one kernel but report an orchestration file that was never written
    MissingOrchestration,
    Fail(&'static str),
    Panic(&'static str),
}

impl Default for GeneratorBehavior {
    fn default() -> Self {
        GeneratorBehavior::Emit {
            kernels: vec![(CoreType::Aiv, "tile_add")],
            orchestration: false,
        }
    }
}

/// What the fake engine does on each call
#[derive(Debug, Clone, Default)]
pub enum EngineBehavior {
    #[default]
    Pass,
    Fail(&'static str),
    Panic(&'static str),
    /// Fail only for work directories whose path contains the marker
    FailWhenPathContains(&'static str),
}

/// Shared view of the generator's calls
#[derive(Debug, Clone, Default)]
pub struct GeneratorRecorder {
    requests: Arc<Mutex<Vec<CodegenRequest>>>,
}

impl GeneratorRecorder {
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_output_dir(&self) -> Option<PathBuf> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|r| r.output_dir.clone())
    }

    pub fn requests(&self) -> Vec<CodegenRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// One observed engine invocation
#[derive(Debug, Clone)]
pub struct EngineCall {
    pub request: ExecutionRequest,
    /// Files the engine found in the work directory when it was called
    pub saw_descriptor: bool,
    pub saw_golden: bool,
}

#[derive(Debug, Clone, Default)]
pub struct EngineRecorder {
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl EngineRecorder {
    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn recorded(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }
}

pub struct FakeGenerator {
    behavior: GeneratorBehavior,
    recorder: GeneratorRecorder,
}

impl FakeGenerator {
    pub fn new(behavior: GeneratorBehavior) -> (Self, GeneratorRecorder) {
        let recorder = GeneratorRecorder::default();
        (
            FakeGenerator {
                behavior,
                recorder: recorder.clone(),
            },
            recorder,
        )
    }
}

impl CodeGenerator for FakeGenerator {
    fn generate(&self, request: &CodegenRequest) -> ForgeResult<CodegenOutput> {
        self.recorder.requests.lock().unwrap().push(request.clone());
        let root = &request.output_dir;

        match &self.behavior {
            GeneratorBehavior::Emit {
                kernels,
                orchestration,
            } => {
                for (core_type, name) in kernels {
                    write_file(
                        &root.join("kernels").join(core_type.as_str()).join(format!("{}.cpp", name)),
                        &format!("// kernel {}\nextern \"C\" void {}(int64_t* args) {{}}\n", name, name),
                    );
                }
                if *orchestration {
                    write_file(
                        &root.join("orchestration").join("orch.cpp"),
                        "// Generated orchestration\n\nextern \"C\" int Buildorch(Runtime* runtime, uint64_t* args, int arg_count) { return 0; }\n",
                    );
                }
            }
            GeneratorBehavior::Empty => {
                std::fs::create_dir_all(root.join("kernels")).unwrap();
            }
            GeneratorBehavior::MissingOrchestration => {
                write_file(
                    &root.join("kernels").join("aiv").join("tile_add.cpp"),
                    "// kernel tile_add\n",
                );
                let mut output = collect_artifacts(root)?;
                output.orchestration = Some(OrchestrationArtifact {
                    source: root.join("orchestration").join("lost.cpp"),
                    function_name: "Buildlost".to_string(),
                });
                return Ok(output);
            }
            GeneratorBehavior::Fail(msg) => {
                return Err(PtoForgeError::ToolExited {
                    tool: "pypto".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: msg.to_string(),
                })
            }
            GeneratorBehavior::Panic(msg) => panic!("{}", msg),
        }

        let output = collect_artifacts(root)?;
        if let Some(orchestration) = &output.orchestration {
            ensure_orchestration_headers(&orchestration.source)?;
        }
        Ok(output)
    }
}

pub struct FakeEngine {
    behavior: EngineBehavior,
    recorder: EngineRecorder,
}

impl FakeEngine {
    pub fn new(behavior: EngineBehavior) -> (Self, EngineRecorder) {
        let recorder = EngineRecorder::default();
        (
            FakeEngine {
                behavior,
                recorder: recorder.clone(),
            },
            recorder,
        )
    }
}

impl ExecutionEngine for FakeEngine {
    fn execute(&self, request: &ExecutionRequest) -> ForgeResult<()> {
        self.recorder.calls.lock().unwrap().push(EngineCall {
            request: request.clone(),
            saw_descriptor: request.work_dir.join("kernel_config.py").is_file(),
            saw_golden: request.golden_path.is_file(),
        });

        match &self.behavior {
            EngineBehavior::Pass => Ok(()),
            EngineBehavior::Fail(msg) => Err(PtoForgeError::ToolFailure(msg.to_string())),
            EngineBehavior::Panic(msg) => panic!("{}", msg),
            EngineBehavior::FailWhenPathContains(marker) => {
                if request.work_dir.to_string_lossy().contains(marker) {
                    Err(PtoForgeError::ToolFailure(format!(
                        "output mismatch in {}",
                        request.work_dir.display()
                    )))
                } else {
                    Ok(())
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Behaviors {
    pub generator: GeneratorBehavior,
    pub engine: EngineBehavior,
}

pub struct Recorders {
    pub generator: GeneratorRecorder,
    pub engine: EngineRecorder,
    /// Keeps the session output root alive for the test's duration
    pub session_root: TempDir,
}

impl Recorders {
    pub fn session_output_root(&self) -> PathBuf {
        self.session_root.path().join("build").join("outputs")
    }
}

/// Runner over fakes, with its session rooted in a fresh temp dir
pub fn fake_runner(config: TestConfig, behaviors: Behaviors) -> (TestRunner, Recorders) {
    let session_root = create_temp_dir().unwrap();
    let session = Arc::new(SessionContext::new(
        session_root.path().join("build").join("outputs"),
    ));
    let (generator, generator_recorder) = FakeGenerator::new(behaviors.generator);
    let (engine, engine_recorder) = FakeEngine::new(behaviors.engine);
    let runner = TestRunner::new(config, session, Box::new(generator), Box::new(engine));
    (
        runner,
        Recorders {
            generator: generator_recorder,
            engine: engine_recorder,
            session_root,
        },
    )
}

fn write_file(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}
