//! Pipeline controller
//!
//! [`TestRunner::run`] takes one test case through code generation,
//! orchestration resolution, golden emission and execution. It never
//! returns an error and never unwinds: every failure, including a panic
//! inside a collaborator, ends up in the returned [`TestResult`].
//!
//! Work directory layout:
//!
//! ```text
//! kernels/{aiv,aic}/*.cpp      code generator output
//! orchestration/*.cpp          generated or fallback orchestration
//! kernel_config.py             execution descriptor
//! golden.py (+ golden_data/)   reference script
//! ```

use std::any::Any;
use std::path::Path;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, info_span, warn};

use crate::artifacts::{
    assign_func_ids, KernelArtifact, OrchestrationArtifact, OrchestrationKind, OrchestrationPlan,
};
use crate::case::tensor::{validate_tensor_specs, TensorSpec};
use crate::case::TestCase;
use crate::codegen::{
    CodeGenerator, CodegenRequest, ConfigDescriptorWriter, GoldenReferenceEmitter,
    OrchestrationFallbackGenerator, PyptoCodeGenerator, FALLBACK_ENTRY_POINT,
    FALLBACK_ORCHESTRATION_PATH, GOLDEN_DATA_DIR, GOLDEN_FILE, KERNELS_DIR, KERNEL_CONFIG_FILE,
    ORCHESTRATION_DIR, PROGRAM_DIR,
};
use crate::config::TestConfig;
use crate::environment::Environment;
use crate::error::{io_context, ForgeResult, PtoForgeError};
use crate::result::{TestError, TestResult};
use crate::runtime::{CodeRunnerEngine, ExecutionEngine, ExecutionRequest};
use crate::session::SessionContext;
use crate::workdir::{validate_test_name, WorkDir};

/// Work-directory entries written by the pipeline and its code generator
const PIPELINE_OUTPUTS: [&str; 6] = [
    KERNELS_DIR,
    ORCHESTRATION_DIR,
    KERNEL_CONFIG_FILE,
    GOLDEN_FILE,
    GOLDEN_DATA_DIR,
    PROGRAM_DIR,
];

/// Progress of one run, copied into its result
#[derive(Debug, Default)]
struct RunReport {
    kernel_count: usize,
    orchestration: Option<OrchestrationKind>,
    executed: bool,
}

pub struct TestRunner {
    config: TestConfig,
    session: Arc<SessionContext>,
    generator: Box<dyn CodeGenerator>,
    engine: Box<dyn ExecutionEngine>,
    seed: u64,
}

impl TestRunner {
    /// Runner over explicit collaborators
    pub fn new(
        config: TestConfig,
        session: Arc<SessionContext>,
        generator: Box<dyn CodeGenerator>,
        engine: Box<dyn ExecutionEngine>,
    ) -> Self {
        let seed = match config.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random::<u64>();
                info!(seed, "No seed configured, drew one for this runner");
                seed
            }
        };

        TestRunner {
            config,
            session,
            generator,
            engine,
            seed,
        }
    }

    /// Runner over PyPTO and simpler located through `env`
    ///
    /// Fails when PyPTO cannot be found, or simpler unless `codegen_only`.
    pub fn from_environment(
        config: TestConfig,
        session: Arc<SessionContext>,
        env: &Environment,
    ) -> ForgeResult<Self> {
        let generator = PyptoCodeGenerator::from_environment(env)?;
        let engine = if config.codegen_only {
            CodeRunnerEngine::unchecked(env)?
        } else {
            CodeRunnerEngine::from_environment(env)?
        };
        Ok(Self::new(config, session, Box::new(generator), Box::new(engine)))
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Seed written into every golden script of this runner
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Run one test case to a result
    pub fn run(&self, case: &dyn TestCase) -> TestResult {
        let start = Instant::now();
        let test_name = catch_unwind(AssertUnwindSafe(|| case.name()))
            .unwrap_or_else(|payload| format!("<unnamed: {}>", panic_message(payload.as_ref())));

        let span = info_span!("test_case", name = %test_name);
        let _enter = span.enter();
        info!("Running test case");

        let mut report = RunReport::default();
        let mut retained = None;

        let (failure, cleanup_failure) = match self.resolve_work_dir(&test_name) {
            Err(err) => (Some(err), None),
            Ok(work_dir) => {
                retained = work_dir.retained_path();
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    self.execute_pipeline(case, &test_name, work_dir.path(), &mut report)
                }))
                .unwrap_or_else(|payload| {
                    Err(PtoForgeError::Panicked(panic_message(payload.as_ref())))
                });
                (outcome.err(), work_dir.finish().err())
            }
        };

        let error = merge_failures(failure, cleanup_failure);

        let execution_time = start.elapsed();
        match &error {
            None => info!(elapsed_ms = execution_time.as_millis() as u64, "Test passed"),
            Some(test_error) => error!(
                elapsed_ms = execution_time.as_millis() as u64,
                category = %test_error.category,
                error = %test_error,
                "Test failed"
            ),
        }

        TestResult {
            passed: error.is_none(),
            test_name,
            execution_time,
            error,
            kernel_count: report.kernel_count,
            orchestration: report.orchestration,
            executed: report.executed,
            seed: self.seed,
            work_dir: retained,
        }
    }

    /// Persistent `<save dir or session dir>/<test_name>` or a fresh temp dir
    ///
    /// A reused persistent directory is stripped of the previous run's
    /// outputs so code generation starts from an empty layout.
    fn resolve_work_dir(&self, test_name: &str) -> ForgeResult<WorkDir> {
        validate_test_name(test_name)?;
        if !self.config.save_kernels {
            return WorkDir::ephemeral(test_name);
        }

        let parent = match &self.config.save_kernels_dir {
            Some(dir) => dir.clone(),
            None => self.session.session_dir()?.to_path_buf(),
        };
        let work_dir = WorkDir::persistent(parent.join(test_name))?;
        work_dir.clear_outputs(&PIPELINE_OUTPUTS)?;
        Ok(work_dir)
    }

    fn execute_pipeline(
        &self,
        case: &dyn TestCase,
        test_name: &str,
        work_dir: &Path,
        report: &mut RunReport,
    ) -> ForgeResult<()> {
        let program = case
            .program()
            .ok_or_else(|| PtoForgeError::MissingProgram(test_name.to_string()))?;
        let specs = case.tensor_specs();
        validate_tensor_specs(&specs)?;
        let golden = case.golden();
        golden.validate(&specs)?;

        let request = CodegenRequest {
            program,
            output_dir: work_dir.to_path_buf(),
            strategy: case.strategy(),
            dump_passes: self.config.dump_passes,
        };
        info!(strategy = %request.strategy, work_dir = %work_dir.display(), "Generating code");
        let output = self
            .generator
            .generate(&request)
            .map_err(|source| PtoForgeError::Codegen {
                test_name: test_name.to_string(),
                source: Box::new(source),
            })?;

        if output.kernels.is_empty() {
            return Err(PtoForgeError::NoKernelsGenerated(test_name.to_string()));
        }
        report.kernel_count = output.kernels.len();

        let plan = OrchestrationPlan::from(output);
        report.orchestration = Some(plan.kind());
        let orchestration = resolve_orchestration(plan, &specs, work_dir)?;

        let golden_path = work_dir.join(GOLDEN_FILE);
        GoldenReferenceEmitter::new(self.seed).write(test_name, &specs, &golden, &golden_path)?;

        if self.config.codegen_only {
            info!("Codegen-only run, skipping execution");
            return Ok(());
        }

        for artifact in [
            orchestration.source.clone(),
            work_dir.join(KERNEL_CONFIG_FILE),
            golden_path.clone(),
        ] {
            if !artifact.exists() {
                return Err(PtoForgeError::MissingArtifact(artifact));
            }
        }

        let request = ExecutionRequest {
            work_dir: work_dir.to_path_buf(),
            golden_path,
            platform: self.config.platform,
            device_id: self.config.device_id,
        };
        report.executed = true;
        self.engine
            .execute(&request)
            .map_err(|source| PtoForgeError::Execution {
                test_name: test_name.to_string(),
                source: Box::new(source),
            })
    }
}

/// Adopt generated orchestration or synthesize the fallback
fn resolve_orchestration(
    plan: OrchestrationPlan,
    specs: &[TensorSpec],
    work_dir: &Path,
) -> ForgeResult<OrchestrationArtifact> {
    match plan {
        OrchestrationPlan::Generated {
            mut kernels,
            orchestration,
        } => {
            info!(
                source = %orchestration.source.display(),
                entry_point = %orchestration.function_name,
                "Adopting generated orchestration"
            );
            if !work_dir.join(KERNEL_CONFIG_FILE).exists() {
                if kernels.iter().any(|k| k.func_id.is_none()) {
                    assign_func_ids(&mut kernels);
                }
                write_descriptor(work_dir, &kernels, &orchestration)?;
            }
            Ok(orchestration)
        }
        OrchestrationPlan::NeedsFallback { mut kernels } => {
            assign_func_ids(&mut kernels);
            let source = OrchestrationFallbackGenerator::generate(specs, &kernels);

            let path = work_dir.join(FALLBACK_ORCHESTRATION_PATH);
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .map_err(|e| io_context(e, format!("creating {}", dir.display())))?;
            }
            std::fs::write(&path, source)
                .map_err(|e| io_context(e, format!("writing {}", path.display())))?;
            info!(path = %path.display(), kernels = kernels.len(), "Wrote fallback orchestration");

            let orchestration = OrchestrationArtifact {
                source: path,
                function_name: FALLBACK_ENTRY_POINT.to_string(),
            };
            write_descriptor(work_dir, &kernels, &orchestration)?;
            Ok(orchestration)
        }
    }
}

/// Fold the pipeline outcome and the cleanup outcome into one error
///
/// A cleanup failure fails an otherwise passing run; after a pipeline
/// failure it is appended to that failure's causes.
fn merge_failures(
    failure: Option<PtoForgeError>,
    cleanup_failure: Option<PtoForgeError>,
) -> Option<TestError> {
    match (failure, cleanup_failure) {
        (None, None) => None,
        (Some(err), None) => Some(TestError::from_error(&err)),
        (None, Some(cleanup_err)) => Some(TestError::from_error(&cleanup_err)),
        (Some(err), Some(cleanup_err)) => {
            warn!(error = %cleanup_err, "Work directory cleanup failed after test failure");
            let mut test_error = TestError::from_error(&err);
            test_error.push_cause(&cleanup_err);
            Some(test_error)
        }
    }
}

fn write_descriptor(
    work_dir: &Path,
    kernels: &[KernelArtifact],
    orchestration: &OrchestrationArtifact,
) -> ForgeResult<()> {
    let path = ConfigDescriptorWriter::write(
        work_dir,
        kernels,
        &orchestration.source,
        &orchestration.function_name,
    )?;
    debug!(path = %path.display(), "Execution descriptor ready");
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
