use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::warn;
use pto_forge::case::{MatmulCase, TileBinaryCase};
use pto_forge::codegen::GOLDEN_FILE;
use pto_forge::logging::{init_with_config, LogLevel, LoggingConfig};
use pto_forge::runtime::{CodeRunnerEngine, ExecutionEngine, ExecutionRequest};
use pto_forge::{
    Environment, OptimizationStrategy, Platform, SessionContext, TestConfig, TestRunner, TestSuite,
};

#[derive(Parser, Debug)]
#[command(name = "pto-forge", version)]
#[command(about = "Generate, assemble and run PTO kernel tests", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the built-in tile and matmul test cases
    Suite {
        /// Target platform
        #[arg(long, default_value = "a2a3sim")]
        platform: Platform,
        /// Device ID for hardware runs
        #[arg(long, default_value_t = 0)]
        device: u32,
        /// Optimization strategy for the PyPTO pass pipeline
        #[arg(long, default_value = "Default")]
        strategy: OptimizationStrategy,
        /// Keep every work directory
        #[arg(long)]
        save_kernels: bool,
        /// Parent of saved work directories (default: build/outputs/output_<timestamp>/)
        #[arg(long)]
        kernels_dir: Option<PathBuf>,
        /// Dump intermediate IR after each pass
        #[arg(long)]
        dump_passes: bool,
        /// Only generate code, skip execution
        #[arg(long)]
        codegen_only: bool,
        /// Seed for random tensor initialization (default: random)
        #[arg(long)]
        seed: Option<u64>,
        /// Tile shape as ROWSxCOLS; repeatable
        #[arg(long = "shape", value_parser = parse_shape, default_values = ["64x64", "128x128"])]
        shapes: Vec<(usize, usize)>,
        /// Write the results as JSON to this file
        #[arg(long)]
        json_report: Option<PathBuf>,
    },
    /// Re-run the execution engine on a saved work directory
    Run {
        /// Saved work directory (contains kernel_config.py and golden.py)
        #[arg(long)]
        test_dir: PathBuf,
        /// Target platform
        #[arg(long, default_value = "a2a3sim")]
        platform: Platform,
        /// Device ID for hardware runs
        #[arg(long, default_value_t = 0)]
        device_id: u32,
    },
}

fn parse_shape(s: &str) -> Result<(usize, usize), String> {
    let (rows, cols) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected ROWSxCOLS, got '{}'", s))?;
    let rows = rows.trim().parse::<usize>().map_err(|e| format!("rows: {}", e))?;
    let cols = cols.trim().parse::<usize>().map_err(|e| format!("cols: {}", e))?;
    if rows == 0 || cols == 0 {
        return Err("dimensions must be positive".to_string());
    }
    Ok((rows, cols))
}

/// Tile add and mul for every shape, matmul for the square ones
fn builtin_suite(shapes: &[(usize, usize)], strategy: OptimizationStrategy) -> TestSuite {
    let mut suite = TestSuite::new("pto-forge builtin");
    for &(rows, cols) in shapes {
        suite.add_test(TileBinaryCase::add(rows, cols).with_strategy(strategy));
        suite.add_test(TileBinaryCase::mul(rows, cols).with_strategy(strategy));
        let matmul = MatmulCase::new(rows, cols);
        if matmul.is_square() {
            suite.add_test(matmul);
        } else {
            warn!(rows, cols, "Skipping matmul case for non-square shape");
        }
    }
    suite
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_with_config(&LoggingConfig::from_env(LogLevel::from_verbosity(cli.verbose)));

    let env = Environment::from_env();
    match cli.command {
        Commands::Suite {
            platform,
            device,
            strategy,
            save_kernels,
            kernels_dir,
            dump_passes,
            codegen_only,
            seed,
            shapes,
            json_report,
        } => {
            let mut config = TestConfig::new()
                .with_platform(platform)
                .with_device_id(device)
                .with_save_kernels(save_kernels)
                .with_dump_passes(dump_passes)
                .with_codegen_only(codegen_only);
            if save_kernels {
                if let Some(dir) = kernels_dir {
                    config = config.with_save_kernels_dir(dir);
                }
            }
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }

            let session = Arc::new(SessionContext::from_environment(&env));
            if config.save_kernels && config.save_kernels_dir.is_none() {
                let dir = session
                    .session_dir()
                    .context("creating session output directory")?;
                println!("Saving work directories under {}", dir.display());
            }

            let runner = TestRunner::from_environment(config, session, &env)?;
            let suite = builtin_suite(&shapes, strategy);

            let results = suite.run_all(&runner);
            for result in results.iter() {
                println!("{}", result);
            }
            let summary = suite.summary(&results);
            println!("{}", summary);
            println!("Seed: {}", runner.seed());

            if let Some(path) = json_report {
                let json = serde_json::to_string_pretty(&results)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("writing {}", path.display()))?;
            }

            Ok(if results.all_passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Run {
            test_dir,
            platform,
            device_id,
        } => run_saved(&env, test_dir, platform, device_id),
    }
}

fn run_saved(
    env: &Environment,
    test_dir: PathBuf,
    platform: Platform,
    device_id: u32,
) -> anyhow::Result<ExitCode> {
    if !test_dir.is_dir() {
        anyhow::bail!("Test directory not found: {}", test_dir.display());
    }
    let golden_path = test_dir.join(GOLDEN_FILE);
    if !golden_path.is_file() {
        anyhow::bail!("Golden script not found: {}", golden_path.display());
    }

    let engine = CodeRunnerEngine::from_environment(env)?;
    let rule = "=".repeat(60);
    let name = test_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    println!("\n{}", rule);
    println!("Running test: {}", name);
    println!("Platform: {}", platform);
    println!("Device ID: {}", device_id);
    println!("{}\n", rule);

    let request = ExecutionRequest {
        work_dir: test_dir,
        golden_path,
        platform,
        device_id,
    };
    match engine.execute(&request) {
        Ok(()) => {
            println!("\n{}", rule);
            println!("Test PASSED");
            println!("{}\n", rule);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            println!("\n{}", rule);
            println!("Test FAILED");
            println!("Error: {}", err);
            println!("{}\n", rule);
            Ok(ExitCode::FAILURE)
        }
    }
}
