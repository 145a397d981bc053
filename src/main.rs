use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use smt_jit::jit::{DriverConfig, run_file};

/// JIT specializer for quantifier-free SMT bit-vector/array formulas.
#[derive(Parser, Debug)]
#[command(name = "smt-jit", version, about)]
struct Cli {
    /// SMT-LIB2 input files to evaluate.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Skip the always-inliner and per-assertion optimization passes.
    #[arg(long)]
    no_opt: bool,

    /// Write the IR module before and after optimization to `--temp-dir`.
    #[arg(long)]
    save_temps: bool,

    /// Directory for `--save-temps` output.
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// Re-run every assignment `--iterations` times, resetting the arena
    /// between runs, and report only timing.
    #[arg(long)]
    benchmark: bool,

    /// Iterations per assignment under `--benchmark`.
    #[arg(long, default_value_t = 1)]
    iterations: u32,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Report output format.
    #[arg(long, value_parser = ["human", "json"], default_value = "human")]
    format: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = DriverConfig {
        no_opt: cli.no_opt,
        save_temps: cli.save_temps,
        temp_dir: cli.temp_dir.clone(),
        benchmark: cli.benchmark,
        iterations: cli.iterations,
    };

    let mut exit_code = 0;
    for path in &cli.inputs {
        match run_file(path, &config) {
            Ok(report) => match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&report)?),
                _ => print!("{}", report.human_readable()),
            },
            Err(e) => {
                eprintln!("Error: {e}");
                exit_code = classify_exit_code(&e);
            }
        }
    }

    std::process::exit(exit_code);
}

fn classify_exit_code(e: &smt_jit::jit::JitError) -> i32 {
    use smt_jit::jit::JitError;
    match e {
        JitError::ReadInput { .. } | JitError::Smtlib(_) | JitError::Lower(_) => 1,
        JitError::Ir(_) | JitError::EngineCreation(_) | JitError::UnresolvedSymbol(_) => 2,
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
