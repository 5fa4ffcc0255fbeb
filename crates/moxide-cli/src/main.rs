#![doc = include_str!("../README.md")]

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, WrapErr};
use tracing::info;
use tracing_subscriber::EnvFilter;

use moxide_engine::{check_reachability, Algorithm, CheckOptions, SolverChoice};
use moxide_moxi::parse_task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AlgorithmArg {
    Bmc,
    Kind,
    Pdr,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Bmc => Algorithm::Bmc,
            AlgorithmArg::Kind => Algorithm::KInduction,
            AlgorithmArg::Pdr => Algorithm::Pdr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SolverArg {
    Z3,
    Cvc5,
}

impl From<SolverArg> for SolverChoice {
    fn from(arg: SolverArg) -> Self {
        match arg {
            SolverArg::Z3 => SolverChoice::Z3,
            SolverArg::Cvc5 => SolverChoice::Cvc5,
        }
    }
}

/// MoXI model checker: decides reachability queries over symbolic
/// transition systems.
#[derive(Debug, Parser)]
#[command(name = "moxide", version)]
#[command(about = "moxide: a MoXI model checker")]
struct Cli {
    /// The model-checking algorithm to run.
    #[arg(short = 'm', long, value_enum, default_value = "kind")]
    mc_alg: AlgorithmArg,

    /// The backend SMT solver to use.
    #[arg(short = 's', long, value_enum, default_value = "z3")]
    solver: SolverArg,

    /// Disable the simple-path constraint for k-induction.
    #[arg(long)]
    no_simple_path: bool,

    /// Enable incremental SMT solving.
    #[arg(long)]
    incr_solving: bool,

    /// Abort the run after this many seconds without a verdict.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Show debugging messages.
    #[arg(long)]
    debug: bool,

    /// The verification task in the MoXI-JSON format.
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let source = std::fs::read_to_string(&cli.file)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read task file {}", cli.file.display()))?;
    let task = parse_task(&source)?;

    info!(
        query = %task.query_name,
        system = %task.system.name(),
        "checking reachability"
    );
    info!(logic = %task.system.logic(), "using theory");

    let options = CheckOptions {
        algorithm: cli.mc_alg.into(),
        solver: cli.solver.into(),
        use_simple_path: !cli.no_simple_path,
        incremental: cli.incr_solving,
        timeout: cli.timeout.map(Duration::from_secs),
    };
    let verdict = check_reachability(&task.system, &task.query, &options)
        .into_diagnostic()
        .wrap_err("verification aborted")?;

    println!("{verdict}");
    Ok(())
}
