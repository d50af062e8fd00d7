//! covmatrix CLI: fault-localization matrices from JCov coverage dumps
//!
//! ## Usage
//!
//! ```bash
//! covmatrix matrix --dump dumps/ --bugs bugs.json --trigger-tests trigger_tests.json -o work
//! covmatrix call-graph --edges cg.txt --bugs bugs.json --trigger-tests trigger_tests.json -o work
//! covmatrix plan --pass full --work-dir work
//! covmatrix inspect --dump dumps/result.xml --top 20
//! ```

use clap::Parser;
use covmatrix_cli::handlers::{execute_call_graph, execute_inspect, execute_matrix, execute_plan};
use covmatrix_cli::{
    init_logging, Cli, CliConfig, CliResult, ColorChoice, Commands, ExperimentConfig, Verbosity,
};
use std::process::ExitCode;
use tracing::debug;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    // Build configuration from CLI args
    let config = build_config(&cli)?;
    init_logging(&config);
    debug!(version = env!("CARGO_PKG_VERSION"), "covmatrix starting");

    match cli.command {
        Commands::Matrix(args) => execute_matrix(&config, &args),
        Commands::CallGraph(args) => execute_call_graph(&config, &args),
        Commands::Plan(args) => execute_plan(&config, &args),
        Commands::Inspect(args) => execute_inspect(&config, &args),
    }
}

fn build_config(cli: &Cli) -> CliResult<CliConfig> {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    let color: ColorChoice = cli.color.clone().into();

    let experiment = match &cli.config {
        Some(path) => ExperimentConfig::load(path)?,
        None => ExperimentConfig::default(),
    };

    Ok(CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(color)
        .with_experiment(experiment))
}
