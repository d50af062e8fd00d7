//! Command handlers - extracted from main.rs for testability
//!
//! Each handler module contains:
//! - The execution logic for a CLI command
//! - Pure helper functions
//! - Tests

pub mod call_graph;
pub mod inspect;
pub mod matrix;
pub mod plan;

pub use call_graph::execute_call_graph;
pub use inspect::{execute_inspect, summarize, DumpSummary};
pub use matrix::{execute_matrix, reader_config, selector_config};
pub use plan::{execute_plan, render_selection};

use std::path::{Path, PathBuf};

use covmatrix::reader::{ReaderConfig, TraceReader};

use crate::config::ExperimentConfig;
use crate::error::{CliError, CliResult};

/// Open a reader over a single dump file or a directory of dumps
pub fn open_reader(dump: &Path, config: &ReaderConfig) -> CliResult<TraceReader> {
    if dump.is_dir() {
        Ok(TraceReader::from_dir(dump, config)?)
    } else if dump.is_file() {
        Ok(TraceReader::from_files(vec![dump.to_path_buf()], config)?)
    } else {
        Err(CliError::input(dump, "no such file or directory"))
    }
}

/// Directory from the command line, else the experiment's work directory
pub fn resolve_dir(
    flag: Option<&Path>,
    experiment: &ExperimentConfig,
    name: &'static str,
) -> CliResult<PathBuf> {
    flag.map(Path::to_path_buf)
        .or_else(|| experiment.work_dir.clone())
        .ok_or(CliError::MissingWorkDir { flag: name })
}
