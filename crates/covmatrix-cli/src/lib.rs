//! covmatrix CLI Library
//!
//! Command-line front end of the covmatrix pipeline: builds activity
//! matrices from coverage dumps, filters static call graphs and plans the
//! next tracing pass.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;
mod logging;
mod output;

pub use commands::{
    CallGraphArgs, Cli, ColorArg, Commands, GranularityArg, InspectArgs, MatrixArgs, PassArg,
    PlanArgs, PolicyArg,
};
pub use config::{CliConfig, ColorChoice, ExperimentConfig, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::{env_filter, init_logging};
pub use output::{ProgressReporter, Stage};
