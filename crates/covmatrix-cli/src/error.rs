//! Why a covmatrix command stopped

use std::path::PathBuf;

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Command failures, one variant per kind of bad input
#[derive(Debug, Error)]
pub enum CliError {
    /// The `--config` experiment file is missing or not valid YAML
    #[error("Configuration error in {}: {message}", path.display())]
    Experiment {
        /// Experiment file
        path: PathBuf,
        /// Read or parse failure
        message: String,
    },

    /// A dump, edge list or directory named on the command line cannot be read
    #[error("Cannot read {}: {message}", path.display())]
    Input {
        /// Path as given
        path: PathBuf,
        /// Read failure
        message: String,
    },

    /// Neither the flag nor the experiment file names the work directory
    #[error("{flag} is required when the experiment file sets no work_dir")]
    MissingWorkDir {
        /// Flag that would have supplied it
        flag: &'static str,
    },

    /// Reading dumps or writing artifacts failed
    #[error(transparent)]
    Trace(#[from] covmatrix::TraceError),
}

impl CliError {
    /// Experiment file failure
    #[must_use]
    pub fn experiment(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Experiment {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Unreadable command-line input
    #[must_use]
    pub fn input(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Input {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
