//! CLI configuration
//!
//! Global flags become a [`CliConfig`]; an optional YAML experiment file
//! supplies the work directory and the library options:
//!
//! ```yaml
//! work_dir: experiments/lang-7
//! pass: full
//! index: 2
//! delete_dumps: false
//! reader:
//!   method_only: true
//!   short_type: true
//! selector:
//!   policy: exclusive
//!   granularity: methods
//! call_graph:
//!   excluded_prefixes: ["java.", "org.junit", "javax."]
//! ```

use std::path::{Path, PathBuf};

use covmatrix::callgraph::CallGraphConfig;
use covmatrix::layout::TracePass;
use covmatrix::reader::ReaderConfig;
use covmatrix::selector::SelectorConfig;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - errors only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Whether `-v` or more was given
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default log filter directive for this level
    #[must_use]
    pub const fn log_directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

/// Experiment options read from YAML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Work directory holding the experiment's artifacts
    pub work_dir: Option<PathBuf>,
    /// Pass to run when the command line names none
    pub pass: Option<TracePass>,
    /// Full-pass matrix index
    pub index: Option<usize>,
    /// Remove the dump directory after `matrix` has read it
    pub delete_dumps: bool,
    /// Dump reader options
    pub reader: ReaderConfig,
    /// Selector options
    pub selector: SelectorConfig,
    /// Call-graph filter options
    pub call_graph: CallGraphConfig,
}

impl ExperimentConfig {
    /// Load from a YAML file
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CliError::experiment(path, e))?;
        Self::from_yaml(&text).map_err(|e| CliError::experiment(path, e))
    }

    /// Parse YAML text
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml_ng::Error> {
        serde_yaml_ng::from_str(text)
    }
}

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Experiment options
    pub experiment: ExperimentConfig,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set experiment options
    #[must_use]
    pub fn with_experiment(mut self, experiment: ExperimentConfig) -> Self {
        self.experiment = experiment;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use covmatrix::component::Granularity;
    use covmatrix::selector::ComponentPolicy;
    use tempfile::TempDir;

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_default_is_normal() {
            assert_eq!(Verbosity::default(), Verbosity::Normal);
        }

        #[test]
        fn test_directives() {
            assert_eq!(Verbosity::Quiet.log_directive(), "error");
            assert_eq!(Verbosity::Normal.log_directive(), "warn");
            assert_eq!(Verbosity::Verbose.log_directive(), "info");
            assert_eq!(Verbosity::Debug.log_directive(), "debug");
        }

        #[test]
        fn test_predicates() {
            assert!(Verbosity::Quiet.is_quiet());
            assert!(Verbosity::Debug.is_verbose());
            assert!(!Verbosity::Normal.is_verbose());
        }
    }

    mod color_tests {
        use super::*;

        #[test]
        fn test_explicit_choices() {
            assert!(ColorChoice::Always.should_color());
            assert!(!ColorChoice::Never.should_color());
        }
    }

    mod experiment_tests {
        use super::*;

        #[test]
        fn test_empty_yaml_uses_defaults() {
            let config = ExperimentConfig::from_yaml("{}").unwrap();
            assert_eq!(config, ExperimentConfig::default());
            assert!(config.reader.method_only);
            assert_eq!(config.call_graph.excluded_prefixes.len(), 3);
        }

        #[test]
        fn test_full_yaml() {
            let config = ExperimentConfig::from_yaml(
                "work_dir: exp\npass: full\nindex: 3\ndelete_dumps: true\nreader:\n  short_type: false\nselector:\n  policy: union\n  granularity: files\n",
            )
            .unwrap();
            assert_eq!(config.work_dir.as_deref(), Some(Path::new("exp")));
            assert_eq!(config.pass, Some(TracePass::Full));
            assert_eq!(config.index, Some(3));
            assert!(config.delete_dumps);
            assert!(!config.reader.short_type);
            assert!(config.reader.method_only);
            assert_eq!(config.selector.policy, ComponentPolicy::FailureUnion);
            assert_eq!(config.selector.granularity, Granularity::Files);
        }

        #[test]
        fn test_load_missing_file() {
            let err = ExperimentConfig::load(Path::new("/nonexistent/experiment.yaml")).unwrap_err();
            assert!(matches!(err, CliError::Experiment { .. }));
        }

        #[test]
        fn test_load_invalid_yaml() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("experiment.yaml");
            std::fs::write(&path, "selector: [not, a, map]").unwrap();
            assert!(matches!(ExperimentConfig::load(&path), Err(CliError::Experiment { .. })));
        }
    }
}
