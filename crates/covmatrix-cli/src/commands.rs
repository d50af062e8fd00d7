//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use covmatrix::component::Granularity;
use covmatrix::layout::TracePass;
use covmatrix::selector::ComponentPolicy;
use std::path::PathBuf;

/// covmatrix: fault-localization matrices from JCov method coverage
#[derive(Parser, Debug)]
#[command(name = "covmatrix")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// YAML experiment file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the activity matrix from coverage dumps
    Matrix(MatrixArgs),

    /// Filter a static call graph down to the tests and classes relevant to the bugs
    CallGraph(CallGraphArgs),

    /// Show what the next tracing pass should trace and run
    Plan(PlanArgs),

    /// Summarize a coverage dump
    Inspect(InspectArgs),
}

/// Arguments for the matrix command
#[derive(Parser, Debug)]
pub struct MatrixArgs {
    /// Dump file, or a directory of dump files
    #[arg(short, long)]
    pub dump: PathBuf,

    /// JSON list of buggy methods
    #[arg(long)]
    pub bugs: PathBuf,

    /// JSON list of failing tests
    #[arg(long)]
    pub trigger_tests: PathBuf,

    /// Directory receiving the test details and planning file
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Tracing pass that produced the dump
    #[arg(long)]
    pub pass: Option<PassArg>,

    /// Matrix index for the full pass
    #[arg(long)]
    pub index: Option<usize>,

    /// Component granularity
    #[arg(long)]
    pub granularity: Option<GranularityArg>,

    /// Failure component policy
    #[arg(long)]
    pub policy: Option<PolicyArg>,

    /// Track blocks inside methods, not only method entries
    #[arg(long)]
    pub blocks: bool,

    /// Keep fully qualified argument types
    #[arg(long)]
    pub long_types: bool,

    /// Remove the dump directory once every file has been read
    #[arg(long)]
    pub delete_dumps: bool,
}

/// Arguments for the call-graph command
#[derive(Parser, Debug)]
pub struct CallGraphArgs {
    /// Static analyzer output, one `<tag>:<from> <to>` edge per line
    #[arg(short, long)]
    pub edges: PathBuf,

    /// JSON list of buggy methods
    #[arg(long)]
    pub bugs: PathBuf,

    /// JSON list of failing tests
    #[arg(long)]
    pub trigger_tests: PathBuf,

    /// Directory receiving the graph and relevance lists
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,
}

/// Arguments for the plan command
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Pass to plan
    #[arg(long)]
    pub pass: Option<PassArg>,

    /// Work directory holding the experiment's artifacts
    #[arg(short, long)]
    pub work_dir: Option<PathBuf>,

    /// Print the selection as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Dump file, or a directory of dump files
    #[arg(short, long)]
    pub dump: PathBuf,

    /// Number of most frequent call-graph edges to show
    #[arg(long, default_value = "10")]
    pub top: usize,
}

/// Tracing pass argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PassArg {
    /// Trigger tests over bug and trigger classes
    #[default]
    Sanity,
    /// Relevant tests over relevant classes
    Full,
}

impl From<PassArg> for TracePass {
    fn from(arg: PassArg) -> Self {
        match arg {
            PassArg::Sanity => Self::Sanity,
            PassArg::Full => Self::Full,
        }
    }
}

/// Granularity argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GranularityArg {
    /// Qualified methods
    #[default]
    Methods,
    /// Enclosing classes
    Files,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Methods => Self::Methods,
            GranularityArg::Files => Self::Files,
        }
    }
}

/// Failure component policy argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PolicyArg {
    /// Failing components minus passing components
    #[default]
    Exclusive,
    /// Every failing component
    Union,
}

impl From<PolicyArg> for ComponentPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Exclusive => Self::FailureExclusive,
            PolicyArg::Union => Self::FailureUnion,
        }
    }
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
