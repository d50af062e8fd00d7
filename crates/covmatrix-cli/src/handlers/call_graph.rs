//! Call-graph command handler

use covmatrix::callgraph::CallGraphFilter;
use covmatrix::layout::{read_name_list, ArtifactLayout};

use super::resolve_dir;
use crate::commands::CallGraphArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{ProgressReporter, Stage};

/// Execute the call-graph command
pub fn execute_call_graph(config: &CliConfig, args: &CallGraphArgs) -> CliResult<()> {
    let experiment = &config.experiment;
    let layout = ArtifactLayout::new(resolve_dir(args.out_dir.as_deref(), experiment, "--out-dir")?);
    let reporter = ProgressReporter::from_config(config);

    let output = std::fs::read_to_string(&args.edges).map_err(|e| CliError::input(&args.edges, e))?;
    let bugs = read_name_list(&args.bugs)?;
    let trigger_tests = read_name_list(&args.trigger_tests)?;

    let filter = CallGraphFilter::new(experiment.call_graph.clone());
    let graph = filter.build_graph(&output);
    reporter.detail("classes", graph.node_count());
    reporter.detail("edges", graph.edge_count());

    match filter.run(&graph, &bugs, &trigger_tests, &layout)? {
        Some(relevance) => {
            reporter.detail("relevant tests", relevance.tests.len());
            reporter.detail("relevant classes", relevance.nodes.len());
            reporter.artifact(Stage::Written, "Call graph", layout.call_graph().display());
        }
        None => reporter.artifact(
            Stage::Stale,
            "Call graph",
            "graph is stale, no trigger test reaches a buggy class",
        ),
    }
    Ok(())
}
