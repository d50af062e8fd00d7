//! Inspect command handler

use std::collections::BTreeMap;
use std::path::PathBuf;

use covmatrix::reader::TraceReader;
use covmatrix::trace::{split_all, Edge};

use super::open_reader;
use crate::commands::InspectArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::ProgressReporter;

/// What one batch of dumps contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpSummary {
    /// File the catalogue was built from
    pub result_file: PathBuf,
    /// Catalogued methods or blocks
    pub catalogued: usize,
    /// Catalogued extra slots
    pub slots: usize,
    /// Coverage tag prefixes
    pub prefixes: Vec<String>,
    /// Counted elements per dump, by trace name
    pub dumps: BTreeMap<String, usize>,
    /// Counted elements per test
    pub tests: BTreeMap<String, usize>,
    /// Most frequent call-graph edges, most frequent first
    pub top_edges: Vec<(Edge, usize)>,
}

/// Read every dump and collect the summary
pub fn summarize(reader: &TraceReader, top: usize) -> CliResult<DumpSummary> {
    let traces = reader.read_all()?;

    let mut edge_counts: BTreeMap<Edge, usize> = BTreeMap::new();
    for trace in &traces {
        for (edge, count) in trace.call_graph_edge_counts() {
            *edge_counts.entry(edge).or_insert(0) += count;
        }
    }
    let mut top_edges: Vec<(Edge, usize)> = edge_counts.into_iter().collect();
    top_edges.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_edges.truncate(top);

    let catalogue = reader.catalogue();
    Ok(DumpSummary {
        result_file: reader.result_file().to_path_buf(),
        catalogued: catalogue.len(),
        slots: catalogue.slot_count(),
        prefixes: catalogue.prefixes().iter().cloned().collect(),
        dumps: traces.iter().map(|t| (t.name().to_string(), t.len())).collect(),
        tests: split_all(&traces)
            .into_iter()
            .map(|(name, trace)| (name, trace.len()))
            .collect(),
        top_edges,
    })
}

/// Execute the inspect command
pub fn execute_inspect(config: &CliConfig, args: &InspectArgs) -> CliResult<()> {
    let reader = open_reader(&args.dump, &config.experiment.reader)?;
    let summary = summarize(&reader, args.top)?;
    let reporter = ProgressReporter::from_config(config);

    reporter.section("Catalogue");
    reporter.entry("result file", summary.result_file.display());
    reporter.entry("methods", summary.catalogued);
    reporter.entry("slots", summary.slots);
    reporter.entry("prefixes", summary.prefixes.join(", "));

    reporter.section("Dumps");
    for (name, elements) in &summary.dumps {
        reporter.entry(name, elements);
    }

    reporter.section("Tests");
    if summary.tests.is_empty() {
        reporter.entry("none", "no test invocation in the dumps");
    }
    for (name, elements) in &summary.tests {
        reporter.entry(name, elements);
    }

    if !summary.top_edges.is_empty() {
        reporter.section("Call-graph edges");
        for (edge, count) in &summary.top_edges {
            reporter.entry(&format!("{} -> {}", edge.caller, edge.callee), count);
        }
    }
    Ok(())
}
