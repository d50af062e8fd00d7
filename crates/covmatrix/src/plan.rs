//! Pass planning.
//!
//! Derives what the next tracing pass instruments and runs from the
//! artifacts earlier steps left in the work directory.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::callgraph::{class_of, Relevance};
use crate::component::simple_name;
use crate::layout::{read_json, read_name_list, ArtifactLayout, TracePass};
use crate::result::TraceResult;

/// Build-tool include pattern for a test class: `pkg.FooTest` → `**/FooTest.java`
#[must_use]
pub fn test_file_pattern(class: &str) -> String {
    format!("**/{}.java", simple_name(class))
}

/// Classes to instrument and tests to run in one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSelection {
    /// Pass this selection is for
    pub pass: TracePass,
    /// Classes handed to the instrumentation agent; empty means all
    pub classes_to_trace: BTreeSet<String>,
    /// Include patterns; empty means every test
    pub tests_to_run: BTreeSet<String>,
    /// Exclude patterns
    pub tests_to_exclude: BTreeSet<String>,
}

impl RunSelection {
    /// Whether the pass is narrowed at all
    #[must_use]
    pub fn is_restricted(&self) -> bool {
        !self.classes_to_trace.is_empty() || !self.tests_to_run.is_empty()
    }
}

/// Inputs of a planning decision
#[derive(Debug, Clone, Default)]
pub struct PlanInputs {
    /// Qualified buggy method names
    pub bugs: Vec<String>,
    /// Qualified failing test names
    pub trigger_tests: Vec<String>,
    /// Qualified test method names to leave out
    pub tests_to_exclude: Vec<String>,
    /// Call-graph filter outputs, when available
    pub relevance: Option<Relevance>,
}

impl PlanInputs {
    /// Load whatever inputs exist in the work directory
    pub fn load(layout: &ArtifactLayout) -> TraceResult<Self> {
        let optional_list = |path: std::path::PathBuf| -> TraceResult<Vec<String>> {
            if path.exists() {
                read_name_list(&path)
            } else {
                debug!(path = %path.display(), "planning input absent");
                Ok(Vec::new())
            }
        };

        let relevance = if layout.call_graph_tests().exists() && layout.call_graph_nodes().exists() {
            Some(Relevance {
                tests: read_json(&layout.call_graph_tests())?,
                nodes: read_json(&layout.call_graph_nodes())?,
            })
        } else {
            None
        };

        Ok(Self {
            bugs: optional_list(layout.bugs())?,
            trigger_tests: optional_list(layout.trigger_tests())?,
            tests_to_exclude: optional_list(layout.tests_to_exclude())?,
            relevance,
        })
    }
}

/// Compute the run selection of `pass`.
///
/// A sanity pass traces the bug classes and the trigger test classes and runs
/// only the trigger tests. A full pass traces the relevant call-graph nodes
/// and runs the relevant tests; without call-graph outputs it stays
/// unrestricted. Excluded tests apply to both.
#[must_use]
pub fn plan_pass(pass: TracePass, inputs: &PlanInputs) -> RunSelection {
    let tests_to_exclude = inputs
        .tests_to_exclude
        .iter()
        .map(|t| test_file_pattern(class_of(t)))
        .collect();

    let mut selection = RunSelection {
        pass,
        tests_to_exclude,
        ..RunSelection::default()
    };

    match pass {
        TracePass::Sanity => {
            if inputs.bugs.is_empty() {
                return selection;
            }
            let trigger_classes: BTreeSet<&str> =
                inputs.trigger_tests.iter().map(|t| class_of(t)).collect();
            selection.classes_to_trace = inputs
                .bugs
                .iter()
                .map(|b| class_of(b))
                .chain(trigger_classes.iter().copied())
                .map(str::to_string)
                .collect();
            selection.tests_to_run = trigger_classes.iter().map(|c| test_file_pattern(c)).collect();
        }
        TracePass::Full => {
            if let Some(relevance) = &inputs.relevance {
                selection.classes_to_trace = relevance.nodes.clone();
                selection.tests_to_run = relevance.tests.iter().map(|t| test_file_pattern(t)).collect();
            }
        }
    }

    info!(
        pass = %pass,
        classes = selection.classes_to_trace.len(),
        tests = selection.tests_to_run.len(),
        excluded = selection.tests_to_exclude.len(),
        "planned pass"
    );
    selection
}

/// Load the work directory's inputs and plan `pass`
pub fn plan_from_layout(layout: &ArtifactLayout, pass: TracePass) -> TraceResult<RunSelection> {
    Ok(plan_pass(pass, &PlanInputs::load(layout)?))
}
