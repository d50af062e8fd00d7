//! Call-Graph Reachability Filter
//!
//! Decides which test classes can statically reach the buggy classes, and
//! which classes are worth tracing on the next pass.
//!
//! ```text
//! analyzer output ──► class edges ──► CallGraph
//!                                        │
//!              bug classes ─────────────►│ has_path(test, bug)
//!                                        ▼
//!                                  relevant tests ──► reachable sets ──► relevant nodes
//! ```

mod edges;
mod gexf;

pub use edges::{endpoint_class, parse_edge_line, parse_edges, CALL_TAGS, DEFAULT_EXCLUDED_PREFIXES};
pub use gexf::GexfWriter;

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::component::{owner_of, simple_name, strip_arguments};
use crate::layout::{write_json, ArtifactLayout};
use crate::result::TraceResult;

/// Whether a class name follows a test naming convention
#[must_use]
pub fn is_test_node(class: &str) -> bool {
    let simple = simple_name(class);
    simple.starts_with("Test") || simple.ends_with("Test") || simple.ends_with("TestCase")
}

/// Class of a qualified method or test name: `pkg.Foo.bar(int)` → `pkg.Foo`
#[must_use]
pub fn class_of(qualified: &str) -> &str {
    owner_of(strip_arguments(qualified))
}

/// Directed class-level call graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallGraph {
    successors: BTreeMap<String, BTreeSet<String>>,
}

impl CallGraph {
    /// Create an empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(caller, callee)` pairs
    #[must_use]
    pub fn from_edges(edges: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut graph = Self::new();
        for (from, to) in edges {
            graph.add_edge(from, to);
        }
        graph
    }

    /// Parse analyzer output with the given exclusions
    #[must_use]
    pub fn from_analyzer_output<S: AsRef<str>>(output: &str, excluded_prefixes: &[S]) -> Self {
        Self::from_edges(parse_edges(output, excluded_prefixes))
    }

    /// Add an edge, creating both nodes
    pub fn add_edge(&mut self, from: String, to: String) {
        self.successors.entry(to.clone()).or_default();
        self.successors.entry(from).or_default().insert(to);
    }

    /// Whether `node` is in the graph
    #[must_use]
    pub fn contains(&self, node: &str) -> bool {
        self.successors.contains_key(node)
    }

    /// Nodes in name order
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.successors.keys().map(String::as_str)
    }

    /// Edges in `(source, target)` order
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.successors
            .iter()
            .flat_map(|(from, tos)| tos.iter().map(move |to| (from.as_str(), to.as_str())))
    }

    /// Number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.successors.len()
    }

    /// Number of edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.successors.values().map(BTreeSet::len).sum()
    }

    /// Nodes named like tests
    pub fn test_nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes().filter(|n| is_test_node(n))
    }

    /// Every node reachable from `start`, including `start`; empty when absent
    #[must_use]
    pub fn reachable_from(&self, start: &str) -> BTreeSet<String> {
        let mut reachable = BTreeSet::new();
        if !self.contains(start) {
            return reachable;
        }
        let mut queue = VecDeque::new();
        reachable.insert(start.to_string());
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for next in self.successors.get(current).into_iter().flatten() {
                if reachable.insert(next.clone()) {
                    queue.push_back(next.as_str());
                }
            }
        }
        reachable
    }

    /// Whether a directed path leads from `from` to `to`
    #[must_use]
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        self.contains(to) && self.reachable_from(from).contains(to)
    }

    /// Remove nodes and every edge touching them
    pub fn remove_nodes(&mut self, nodes: &BTreeSet<String>) {
        self.successors.retain(|node, _| !nodes.contains(node));
        for targets in self.successors.values_mut() {
            targets.retain(|t| !nodes.contains(t));
        }
    }
}

/// Filter options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallGraphConfig {
    /// Package prefixes that void an edge
    pub excluded_prefixes: Vec<String>,
}

impl Default for CallGraphConfig {
    fn default() -> Self {
        Self {
            excluded_prefixes: DEFAULT_EXCLUDED_PREFIXES.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

impl CallGraphConfig {
    /// Create a builder
    #[must_use]
    pub fn builder() -> CallGraphConfigBuilder {
        CallGraphConfigBuilder::default()
    }
}

/// Builder for [`CallGraphConfig`]
#[derive(Debug, Clone, Default)]
pub struct CallGraphConfigBuilder {
    config: CallGraphConfig,
}

impl CallGraphConfigBuilder {
    /// Replace the excluded prefixes
    #[must_use]
    pub fn excluded_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.excluded_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Add one excluded prefix
    #[must_use]
    pub fn exclude(mut self, prefix: impl Into<String>) -> Self {
        self.config.excluded_prefixes.push(prefix.into());
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> CallGraphConfig {
        self.config
    }
}

/// Tests and classes worth tracing on the next pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relevance {
    /// Test classes with a path to a bug class
    pub tests: BTreeSet<String>,
    /// Relevant tests, bug classes and everything the tests reach
    pub nodes: BTreeSet<String>,
}

impl Relevance {
    /// Write the relevant-test and relevant-node lists
    pub fn persist(&self, layout: &ArtifactLayout) -> TraceResult<()> {
        write_json(&layout.call_graph_tests(), &self.tests)?;
        write_json(&layout.call_graph_nodes(), &self.nodes)?;
        Ok(())
    }
}

/// Narrows a call graph to the tests that can reach the bugs
#[derive(Debug, Clone, Default)]
pub struct CallGraphFilter {
    config: CallGraphConfig,
}

impl CallGraphFilter {
    /// Create a filter
    #[must_use]
    pub const fn new(config: CallGraphConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &CallGraphConfig {
        &self.config
    }

    /// Build the graph from analyzer output
    #[must_use]
    pub fn build_graph(&self, analyzer_output: &str) -> CallGraph {
        CallGraph::from_analyzer_output(analyzer_output, self.config.excluded_prefixes.as_slice())
    }

    /// Compute the relevant tests and nodes.
    ///
    /// `bugs` are qualified buggy method names and `trigger_tests` qualified
    /// failing test names. Returns `None` when no trigger test class is
    /// among the relevant tests, meaning the graph is stale for this bug.
    #[must_use]
    pub fn filter<B, T>(&self, graph: &CallGraph, bugs: &[B], trigger_tests: &[T]) -> Option<Relevance>
    where
        B: AsRef<str>,
        T: AsRef<str>,
    {
        let bug_classes: BTreeSet<String> =
            bugs.iter().map(|b| class_of(b.as_ref()).to_string()).collect();
        let trigger_classes: BTreeSet<&str> =
            trigger_tests.iter().map(|t| class_of(t.as_ref())).collect();

        let tests: BTreeSet<String> = graph
            .test_nodes()
            .filter(|test| {
                let reachable = graph.reachable_from(test);
                bug_classes.iter().any(|bug| reachable.contains(bug))
            })
            .map(str::to_string)
            .collect();

        if !tests.iter().any(|t| trigger_classes.contains(t.as_str())) {
            warn!(
                relevant_tests = tests.len(),
                trigger_classes = trigger_classes.len(),
                "no trigger test reaches a bug class; call graph is stale"
            );
            return None;
        }

        let mut remaining = graph.clone();
        let mut nodes: BTreeSet<String> = tests.clone();
        nodes.extend(bug_classes.iter().cloned());
        for test in &tests {
            let reachable = remaining.reachable_from(test);
            if reachable.is_empty() {
                continue;
            }
            debug!(test = %test, reachable = reachable.len(), "claimed reachable classes");
            remaining.remove_nodes(&reachable);
            nodes.extend(reachable);
        }

        info!(
            graph_nodes = graph.node_count(),
            graph_edges = graph.edge_count(),
            tests = tests.len(),
            nodes = nodes.len(),
            "filtered call graph"
        );
        Some(Relevance { tests, nodes })
    }

    /// Filter and, unless stale, write the graph and both lists
    pub fn run<B, T>(
        &self,
        graph: &CallGraph,
        bugs: &[B],
        trigger_tests: &[T],
        layout: &ArtifactLayout,
    ) -> TraceResult<Option<Relevance>>
    where
        B: AsRef<str>,
        T: AsRef<str>,
    {
        let Some(relevance) = self.filter(graph, bugs, trigger_tests) else {
            return Ok(None);
        };
        std::fs::create_dir_all(layout.root())?;
        GexfWriter::new(graph).save(&layout.call_graph())?;
        relevance.persist(layout)?;
        Ok(Some(relevance))
    }
}
