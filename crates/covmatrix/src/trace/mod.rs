//! Trace Model
//!
//! In-memory representation of one run's method coverage.
//!
//! # Lifecycles
//!
//! ```text
//! dump file ──► aggregate Trace (every test of the fork)
//!                    │ split_to_subtraces
//!                    ▼
//!              per-test Trace ×N ──► components ──► matrix rows
//! ```
//!
//! Elements are keyed by their primary id in a `BTreeMap`, so iteration and
//! every derived artifact are independent of insertion order.

mod element;
mod split;

pub use element::{Edge, HitInformation, InvocationKey, TraceElement, NO_SLOT};
pub use split::{split_all, NamingConvention, TestPredicate};

use std::collections::{BTreeMap, BTreeSet};

use crate::catalogue::MethodCatalogue;
use crate::component::{normalize_component, Granularity};

/// Coverage of one run or one test method
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    name: String,
    elements: BTreeMap<i64, TraceElement>,
}

impl Trace {
    /// Create a trace from its elements
    #[must_use]
    pub fn new(name: impl Into<String>, elements: BTreeMap<i64, TraceElement>) -> Self {
        Self {
            name: name.into(),
            elements,
        }
    }

    /// Trace name: the dump file stem, or the test's qualified name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Elements keyed by primary id
    #[must_use]
    pub fn elements(&self) -> &BTreeMap<i64, TraceElement> {
        &self.elements
    }

    /// Element with the given primary id
    #[must_use]
    pub fn get(&self, id: i64) -> Option<&TraceElement> {
        self.elements.get(&id)
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the trace has no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Catalogue restricted to the ids and slots present in this trace
    #[must_use]
    pub fn local_catalogue(&self) -> MethodCatalogue {
        let mut catalogue = MethodCatalogue::new();
        for element in self.elements.values() {
            catalogue.insert(element.identity(), element.name.as_str());
        }
        catalogue
    }

    /// Resolve every hit's caller names against `catalogue`
    pub fn resolve_callers(&mut self, catalogue: &MethodCatalogue) {
        for element in self.elements.values_mut() {
            element.set_previous_method(catalogue);
        }
    }

    /// Normalized component names at the given granularity
    #[must_use]
    pub fn components(&self, granularity: Granularity) -> BTreeSet<String> {
        self.elements
            .values()
            .map(|e| normalize_component(&e.component(granularity)))
            .collect()
    }

    /// Distinct execution edges
    #[must_use]
    pub fn execution_edges(&self) -> BTreeSet<Edge> {
        self.elements
            .values()
            .flat_map(TraceElement::execution_edges)
            .collect()
    }

    /// Distinct call-graph edges
    #[must_use]
    pub fn call_graph_edges(&self) -> BTreeSet<Edge> {
        self.elements
            .values()
            .flat_map(TraceElement::call_graph_edges)
            .collect()
    }

    /// Distinct numeric execution edges
    #[must_use]
    pub fn execution_edges_num(&self) -> BTreeSet<(i64, i64)> {
        self.elements
            .values()
            .flat_map(TraceElement::execution_edges_num)
            .collect()
    }

    /// Distinct numeric call-graph edges
    #[must_use]
    pub fn call_graph_edges_num(&self) -> BTreeSet<(i64, i64)> {
        self.elements
            .values()
            .flat_map(TraceElement::call_graph_edges_num)
            .collect()
    }

    /// Occurrences of each call-graph edge over all hit records
    #[must_use]
    pub fn call_graph_edge_counts(&self) -> BTreeMap<Edge, usize> {
        let mut counts = BTreeMap::new();
        for edge in self.elements.values().flat_map(TraceElement::call_graph_edges) {
            *counts.entry(edge).or_insert(0) += 1;
        }
        counts
    }

    /// Merge a fragment into this trace, combining hits with an existing
    /// element of the same id
    pub(crate) fn absorb(&mut self, fragment: TraceElement) {
        match self.elements.get_mut(&fragment.id) {
            Some(existing) => {
                existing.count += fragment.count;
                existing.hits.extend(fragment.hits);
            }
            None => {
                self.elements.insert(fragment.id, fragment);
            }
        }
    }

    /// Fold every element of `other` into this trace
    pub fn merge(&mut self, other: Self) {
        for element in other.elements.into_values() {
            self.absorb(element);
        }
    }
}
