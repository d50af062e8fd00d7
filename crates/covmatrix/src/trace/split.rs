//! Per-test splitting of an aggregate trace.
//!
//! One dump interleaves every test that ran in the fork. Tests are
//! instrumented methods themselves, so each hit record carries the slot
//! triple of the test invocation it happened under. Matching that triple
//! against the tests' own hit records recovers one trace per test.

use std::collections::BTreeMap;

use tracing::debug;

use super::{InvocationKey, Trace};
use crate::component::{owner_of, simple_name, strip_arguments};

/// Decides whether a trace element is a test method
pub trait TestPredicate {
    /// `qualified` is a qualified method name such as `pkg.FooTest.testBar()`
    fn is_test_element(&self, qualified: &str) -> bool;
}

impl<F> TestPredicate for F
where
    F: Fn(&str) -> bool,
{
    fn is_test_element(&self, qualified: &str) -> bool {
        self(qualified)
    }
}

/// JUnit 3 style naming: class name ends with `Test`, method starts with `test`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NamingConvention;

impl TestPredicate for NamingConvention {
    fn is_test_element(&self, qualified: &str) -> bool {
        let method_path = strip_arguments(qualified);
        simple_name(owner_of(method_path)).ends_with("Test")
            && simple_name(method_path).starts_with("test")
    }
}

/// Split every dump of a batch and merge the subtraces of tests that ran in
/// more than one fork
#[must_use]
pub fn split_all<'a>(traces: impl IntoIterator<Item = &'a Trace>) -> BTreeMap<String, Trace> {
    let mut merged: BTreeMap<String, Trace> = BTreeMap::new();
    for trace in traces {
        for (name, subtrace) in trace.split_to_subtraces() {
            match merged.get_mut(&name) {
                Some(existing) => existing.merge(subtrace),
                None => {
                    merged.insert(name, subtrace);
                }
            }
        }
    }
    merged
}

impl Trace {
    /// Split into one trace per test method using [`NamingConvention`]
    #[must_use]
    pub fn split_to_subtraces(&self) -> BTreeMap<String, Trace> {
        self.split_to_subtraces_with(&NamingConvention)
    }

    /// Split into one trace per test method, keyed by the test's qualified name.
    ///
    /// Fragments whose invocation key matches no known test are dropped, as
    /// are tests that end up with no fragments. Caller names in each output
    /// trace are resolved only against the ids and slots of that trace.
    #[must_use]
    pub fn split_to_subtraces_with(&self, predicate: &impl TestPredicate) -> BTreeMap<String, Trace> {
        // canonical key → test name, alias key → canonical key
        let mut tests: BTreeMap<InvocationKey, &str> = BTreeMap::new();
        let mut aliases: BTreeMap<InvocationKey, InvocationKey> = BTreeMap::new();

        let candidates = self
            .elements
            .values()
            .filter(|e| predicate.is_test_element(&e.name));
        for test in candidates {
            let Some(first) = test.hits.first() else {
                continue;
            };
            let canonical = InvocationKey::new(test.id, first.parent_slot, first.previous_slot);
            tests.insert(canonical, test.name.as_str());
            for hit in &test.hits {
                aliases.insert(
                    InvocationKey::new(test.id, hit.parent_slot, hit.previous_slot),
                    canonical,
                );
                if let Some(slot) = test.extra_slot {
                    aliases.insert(
                        InvocationKey::new(slot, hit.parent_slot, hit.previous_slot),
                        canonical,
                    );
                }
            }
        }

        let mut traces: BTreeMap<String, Trace> = BTreeMap::new();
        let mut dropped = 0usize;
        for element in self.elements.values() {
            for (key, fragment) in element.split_by_test_slots() {
                let owner = aliases
                    .get(&key)
                    .and_then(|canonical| tests.get(canonical));
                match owner {
                    Some(test_name) => traces
                        .entry((*test_name).to_string())
                        .or_insert_with(|| Trace::new(*test_name, BTreeMap::new()))
                        .absorb(fragment),
                    None => dropped += 1,
                }
            }
        }

        for trace in traces.values_mut() {
            let local = trace.local_catalogue();
            trace.resolve_callers(&local);
        }

        debug!(
            trace = %self.name,
            tests = tests.len(),
            subtraces = traces.len(),
            dropped_fragments = dropped,
            "split aggregate trace"
        );
        traces
    }
}
