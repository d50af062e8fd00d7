//! Trace elements and their hit records

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalogue::{MethodCatalogue, MethodIdentity, UNKNOWN_CALLER};
use crate::component::Granularity;
use crate::result::{TraceError, TraceResult};

/// Slot value the agent writes when a field does not apply
pub const NO_SLOT: i64 = -1;

/// Per-invocation correlation key of a test: `(test_slot, test_parent, test_previous)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct InvocationKey {
    /// Slot (or id) of the owning test method
    pub slot: i64,
    /// Static parent of the test invocation
    pub parent: i64,
    /// Execution predecessor of the test invocation
    pub previous: i64,
}

impl InvocationKey {
    /// Create a key
    #[must_use]
    pub const fn new(slot: i64, parent: i64, previous: i64) -> Self {
        Self {
            slot,
            parent,
            previous,
        }
    }
}

/// A directed `(caller, callee)` pair between qualified names
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Edge {
    /// Calling method, or [`UNKNOWN_CALLER`]
    pub caller: String,
    /// Called method
    pub callee: String,
}

impl Edge {
    /// Create an edge
    #[must_use]
    pub fn new(caller: impl Into<String>, callee: impl Into<String>) -> Self {
        Self {
            caller: caller.into(),
            callee: callee.into(),
        }
    }
}

/// Resolved caller names of one hit record
#[derive(Debug, Clone, PartialEq, Eq)]
struct Callers {
    previous: String,
    parent: String,
}

/// One observed call-site record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitInformation {
    /// Number of hits attributed to this record
    pub count: i64,
    /// Caller in execution order
    pub previous_slot: i64,
    /// Caller in the static call hierarchy
    pub parent_slot: i64,
    /// Slot of the test invocation this hit belongs to
    pub test_slot: i64,
    /// Parent of the test invocation
    pub test_parent: i64,
    /// Execution predecessor of the test invocation
    pub test_previous: i64,
    callers: Option<Callers>,
}

impl HitInformation {
    /// Build from the agent's `[count, previous, parent, test_slot, test_parent, test_previous]` tuple
    #[must_use]
    pub const fn from_tuple(tuple: [i64; 6]) -> Self {
        let [count, previous_slot, parent_slot, test_slot, test_parent, test_previous] = tuple;
        Self {
            count,
            previous_slot,
            parent_slot,
            test_slot,
            test_parent,
            test_previous,
            callers: None,
        }
    }

    /// Parse a `HitInformation` attribute value: a literal array of 6-tuples
    pub fn parse_list(value: &str) -> Result<Vec<Self>, serde_json::Error> {
        let tuples: Vec<[i64; 6]> = serde_json::from_str(value)?;
        Ok(tuples.into_iter().map(Self::from_tuple).collect())
    }

    /// Test invocation this hit belongs to, if any
    #[must_use]
    pub const fn invocation_key(&self) -> Option<InvocationKey> {
        if self.test_slot == NO_SLOT {
            None
        } else {
            Some(InvocationKey::new(
                self.test_slot,
                self.test_parent,
                self.test_previous,
            ))
        }
    }

    /// Resolve the previous and parent callers against `catalogue`
    pub fn set_previous_method(&mut self, catalogue: &MethodCatalogue) {
        self.callers = Some(Callers {
            previous: catalogue.resolve_or_unknown(self.previous_slot).to_string(),
            parent: catalogue.resolve_or_unknown(self.parent_slot).to_string(),
        });
    }

    /// Execution-order caller name, [`UNKNOWN_CALLER`] until resolved
    #[must_use]
    pub fn previous_method(&self) -> &str {
        self.callers
            .as_ref()
            .map_or(UNKNOWN_CALLER, |c| c.previous.as_str())
    }

    /// Call-hierarchy caller name, [`UNKNOWN_CALLER`] until resolved
    #[must_use]
    pub fn parent_method(&self) -> &str {
        self.callers
            .as_ref()
            .map_or(UNKNOWN_CALLER, |c| c.parent.as_str())
    }

    /// Whether caller names have been resolved
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.callers.is_some()
    }
}

/// One instrumented method within one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceElement {
    /// Primary id
    pub id: i64,
    /// Alias slot
    pub extra_slot: Option<i64>,
    /// Qualified method (or block) name
    pub name: String,
    /// Total hit count reported by the agent
    pub count: i64,
    /// Hit records, empty when `count == 0`
    pub hits: Vec<HitInformation>,
}

impl TraceElement {
    /// Create an element without hit records
    #[must_use]
    pub fn new(identity: MethodIdentity, name: impl Into<String>, count: i64) -> Self {
        Self {
            id: identity.id,
            extra_slot: identity.extra_slot,
            name: name.into(),
            count,
            hits: Vec::new(),
        }
    }

    /// Attach hit records
    #[must_use]
    pub fn with_hits(mut self, hits: Vec<HitInformation>) -> Self {
        self.hits = hits;
        self
    }

    /// Build from a coverage line's attribute map.
    ///
    /// Hit records are only read when the line reports a non-zero count.
    pub fn from_attributes(
        attributes: &BTreeMap<String, String>,
        catalogue: &MethodCatalogue,
    ) -> TraceResult<Self> {
        let int = |key: &str| -> TraceResult<Option<i64>> {
            attributes
                .get(key)
                .map(|v| {
                    v.trim().parse::<i64>().map_err(|_| {
                        TraceError::malformed_record(format!("invalid {key}=\"{v}\""))
                    })
                })
                .transpose()
        };

        let id = int("id")?.ok_or_else(|| TraceError::malformed_record("coverage line without id"))?;
        let count = int("count")?
            .ok_or_else(|| TraceError::malformed_record(format!("id {id} has no count")))?;
        let extra_slot = int("extra_slots")?.unwrap_or(NO_SLOT);
        let name = catalogue.name_by_id(id).ok_or_else(|| {
            TraceError::malformed_record(format!("id {id} is not in the method catalogue"))
        })?;

        let mut element = Self::new(MethodIdentity::new(id, extra_slot), name, count);
        if element.has_count() {
            let raw = attributes.get("HitInformation").ok_or_else(|| {
                TraceError::malformed_record(format!(
                    "id {id} has count {count} but no HitInformation"
                ))
            })?;
            element.hits = HitInformation::parse_list(raw).map_err(|e| {
                TraceError::malformed_record(format!("id {id}: unreadable HitInformation: {e}"))
            })?;
        }
        Ok(element)
    }

    /// Identity value of this element
    #[must_use]
    pub const fn identity(&self) -> MethodIdentity {
        MethodIdentity {
            id: self.id,
            extra_slot: self.extra_slot,
        }
    }

    /// Whether the method was entered at all
    #[must_use]
    pub const fn has_count(&self) -> bool {
        self.count != 0
    }

    /// Sum of the hit records' counts
    #[must_use]
    pub fn hit_count_sum(&self) -> i64 {
        self.hits.iter().map(|h| h.count).sum()
    }

    /// Whether `count` equals the sum of the hit records
    #[must_use]
    pub fn is_count_consistent(&self) -> bool {
        self.hit_count_sum() == self.count
    }

    /// Resolve every hit's callers
    pub fn set_previous_method(&mut self, catalogue: &MethodCatalogue) {
        for hit in &mut self.hits {
            hit.set_previous_method(catalogue);
        }
    }

    /// Rendered (not yet normalized) component name
    #[must_use]
    pub fn component(&self, granularity: Granularity) -> String {
        granularity.render(&self.name)
    }

    /// previous → this, one per hit record
    #[must_use]
    pub fn execution_edges(&self) -> Vec<Edge> {
        self.hits
            .iter()
            .map(|h| Edge::new(h.previous_method(), self.name.as_str()))
            .collect()
    }

    /// parent → this, one per hit record
    #[must_use]
    pub fn call_graph_edges(&self) -> Vec<Edge> {
        self.hits
            .iter()
            .map(|h| Edge::new(h.parent_method(), self.name.as_str()))
            .collect()
    }

    /// `(previous_slot, extra_slot)` pairs
    #[must_use]
    pub fn execution_edges_num(&self) -> Vec<(i64, i64)> {
        let own = self.extra_slot.unwrap_or(NO_SLOT);
        self.hits.iter().map(|h| (h.previous_slot, own)).collect()
    }

    /// `(parent_slot, extra_slot)` pairs
    #[must_use]
    pub fn call_graph_edges_num(&self) -> Vec<(i64, i64)> {
        let own = self.extra_slot.unwrap_or(NO_SLOT);
        self.hits.iter().map(|h| (h.parent_slot, own)).collect()
    }

    /// Partition the hit records by test invocation.
    ///
    /// Each group becomes a fragment of this element carrying only that
    /// group's hits, with `count` recomputed as their sum. Hits outside any
    /// test invocation are left out.
    #[must_use]
    pub fn split_by_test_slots(&self) -> BTreeMap<InvocationKey, Self> {
        let mut groups: BTreeMap<InvocationKey, Vec<HitInformation>> = BTreeMap::new();
        for hit in &self.hits {
            if let Some(key) = hit.invocation_key() {
                groups.entry(key).or_default().push(hit.clone());
            }
        }

        groups
            .into_iter()
            .map(|(key, hits)| {
                let count = hits.iter().map(|h| h.count).sum();
                let fragment = Self::new(self.identity(), self.name.as_str(), count).with_hits(hits);
                (key, fragment)
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn catalogue() -> MethodCatalogue {
        let mut catalogue = MethodCatalogue::new();
        catalogue.insert(MethodIdentity::new(1, 10), "pkg.FooTest.testBar()");
        catalogue.insert(MethodIdentity::new(2, 20), "pkg.Foo.baz()");
        catalogue
    }

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_parse_hit_list() {
        let hits = HitInformation::parse_list("[[3,-1,-1,1,-1,-1],[2, 10, 10, 1, -1, -1]]").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].previous_slot, 10);
        assert_eq!(hits[0].invocation_key(), Some(InvocationKey::new(1, -1, -1)));
    }

    #[test]
    fn test_wrong_tuple_arity_rejected() {
        assert!(HitInformation::parse_list("[[3,-1,-1,1,-1]]").is_err());
    }

    #[test]
    fn test_no_invocation_key_without_test_slot() {
        let hit = HitInformation::from_tuple([1, -1, -1, -1, -1, -1]);
        assert_eq!(hit.invocation_key(), None);
    }

    #[test]
    fn test_from_attributes_reads_hits_when_counted() {
        let element = TraceElement::from_attributes(
            &attrs(&[
                ("id", "2"),
                ("count", "3"),
                ("extra_slots", "20"),
                ("HitInformation", "[[3,-1,-1,1,-1,-1]]"),
            ]),
            &catalogue(),
        )
        .unwrap();
        assert_eq!(element.name, "pkg.Foo.baz()");
        assert_eq!(element.extra_slot, Some(20));
        assert_eq!(element.hits.len(), 1);
        assert!(element.is_count_consistent());
    }

    #[test]
    fn test_from_attributes_zero_count_skips_hits() {
        let element = TraceElement::from_attributes(
            &attrs(&[("id", "2"), ("count", "0"), ("extra_slots", "20")]),
            &catalogue(),
        )
        .unwrap();
        assert!(!element.has_count());
        assert!(element.hits.is_empty());
    }

    #[test]
    fn test_from_attributes_unknown_id() {
        let err = TraceElement::from_attributes(&attrs(&[("id", "9"), ("count", "1")]), &catalogue())
            .unwrap_err();
        assert!(matches!(err, TraceError::MalformedRecord { .. }));
        assert!(err.to_string().contains("catalogue"));
    }

    #[test]
    fn test_from_attributes_missing_hits() {
        let err = TraceElement::from_attributes(&attrs(&[("id", "2"), ("count", "1")]), &catalogue())
            .unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("HitInformation"));
    }

    #[test]
    fn test_edges_resolve_through_catalogue() {
        let mut element = TraceElement::new(MethodIdentity::new(2, 20), "pkg.Foo.baz()", 1)
            .with_hits(vec![HitInformation::from_tuple([1, 10, 1, 1, -1, -1])]);
        assert_eq!(element.execution_edges()[0].caller, UNKNOWN_CALLER);

        element.set_previous_method(&catalogue());
        assert_eq!(
            element.execution_edges(),
            [Edge::new("pkg.FooTest.testBar()", "pkg.Foo.baz()")]
        );
        assert_eq!(
            element.call_graph_edges(),
            [Edge::new("pkg.FooTest.testBar()", "pkg.Foo.baz()")]
        );
        assert_eq!(element.execution_edges_num(), [(10, 20)]);
        assert_eq!(element.call_graph_edges_num(), [(1, 20)]);
    }

    #[test]
    fn test_split_by_test_slots_recomputes_counts() {
        let element = TraceElement::new(MethodIdentity::new(2, 20), "pkg.Foo.baz()", 6).with_hits(vec![
            HitInformation::from_tuple([1, -1, -1, 1, -1, -1]),
            HitInformation::from_tuple([2, -1, -1, 1, -1, -1]),
            HitInformation::from_tuple([3, -1, -1, 5, 7, 8]),
            HitInformation::from_tuple([4, -1, -1, -1, -1, -1]),
        ]);
        let fragments = element.split_by_test_slots();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[&InvocationKey::new(1, -1, -1)].count, 3);
        assert_eq!(fragments[&InvocationKey::new(5, 7, 8)].count, 3);
        assert!(fragments.values().all(TraceElement::is_count_consistent));
    }
}
