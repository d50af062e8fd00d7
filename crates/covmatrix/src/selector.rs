//! Differential Component Selector
//!
//! Narrows per-test traces to the components that discriminate failing
//! runs from passing ones:
//!
//! ```text
//! fail  = ⋃ components(t)  for failing t
//! fail -= ⋃ components(t)  for passing t      (FailureExclusive only)
//! fail -= test classes, test methods
//! keep(t) = components(t) ∩ fail,  drop t when empty
//! buggy = normalize(bugs) ∩ all ∩ ⋃ keep(t)
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::component::{class_portion, normalize_component, simple_name, strip_arguments, Granularity};
use crate::trace::Trace;

/// Pass/fail label of one test
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Outcome {
    /// Label 0
    #[default]
    Pass,
    /// Label 1
    Fail,
}

impl Outcome {
    /// Numeric label used in the emitted artifacts
    #[must_use]
    pub const fn label(self) -> u8 {
        match self {
            Self::Pass => 0,
            Self::Fail => 1,
        }
    }

    /// Inverse of [`Self::label`]; any non-zero label is a failure
    #[must_use]
    pub const fn from_label(label: u8) -> Self {
        if label == 0 {
            Self::Pass
        } else {
            Self::Fail
        }
    }

    /// Whether this is a failure
    #[must_use]
    pub const fn is_failing(self) -> bool {
        matches!(self, Self::Fail)
    }
}

/// Tests observed to fail, matched on lower-cased names without arguments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerTests {
    names: BTreeSet<String>,
}

impl TriggerTests {
    /// Build from failing test names as listed in the trigger-tests file
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names.into_iter().map(|n| Self::key(n.as_ref())).collect(),
        }
    }

    fn key(name: &str) -> String {
        strip_arguments(name).to_lowercase()
    }

    /// Label for a test's qualified name
    #[must_use]
    pub fn outcome_of(&self, test: &str) -> Outcome {
        if self.names.contains(&Self::key(test)) {
            Outcome::Fail
        } else {
            Outcome::Pass
        }
    }

    /// Number of trigger tests
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no test is known to fail
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// How the failure component set is formed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComponentPolicy {
    /// Components of failing tests that no passing test touches
    #[default]
    #[serde(rename = "exclusive")]
    FailureExclusive,
    /// Every component of a failing test
    #[serde(rename = "union")]
    FailureUnion,
}

/// Selector options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Failure component policy
    pub policy: ComponentPolicy,
    /// Component granularity
    pub granularity: Granularity,
}

impl SelectorConfig {
    /// Create a builder
    #[must_use]
    pub fn builder() -> SelectorConfigBuilder {
        SelectorConfigBuilder::default()
    }
}

/// Builder for [`SelectorConfig`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorConfigBuilder {
    config: SelectorConfig,
}

impl SelectorConfigBuilder {
    /// Set the component policy
    #[must_use]
    pub const fn policy(mut self, policy: ComponentPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// Set the granularity
    #[must_use]
    pub const fn granularity(mut self, granularity: Granularity) -> Self {
        self.config.granularity = granularity;
        self
    }

    /// Build the configuration
    #[must_use]
    pub const fn build(self) -> SelectorConfig {
        self.config
    }
}

/// One matrix row: `[test, [component, ...], label]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRecord {
    /// Qualified test method name
    pub test: String,
    /// Sorted components exercised by the test
    pub components: Vec<String>,
    /// Pass/fail label
    pub outcome: Outcome,
}

impl ActivationRecord {
    /// Create a record
    #[must_use]
    pub fn new(test: impl Into<String>, components: impl IntoIterator<Item = String>, outcome: Outcome) -> Self {
        let components: BTreeSet<String> = components.into_iter().collect();
        Self {
            test: test.into(),
            components: components.into_iter().collect(),
            outcome,
        }
    }
}

impl Serialize for ActivationRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.test, &self.components, self.outcome.label()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ActivationRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (test, components, label) = <(String, Vec<String>, u8)>::deserialize(deserializer)?;
        Ok(Self::new(test, components, Outcome::from_label(label)))
    }
}

/// Result of one selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Trimmed rows, tests with no surviving component removed
    pub retained: Vec<ActivationRecord>,
    /// Every input row before trimming
    pub untrimmed: Vec<ActivationRecord>,
    /// Surviving failure components
    pub fail_components: BTreeSet<String>,
    /// Components of every input row
    pub all_components: BTreeSet<String>,
    /// Known-buggy components that survive into the retained rows
    pub buggy: BTreeSet<String>,
}

impl Selection {
    /// Whether any buggy component survived, i.e. the failure is traceable
    #[must_use]
    pub fn is_localizable(&self) -> bool {
        !self.buggy.is_empty()
    }

    /// Number of retained failing tests
    #[must_use]
    pub fn failing_count(&self) -> usize {
        self.retained
            .iter()
            .filter(|r| r.outcome.is_failing())
            .count()
    }
}

/// Applies the differencing policy to per-test traces
#[derive(Debug, Clone, Copy, Default)]
pub struct DifferentialSelector {
    config: SelectorConfig,
}

impl DifferentialSelector {
    /// Create a selector
    #[must_use]
    pub const fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &SelectorConfig {
        &self.config
    }

    fn is_test_class(&self, component: &str) -> bool {
        let class = match self.config.granularity {
            Granularity::Methods => class_portion(component),
            Granularity::Files => simple_name(component),
        };
        class.to_lowercase().ends_with("test")
    }

    /// Render per-test traces as labelled rows; traces without components are left out
    #[must_use]
    pub fn records(&self, traces: &BTreeMap<String, Trace>, triggers: &TriggerTests) -> Vec<ActivationRecord> {
        traces
            .iter()
            .filter_map(|(test, trace)| {
                let components = trace.components(self.config.granularity);
                (!components.is_empty())
                    .then(|| ActivationRecord::new(test.as_str(), components, triggers.outcome_of(test)))
            })
            .collect()
    }

    /// Label, render and select per-test traces
    #[must_use]
    pub fn select(
        &self,
        traces: &BTreeMap<String, Trace>,
        triggers: &TriggerTests,
        bugs: &[String],
    ) -> Selection {
        self.select_records(self.records(traces, triggers), bugs)
    }

    /// Select over already rendered rows
    #[must_use]
    pub fn select_records(&self, records: Vec<ActivationRecord>, bugs: &[String]) -> Selection {
        let mut fail_components = BTreeSet::new();
        let mut pass_components = BTreeSet::new();
        let mut all_components = BTreeSet::new();
        let mut test_names = BTreeSet::new();

        for record in &records {
            let target = if record.outcome.is_failing() {
                &mut fail_components
            } else {
                &mut pass_components
            };
            target.extend(record.components.iter().cloned());
            all_components.extend(record.components.iter().cloned());
            test_names.insert(record.test.clone());
            test_names.insert(record.test.to_lowercase());
        }

        if self.config.policy == ComponentPolicy::FailureExclusive {
            fail_components.retain(|c| !pass_components.contains(c));
        }
        fail_components.retain(|c| !self.is_test_class(c));
        fail_components.retain(|c| !test_names.contains(c));

        let retained: Vec<ActivationRecord> = records
            .iter()
            .filter_map(|record| {
                let kept: Vec<String> = record
                    .components
                    .iter()
                    .filter(|c| fail_components.contains(*c))
                    .cloned()
                    .collect();
                (!kept.is_empty()).then(|| ActivationRecord {
                    test: record.test.clone(),
                    components: kept,
                    outcome: record.outcome,
                })
            })
            .collect();

        let retained_union: BTreeSet<&String> = retained.iter().flat_map(|r| &r.components).collect();
        let buggy: BTreeSet<String> = bugs
            .iter()
            .map(|bug| normalize_component(&self.config.granularity.render(bug)))
            .filter(|bug| all_components.contains(bug) && retained_union.contains(bug))
            .collect();

        debug!(
            pass_components = pass_components.len(),
            test_names = test_names.len(),
            "component sets built"
        );
        info!(
            policy = ?self.config.policy,
            tests = records.len(),
            retained = retained.len(),
            fail_components = fail_components.len(),
            all_components = all_components.len(),
            buggy = buggy.len(),
            "selected components"
        );

        Selection {
            retained,
            untrimmed: records,
            fail_components,
            all_components,
            buggy,
        }
    }
}
