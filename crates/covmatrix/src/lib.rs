//! covmatrix: Fault-Localization Matrices from JCov Method Coverage
//!
//! Parses the per-run method-coverage dumps of the JCov instrumentation
//! agent, recovers one execution trace per test from the interleaved dump,
//! and emits the `(test, components, failed)` rows a spectrum-based
//! fault-localization engine consumes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      COVMATRIX Pipeline                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Dump files │    │ Aggregate  │    │ Per-test   │            │
//! │   │ (JCov XML) │───►│ Trace      │───►│ Traces     │            │
//! │   │            │    │ (reader)   │    │ (split)    │            │
//! │   └────────────┘    └────────────┘    └─────┬──────┘            │
//! │                                             │                   │
//! │   ┌────────────┐    ┌────────────┐    ┌─────▼──────┐            │
//! │   │ Planning   │◄───│ Emitter    │◄───│ Selector   │◄── labels  │
//! │   │ file       │    │            │    │            │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │                                                                 │
//! │   analyzer edges ──► CallGraph ──► relevant tests/nodes ──► plan │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use covmatrix::prelude::*;
//!
//! # fn main() -> TraceResult<()> {
//! let reader = TraceReader::from_dir("dumps", &ReaderConfig::default())?;
//! let layout = ArtifactLayout::new("work");
//! let triggers = TriggerTests::new(read_name_list(&layout.trigger_tests())?);
//! let bugs = read_name_list(&layout.bugs())?;
//!
//! let selector = DifferentialSelector::default();
//! for trace in reader.read_all()? {
//!     let selection = selector.select(&trace.split_to_subtraces(), &triggers, &bugs);
//!     MatrixEmitter::new(layout.clone(), TracePass::Sanity).emit(&selection)?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Call-graph reachability filter
#[allow(clippy::missing_errors_doc)]
pub mod callgraph;

/// Identifier catalogue
#[allow(clippy::missing_errors_doc)]
pub mod catalogue;

/// Component normalization
pub mod component;

/// Matrix and planning file emission
#[allow(clippy::missing_errors_doc)]
pub mod emitter;

/// Work-directory file names and JSON helpers
#[allow(clippy::missing_errors_doc)]
pub mod layout;

/// Dump document scanning over quick-xml events
pub mod markup;

/// Next-pass planning
#[allow(clippy::missing_errors_doc)]
pub mod plan;

/// Dump file reader
#[allow(clippy::missing_errors_doc)]
pub mod reader;

mod result;

/// Differential component selection
pub mod selector;

/// VM descriptor decoding
#[allow(clippy::missing_errors_doc)]
pub mod signature;

/// Trace model and per-test splitting
pub mod trace;

pub use result::{TraceError, TraceResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::callgraph::{CallGraph, CallGraphConfig, CallGraphFilter, GexfWriter, Relevance};
    pub use super::catalogue::{MethodCatalogue, MethodIdentity, UNKNOWN_CALLER};
    pub use super::component::{normalize_component, Granularity};
    pub use super::emitter::{EmitReport, JsonPlanningWriter, MatrixEmitter, PlanningWriter};
    pub use super::layout::{read_name_list, write_json, ArtifactLayout, TracePass};
    pub use super::plan::{plan_from_layout, plan_pass, PlanInputs, RunSelection};
    pub use super::reader::{ReaderConfig, TraceReader};
    pub use super::result::{TraceError, TraceResult};
    pub use super::selector::{
        ActivationRecord, ComponentPolicy, DifferentialSelector, Outcome, Selection,
        SelectorConfig, TriggerTests,
    };
    pub use super::signature::Signature;
    pub use super::trace::{
        split_all, Edge, HitInformation, InvocationKey, NamingConvention, TestPredicate, Trace,
        TraceElement,
    };
}
