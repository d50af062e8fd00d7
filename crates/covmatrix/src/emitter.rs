//! Matrix/Planning Emitter
//!
//! Writes a [`Selection`] to the work directory:
//!
//! - `test_details_<pass>.json`: retained `[test, [component], label]` rows
//! - `test_details_<pass>.json2`: the same rows before trimming
//! - the planning file, only when a buggy component survived selection
//!
//! The planning format belongs to the downstream diagnoser, so it sits
//! behind [`PlanningWriter`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::layout::{write_json, ArtifactLayout, TracePass};
use crate::result::TraceResult;
use crate::selector::{ActivationRecord, Selection};

/// Writes the diagnoser's planning file
pub trait PlanningWriter {
    /// Write `rows` with the surviving `bugs` to `path`
    fn write_planning_file(
        &self,
        path: &Path,
        rows: &[ActivationRecord],
        bugs: &BTreeSet<String>,
    ) -> TraceResult<()>;
}

/// Planning file contents in the diagnoser's JSON layout
#[derive(Debug, Serialize)]
struct PlanningDocument<'a> {
    bugs: &'a BTreeSet<String>,
    initial_tests: Vec<&'a str>,
    tests_details: &'a [ActivationRecord],
}

/// `{"bugs": [...], "initial_tests": [...], "tests_details": [...]}`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPlanningWriter;

impl PlanningWriter for JsonPlanningWriter {
    fn write_planning_file(
        &self,
        path: &Path,
        rows: &[ActivationRecord],
        bugs: &BTreeSet<String>,
    ) -> TraceResult<()> {
        let document = PlanningDocument {
            bugs,
            initial_tests: rows.iter().map(|r| r.test.as_str()).collect(),
            tests_details: rows,
        };
        write_json(path, &document)
    }
}

/// Files written by one emission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitReport {
    /// Trimmed rows
    pub details: PathBuf,
    /// Untrimmed rows
    pub untrimmed: PathBuf,
    /// Planning file, `None` when the failure is not localizable
    pub matrix: Option<PathBuf>,
}

/// Emits the artifacts of one pass
#[derive(Debug, Clone)]
pub struct MatrixEmitter<W = JsonPlanningWriter> {
    layout: ArtifactLayout,
    pass: TracePass,
    index: usize,
    writer: W,
}

impl MatrixEmitter {
    /// Emitter with the JSON planning writer
    #[must_use]
    pub fn new(layout: ArtifactLayout, pass: TracePass) -> Self {
        Self {
            layout,
            pass,
            index: 0,
            writer: JsonPlanningWriter,
        }
    }
}

impl<W: PlanningWriter> MatrixEmitter<W> {
    /// Set the full-pass matrix index
    #[must_use]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Replace the planning writer
    #[must_use]
    pub fn with_writer<V: PlanningWriter>(self, writer: V) -> MatrixEmitter<V> {
        MatrixEmitter {
            layout: self.layout,
            pass: self.pass,
            index: self.index,
            writer,
        }
    }

    /// Path the planning file goes to
    #[must_use]
    pub fn matrix_path(&self) -> PathBuf {
        self.layout.matrix(self.pass, self.index)
    }

    /// Write the detail files and, when localizable, the planning file
    pub fn emit(&self, selection: &Selection) -> TraceResult<EmitReport> {
        let details = self.layout.test_details(self.pass);
        let untrimmed = self.layout.untrimmed_test_details(self.pass);
        write_json(&details, &selection.retained)?;
        write_json(&untrimmed, &selection.untrimmed)?;

        let matrix = if selection.is_localizable() {
            let path = self.matrix_path();
            self.writer
                .write_planning_file(&path, &selection.retained, &selection.buggy)?;
            info!(path = %path.display(), bugs = selection.buggy.len(), "wrote planning file");
            Some(path)
        } else {
            info!(pass = %self.pass, "no buggy component survived; planning file not written");
            None
        };

        Ok(EmitReport {
            details,
            untrimmed,
            matrix,
        })
    }
}
