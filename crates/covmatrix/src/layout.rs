//! Artifact Layout
//!
//! Fixed file names of one experiment's work directory, shared by the
//! tracing passes and the call-graph filter.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::result::{TraceError, TraceResult};

/// Which tracing pass produced (or will produce) a dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracePass {
    /// Trigger tests only, traced over the bug and trigger classes
    #[default]
    Sanity,
    /// All relevant tests, traced over the relevant call-graph nodes
    Full,
}

impl TracePass {
    /// Lower-case name used in file names
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sanity => "sanity",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for TracePass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TracePass {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sanity" => Ok(Self::Sanity),
            "full" => Ok(Self::Full),
            other => Err(TraceError::configuration(format!("unknown trace pass: {other}"))),
        }
    }
}

/// File names of one experiment, relative to a work directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    /// Layout rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Work directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Known-buggy qualified method names
    #[must_use]
    pub fn bugs(&self) -> PathBuf {
        self.root.join("bugs.json")
    }

    /// Failing test names
    #[must_use]
    pub fn trigger_tests(&self) -> PathBuf {
        self.root.join("trigger_tests.json")
    }

    /// Tests left out of later passes
    #[must_use]
    pub fn tests_to_exclude(&self) -> PathBuf {
        self.root.join("tests_to_exclude.json")
    }

    /// Call-graph exchange file
    #[must_use]
    pub fn call_graph(&self) -> PathBuf {
        self.root.join("call_graph.gexf")
    }

    /// Relevant test classes of the call graph
    #[must_use]
    pub fn call_graph_tests(&self) -> PathBuf {
        self.root.join("call_graph_tests.json")
    }

    /// Relevant nodes of the call graph
    #[must_use]
    pub fn call_graph_nodes(&self) -> PathBuf {
        self.root.join("call_graph_nodes.json")
    }

    /// Trimmed matrix rows of a pass
    #[must_use]
    pub fn test_details(&self, pass: TracePass) -> PathBuf {
        self.root.join(format!("test_details_{pass}.json"))
    }

    /// Untrimmed matrix rows of a pass
    #[must_use]
    pub fn untrimmed_test_details(&self, pass: TracePass) -> PathBuf {
        self.root.join(format!("test_details_{pass}.json2"))
    }

    /// Planning file; the index only applies to full passes
    #[must_use]
    pub fn matrix(&self, pass: TracePass, index: usize) -> PathBuf {
        match pass {
            TracePass::Sanity => self.root.join("matrix_sanity.json"),
            TracePass::Full => self.root.join(format!("matrix_{index}_full.json")),
        }
    }
}

/// Read a JSON document
pub fn read_json<T: DeserializeOwned>(path: &Path) -> TraceResult<T> {
    let file = File::open(path).map_err(|e| {
        TraceError::configuration(format!("cannot open {}: {e}", path.display()))
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Read a JSON list of names
pub fn read_name_list(path: &Path) -> TraceResult<Vec<String>> {
    read_json(path)
}

/// Write a JSON document, creating parent directories
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> TraceResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}
