//! Trace Reader
//!
//! Turns JCov dump files into aggregate [`Trace`]s.
//!
//! Every file of one experiment shares the line layout of the authoritative
//! result file, so the reader scans that file once for coverage-bearing line
//! numbers and then, per file, only parses the lines at those positions.
//!
//! ```text
//! result file ──► MethodCatalogue (ids, slots, prefixes)
//!      │
//!      └───────► line index [12, 14, 19, ...]
//!                     │
//! dump_1.xml ─────────┼──► Trace "dump_1"
//! dump_2.xml ─────────┴──► Trace "dump_2"
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalogue::MethodCatalogue;
use crate::markup::{self, CLOSER};
use crate::result::{TraceError, TraceResult};
use crate::trace::{Trace, TraceElement};

/// Token identifying the authoritative dump file
pub const RESULT_TOKEN: &str = "result";

/// Options that shape catalogue construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Only method-entry lines carry coverage
    pub method_only: bool,
    /// Render argument types by their last path segment
    pub short_type: bool,
}

impl ReaderConfig {
    /// Create a builder
    #[must_use]
    pub fn builder() -> ReaderConfigBuilder {
        ReaderConfigBuilder::default()
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            method_only: true,
            short_type: true,
        }
    }
}

/// Builder for [`ReaderConfig`]
#[derive(Debug, Clone, Copy)]
pub struct ReaderConfigBuilder {
    config: ReaderConfig,
}

impl Default for ReaderConfigBuilder {
    fn default() -> Self {
        Self {
            config: ReaderConfig::default(),
        }
    }
}

impl ReaderConfigBuilder {
    /// Restrict coverage to method-entry lines
    #[must_use]
    pub const fn method_only(mut self, enabled: bool) -> Self {
        self.config.method_only = enabled;
        self
    }

    /// Shorten argument types
    #[must_use]
    pub const fn short_type(mut self, enabled: bool) -> Self {
        self.config.short_type = enabled;
        self
    }

    /// Build the configuration
    #[must_use]
    pub const fn build(self) -> ReaderConfig {
        self.config
    }
}

/// Pick the file whose name contains [`RESULT_TOKEN`], case-insensitively
pub fn select_result_file(files: &[PathBuf]) -> TraceResult<&Path> {
    files
        .iter()
        .find(|path| {
            path.file_name()
                .is_some_and(|n| n.to_string_lossy().to_lowercase().contains(RESULT_TOKEN))
        })
        .map(PathBuf::as_path)
        .ok_or_else(|| {
            TraceError::configuration(format!(
                "none of {} dump files has \"{RESULT_TOKEN}\" in its name",
                files.len()
            ))
        })
}

/// Whether a line carries coverage for one of `prefixes`
#[must_use]
pub fn is_coverage_line<S: AsRef<str>>(line: &str, prefixes: impl IntoIterator<Item = S>) -> bool {
    line.contains(CLOSER)
        && markup::leading_tag_name(line)
            .is_some_and(|tag| prefixes.into_iter().any(|p| tag.starts_with(p.as_ref())))
}

/// Zero-based numbers of the coverage-bearing lines of `path`
pub fn coverage_line_index(path: &Path, catalogue: &MethodCatalogue) -> TraceResult<Vec<usize>> {
    let reader = BufReader::new(File::open(path)?);
    let mut index = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        if is_coverage_line(&line?, catalogue.prefixes()) {
            index.push(number);
        }
    }
    Ok(index)
}

/// Name of the trace read from `path`: the lower-cased file stem
#[must_use]
pub fn trace_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Reads every dump file of one experiment against a shared catalogue
#[derive(Debug, Clone)]
pub struct TraceReader {
    files: Vec<PathBuf>,
    result_file: PathBuf,
    catalogue: Arc<MethodCatalogue>,
    line_index: Arc<[usize]>,
    cleanup_dir: Option<PathBuf>,
}

impl TraceReader {
    /// Reader over all `*.xml` files of `dir`, in name order
    pub fn from_dir(dir: impl AsRef<Path>, config: &ReaderConfig) -> TraceResult<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            TraceError::configuration(format!("cannot list {}: {e}", dir.display()))
        })?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "xml") {
                files.push(path);
            }
        }
        files.sort();
        Self::from_files(files, config)
    }

    /// Reader over an explicit list of dump files
    pub fn from_files(files: Vec<PathBuf>, config: &ReaderConfig) -> TraceResult<Self> {
        if files.is_empty() {
            return Err(TraceError::configuration("no dump files to read"));
        }
        let result_file = select_result_file(&files)?.to_path_buf();
        let catalogue = MethodCatalogue::from_file(&result_file, config)?;
        let line_index = coverage_line_index(&result_file, &catalogue)?;
        info!(
            result_file = %result_file.display(),
            files = files.len(),
            coverage_lines = line_index.len(),
            "indexed coverage lines"
        );
        Ok(Self {
            files,
            result_file,
            catalogue: Arc::new(catalogue),
            line_index: line_index.into(),
            cleanup_dir: None,
        })
    }

    /// Remove `dir` once [`Self::read_all`] has consumed every file
    #[must_use]
    pub fn delete_when_done(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cleanup_dir = Some(dir.into());
        self
    }

    /// Dump files in read order
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// File the catalogue and line index came from
    #[must_use]
    pub fn result_file(&self) -> &Path {
        &self.result_file
    }

    /// Shared identifier catalogue
    #[must_use]
    pub fn catalogue(&self) -> &Arc<MethodCatalogue> {
        &self.catalogue
    }

    /// Coverage line numbers shared by every file
    #[must_use]
    pub fn line_index(&self) -> &[usize] {
        &self.line_index
    }

    /// Parse one dump file into its aggregate trace
    pub fn parse_file(&self, path: &Path) -> TraceResult<Trace> {
        let file = File::open(path).map_err(|e| TraceError::malformed(path, e.to_string()))?;
        let mut lines = BufReader::new(file).lines().enumerate();
        let mut elements: BTreeMap<i64, TraceElement> = BTreeMap::new();

        for &wanted in self.line_index.iter() {
            let line = loop {
                match lines.next() {
                    Some((number, line)) if number == wanted => {
                        break line.map_err(|e| TraceError::malformed(path, e.to_string()))?;
                    }
                    Some(_) => {}
                    None => {
                        return Err(TraceError::malformed(
                            path,
                            format!("file ends before coverage line {}", wanted + 1),
                        ));
                    }
                }
            };
            if !line.contains(CLOSER) {
                return Err(TraceError::malformed(
                    path,
                    format!("line {} is not a coverage line", wanted + 1),
                ));
            }

            let element = markup::element(&line)
                .and_then(|tag| TraceElement::from_attributes(&tag.attributes, &self.catalogue))
                .map_err(|e| e.at_line(path, wanted + 1))?;
            if !element.has_count() {
                continue;
            }
            if !element.is_count_consistent() {
                debug!(
                    id = element.id,
                    count = element.count,
                    hit_sum = element.hit_count_sum(),
                    "count differs from hit records"
                );
            }
            if elements.contains_key(&element.id) {
                return Err(TraceError::DuplicateRecord {
                    id: element.id,
                    path: path.to_path_buf(),
                });
            }
            elements.insert(element.id, element);
        }

        let mut trace = Trace::new(trace_name(path), elements);
        trace.resolve_callers(&self.catalogue);
        debug!(path = %path.display(), elements = trace.len(), "parsed dump file");
        Ok(trace)
    }

    /// Lazily parse every file in order
    pub fn traces(&self) -> impl Iterator<Item = (&Path, TraceResult<Trace>)> + '_ {
        self.files
            .iter()
            .map(|path| (path.as_path(), self.parse_file(path)))
    }

    /// Parse every file, skipping malformed ones
    pub fn read_all(&self) -> TraceResult<Vec<Trace>> {
        self.read_all_with(|_| {})
    }

    /// Parse every file, calling `on_file` after each one.
    ///
    /// Recoverable failures are logged and the file is skipped; any other
    /// failure aborts the batch.
    pub fn read_all_with(&self, mut on_file: impl FnMut(&Path)) -> TraceResult<Vec<Trace>> {
        let mut traces = Vec::with_capacity(self.files.len());
        for (path, result) in self.traces() {
            match result {
                Ok(trace) => traces.push(trace),
                Err(e) if e.is_recoverable() => warn!(error = %e, "skipping dump file"),
                Err(e) => return Err(e),
            }
            on_file(path);
        }

        if let Some(dir) = &self.cleanup_dir {
            match std::fs::remove_dir_all(dir) {
                Ok(()) => debug!(dir = %dir.display(), "removed dump directory"),
                Err(e) => warn!(dir = %dir.display(), error = %e, "could not remove dump directory"),
            }
        }
        info!(read = traces.len(), total = self.files.len(), "read dump files");
        Ok(traces)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RESULT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<coverage>
<package name="pkg">
<class name="FooTest">
<meth name="testBar" vmsig="()V" id="1" extra_slots="10" count="1" HitInformation="[[1,-1,-1,-1,-1,-1]]"/>
</class>
<class name="Foo">
<meth name="baz" vmsig="()V" id="2" extra_slots="20" count="3" HitInformation="[[3,10,10,1,-1,-1]]"/>
<meth name="idle" vmsig="(I)V" id="3" extra_slots="30" count="0"/>
</class>
</package>
</coverage>
"#;

    fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_select_result_file_case_insensitive() {
        let files = vec![PathBuf::from("a/fork1.xml"), PathBuf::from("a/MyResult.xml")];
        assert_eq!(select_result_file(&files).unwrap(), Path::new("a/MyResult.xml"));
    }

    #[test]
    fn test_select_result_file_missing() {
        let files = vec![PathBuf::from("fork1.xml")];
        let err = select_result_file(&files).unwrap_err();
        assert!(matches!(err, TraceError::Configuration { .. }));
    }

    #[test]
    fn test_is_coverage_line() {
        let prefixes = ["meth"];
        assert!(is_coverage_line(r#"  <meth id="1" count="0"/>"#, prefixes));
        assert!(!is_coverage_line(r#"<meth id="1" count="0">"#, prefixes));
        assert!(!is_coverage_line(r#"<class name="X"/>"#, prefixes));
    }

    #[test]
    fn test_builder_defaults() {
        assert_eq!(ReaderConfig::builder().build(), ReaderConfig::default());
        let config = ReaderConfig::builder().method_only(false).short_type(false).build();
        assert!(!config.method_only);
        assert!(!config.short_type);
    }

    #[test]
    fn test_reads_counted_elements_and_resolves_callers() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "result.xml", RESULT);
        let reader = TraceReader::from_files(vec![path.clone()], &ReaderConfig::default()).unwrap();
        assert_eq!(reader.line_index(), [4, 7, 8]);

        let trace = reader.parse_file(&path).unwrap();
        assert_eq!(trace.name(), "result");
        assert_eq!(trace.len(), 2);
        assert!(trace.elements().values().all(TraceElement::has_count));

        let baz = trace.get(2).unwrap();
        assert_eq!(baz.count, 3);
        assert_eq!(baz.hits[0].previous_method(), "pkg.FooTest.testBar()");
    }

    #[test]
    fn test_parsed_trace_splits_per_test() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "result.xml", RESULT);
        let reader = TraceReader::from_files(vec![path.clone()], &ReaderConfig::default()).unwrap();
        let traces = reader.parse_file(&path).unwrap().split_to_subtraces();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces["pkg.FooTest.testBar()"].get(2).unwrap().count, 3);
    }

    #[test]
    fn test_duplicate_id_is_fatal() {
        let dir = TempDir::new().unwrap();
        let result = write(&dir, "result.xml", RESULT);
        let forked = RESULT.replace(r#"id="2" extra_slots="20""#, r#"id="1" extra_slots="20""#);
        let fork = write(&dir, "fork.xml", &forked);

        let reader = TraceReader::from_files(vec![fork, result], &ReaderConfig::default()).unwrap();
        let err = reader.read_all().unwrap_err();
        assert!(matches!(err, TraceError::DuplicateRecord { id: 1, .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_malformed_file_skipped() {
        let dir = TempDir::new().unwrap();
        write(&dir, "result.xml", RESULT);
        write(&dir, "broken.xml", "<coverage>\n</coverage>\n");

        let reader = TraceReader::from_dir(dir.path(), &ReaderConfig::default()).unwrap();
        assert_eq!(reader.files().len(), 2);
        let broken = reader.parse_file(&reader.files()[0]).unwrap_err();
        assert!(broken.is_recoverable());

        let traces = reader.read_all().unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].name(), "result");
    }

    #[test]
    fn test_unreadable_hit_information_is_malformed() {
        let dir = TempDir::new().unwrap();
        let result = write(&dir, "result.xml", RESULT);
        let bad = write(
            &dir,
            "bad.xml",
            &RESULT.replace("[[3,10,10,1,-1,-1]]", "[[3,10]]"),
        );
        let reader = TraceReader::from_files(vec![bad.clone(), result], &ReaderConfig::default()).unwrap();
        assert!(matches!(
            reader.parse_file(&bad),
            Err(TraceError::MalformedRunFile { .. })
        ));
    }

    #[test]
    fn test_single_quoted_coverage_line() {
        let dir = TempDir::new().unwrap();
        let quoted = RESULT.replace(
            r#"<meth name="baz" vmsig="()V" id="2" extra_slots="20" count="3" HitInformation="[[3,10,10,1,-1,-1]]"/>"#,
            "<meth name='baz' vmsig='()V' id='2' extra_slots='20' count='3' HitInformation='[[3,10,10,1,-1,-1]]'/>",
        );
        let path = write(&dir, "result.xml", &quoted);
        let reader = TraceReader::from_files(vec![path.clone()], &ReaderConfig::default()).unwrap();
        let trace = reader.parse_file(&path).unwrap();
        assert_eq!(trace.get(2).unwrap().name, "pkg.Foo.baz()");
        assert_eq!(trace.get(2).unwrap().count, 3);
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let dir = TempDir::new().unwrap();
        let result = write(&dir, "result.xml", RESULT);
        let bad = write(&dir, "bad.xml", &RESULT.replace(r#"count="3""#, r#"count="three""#));
        let reader = TraceReader::from_files(vec![bad.clone(), result], &ReaderConfig::default()).unwrap();
        let err = reader.parse_file(&bad).unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("line 8"));
    }

    #[test]
    fn test_delete_when_done() {
        let root = TempDir::new().unwrap();
        let dumps = root.path().join("dumps");
        std::fs::create_dir(&dumps).unwrap();
        std::fs::write(dumps.join("Result.xml"), RESULT).unwrap();

        let reader = TraceReader::from_dir(&dumps, &ReaderConfig::default())
            .unwrap()
            .delete_when_done(&dumps);
        let traces = reader.read_all().unwrap();
        assert_eq!(traces[0].name(), "result");
        assert!(!dumps.exists());
    }

    #[test]
    fn test_no_result_file_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "fork.xml", RESULT);
        let err = TraceReader::from_dir(dir.path(), &ReaderConfig::default()).unwrap_err();
        assert!(matches!(err, TraceError::Configuration { .. }));
    }
}
