//! Terminal reporting of pipeline stages
//!
//! Everything goes to stderr so `plan` output on stdout stays pipeable.

use std::fmt::Display;
use std::path::Path;

use console::{style, Term};
use covmatrix::catalogue::MethodCatalogue;
use covmatrix::selector::Selection;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{CliConfig, Verbosity};

/// What happened to an artifact a command is responsible for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The file was written
    Written,
    /// Inputs did not warrant the file
    Skipped,
    /// The inputs contradict each other; reported even in quiet mode
    Stale,
}

impl Stage {
    fn marker(self, use_color: bool) -> String {
        match (self, use_color) {
            (Self::Written, true) => style("✓").green().bold().to_string(),
            (Self::Skipped, true) => style("-").yellow().bold().to_string(),
            (Self::Stale, true) => style("✗").red().bold().to_string(),
            (Self::Written, false) => "OK".to_string(),
            (Self::Skipped, false) => "SKIP".to_string(),
            (Self::Stale, false) => "STALE".to_string(),
        }
    }
}

/// Stage reporter for the matrix, call-graph and inspect commands
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    use_color: bool,
    verbosity: Verbosity,
}

impl ProgressReporter {
    /// Create a reporter
    #[must_use]
    pub fn new(use_color: bool, verbosity: Verbosity) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            verbosity,
        }
    }

    /// Reporter honoring the global `--color` and verbosity flags
    #[must_use]
    pub fn from_config(config: &CliConfig) -> Self {
        Self::new(config.color.should_color(), config.verbosity)
    }

    fn write(&self, line: &str) {
        // A closed stderr is not worth failing the run over.
        let _ = self.term.write_line(line);
    }

    fn dim(&self, text: &str) -> String {
        if self.use_color {
            style(text).dim().to_string()
        } else {
            text.to_string()
        }
    }

    /// Catalogue and line index built from the result file
    pub fn catalogue_indexed(&self, catalogue: &MethodCatalogue, result_file: &Path, coverage_lines: usize) {
        if self.verbosity.is_quiet() {
            return;
        }
        self.write(&format!(
            "Indexed {} methods ({} slots, {coverage_lines} coverage lines) from {}",
            catalogue.len(),
            catalogue.slot_count(),
            result_file.display()
        ));
    }

    /// Start the per-file progress bar
    pub fn start_reading(&mut self, files: usize) {
        if self.verbosity.is_quiet() {
            return;
        }
        let pb = ProgressBar::new(u64::try_from(files).unwrap_or(u64::MAX));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message("reading dumps");
        self.progress_bar = Some(pb);
    }

    /// One dump file consumed, parsed or skipped
    pub fn file_read(&self, path: &Path) {
        if let Some(ref pb) = self.progress_bar {
            if let Some(name) = path.file_name() {
                pb.set_message(name.to_string_lossy().into_owned());
            }
            pb.inc(1);
        }
    }

    /// Clear the bar and report how many dumps parsed
    pub fn finish_reading(&self, read: usize, total: usize) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
        if self.verbosity.is_quiet() {
            return;
        }
        let skipped = total.saturating_sub(read);
        if skipped == 0 {
            self.write(&format!("Read {read} dump files"));
        } else {
            self.write(&format!("Read {read} of {total} dump files ({skipped} malformed, skipped)"));
        }
    }

    /// Dumps split into per-test traces
    pub fn traces_split(&self, dumps: usize, tests: usize) {
        if self.verbosity.is_quiet() {
            return;
        }
        self.write(&format!("Split {dumps} dumps into {tests} test traces"));
    }

    /// Outcome of the differential selection
    pub fn selection(&self, selection: &Selection) {
        if self.verbosity.is_quiet() {
            return;
        }
        let localizable = selection.is_localizable();
        let status = match (localizable, self.use_color) {
            (true, true) => style("LOCALIZABLE").green().bold().to_string(),
            (false, true) => style("NOT LOCALIZABLE").yellow().bold().to_string(),
            (true, false) => "LOCALIZABLE".to_string(),
            (false, false) => "NOT LOCALIZABLE".to_string(),
        };
        self.write(&format!(
            "{status} {} subtraces selected ({} failing), {} failure components, {} buggy",
            selection.retained.len(),
            selection.failing_count(),
            selection.fail_components.len(),
            selection.buggy.len()
        ));
    }

    /// Report an artifact: the path when written, the reason otherwise
    pub fn artifact(&self, stage: Stage, what: &str, detail: impl Display) {
        if self.verbosity.is_quiet() && stage != Stage::Stale {
            return;
        }
        let marker = stage.marker(self.use_color);
        match stage {
            Stage::Written => self.write(&format!("{marker} {what} written: {detail}")),
            Stage::Skipped | Stage::Stale => self.write(&format!("{marker} {what} not written: {detail}")),
        }
    }

    /// A `label: value` line shown only with `-v`
    pub fn detail(&self, label: &str, value: impl Display) {
        if self.verbosity.is_verbose() {
            self.write(&format!("  {}: {value}", self.dim(label)));
        }
    }

    /// Heading of an `inspect` section
    pub fn section(&self, title: &str) {
        if self.verbosity.is_quiet() {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        self.write("");
        self.write(&styled);
    }

    /// A `label: value` line of an `inspect` section
    pub fn entry(&self, label: &str, value: impl Display) {
        if self.verbosity.is_quiet() {
            return;
        }
        self.write(&format!("  {}: {value}", self.dim(label)));
    }
}
