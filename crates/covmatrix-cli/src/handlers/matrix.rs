//! Matrix command handler

use covmatrix::emitter::MatrixEmitter;
use covmatrix::layout::{read_name_list, ArtifactLayout, TracePass};
use covmatrix::reader::ReaderConfig;
use covmatrix::selector::{DifferentialSelector, SelectorConfig, TriggerTests};
use covmatrix::trace::split_all;
use tracing::{info, warn};

use super::{open_reader, resolve_dir};
use crate::commands::MatrixArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{ProgressReporter, Stage};

/// Reader options: experiment file first, flags on top
#[must_use]
pub fn reader_config(base: ReaderConfig, args: &MatrixArgs) -> ReaderConfig {
    ReaderConfig::builder()
        .method_only(base.method_only && !args.blocks)
        .short_type(base.short_type && !args.long_types)
        .build()
}

/// Selector options: experiment file first, flags on top
#[must_use]
pub fn selector_config(base: SelectorConfig, args: &MatrixArgs) -> SelectorConfig {
    SelectorConfig::builder()
        .policy(args.policy.map_or(base.policy, Into::into))
        .granularity(args.granularity.map_or(base.granularity, Into::into))
        .build()
}

/// Execute the matrix command
pub fn execute_matrix(config: &CliConfig, args: &MatrixArgs) -> CliResult<()> {
    let experiment = &config.experiment;
    let layout = ArtifactLayout::new(resolve_dir(args.out_dir.as_deref(), experiment, "--out-dir")?);
    let pass: TracePass = args.pass.map(Into::into).or(experiment.pass).unwrap_or_default();
    let index = args.index.or(experiment.index).unwrap_or(0);

    let bugs = read_name_list(&args.bugs)?;
    let triggers = TriggerTests::new(read_name_list(&args.trigger_tests)?);

    let mut reporter = ProgressReporter::from_config(config);
    let mut reader = open_reader(&args.dump, &reader_config(experiment.reader, args))?;
    reporter.catalogue_indexed(reader.catalogue(), reader.result_file(), reader.line_index().len());
    if args.delete_dumps || experiment.delete_dumps {
        if args.dump.is_dir() {
            reader = reader.delete_when_done(&args.dump);
        } else {
            warn!(dump = %args.dump.display(), "dump is a single file; nothing deleted");
        }
    }

    reporter.start_reading(reader.files().len());
    let traces = reader.read_all_with(|path| reporter.file_read(path))?;
    reporter.finish_reading(traces.len(), reader.files().len());

    let subtraces = split_all(&traces);
    info!(dumps = traces.len(), tests = subtraces.len(), "split dumps into per-test traces");
    reporter.traces_split(traces.len(), subtraces.len());

    let selector = DifferentialSelector::new(selector_config(experiment.selector, args));
    let selection = selector.select(&subtraces, &triggers, &bugs);
    let report = MatrixEmitter::new(layout, pass).with_index(index).emit(&selection)?;

    reporter.selection(&selection);
    reporter.detail("test details", report.details.display());
    reporter.detail("untrimmed details", report.untrimmed.display());
    match report.matrix {
        Some(path) => reporter.artifact(Stage::Written, "Planning file", path.display()),
        None => reporter.artifact(
            Stage::Skipped,
            "Planning file",
            "no bug is covered by the failing tests",
        ),
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::commands::{GranularityArg, PolicyArg};
    use crate::config::{ExperimentConfig, Verbosity};
    use covmatrix::component::Granularity;
    use covmatrix::selector::ComponentPolicy;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const DUMP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<coverage>
<package name="pkg">
<class name="FooTest">
<meth name="testBar" vmsig="()V" id="1" extra_slots="10" count="1" HitInformation="[[1,-1,-1,-1,-1,-1]]"/>
<meth name="testOk" vmsig="()V" id="2" extra_slots="20" count="1" HitInformation="[[1,-1,-1,-1,-1,-1]]"/>
</class>
<class name="Foo">
<meth name="baz" vmsig="()V" id="3" extra_slots="30" count="2" HitInformation="[[2,10,10,1,-1,-1]]"/>
<meth name="qux" vmsig="()V" id="4" extra_slots="40" count="2" HitInformation="[[1,10,10,1,-1,-1],[1,20,20,2,-1,-1]]"/>
</class>
</package>
</coverage>
"#;

    fn args(dir: &Path) -> MatrixArgs {
        MatrixArgs {
            dump: dir.join("result.xml"),
            bugs: dir.join("bugs.json"),
            trigger_tests: dir.join("trigger_tests.json"),
            out_dir: Some(dir.join("work")),
            pass: None,
            index: None,
            granularity: None,
            policy: None,
            blocks: false,
            long_types: false,
            delete_dumps: false,
        }
    }

    fn fixture(bugs: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("result.xml"), DUMP).unwrap();
        std::fs::write(dir.path().join("bugs.json"), bugs).unwrap();
        std::fs::write(dir.path().join("trigger_tests.json"), r#"["pkg.FooTest.testBar"]"#).unwrap();
        dir
    }

    fn quiet() -> CliConfig {
        CliConfig::new().with_verbosity(Verbosity::Quiet)
    }

    #[test]
    fn test_flags_override_experiment() {
        let mut a = args(Path::new("."));
        a.blocks = true;
        a.policy = Some(PolicyArg::Union);
        a.granularity = Some(GranularityArg::Files);

        let reader = reader_config(ReaderConfig::default(), &a);
        assert!(!reader.method_only);
        assert!(reader.short_type);

        let selector = selector_config(SelectorConfig::default(), &a);
        assert_eq!(selector.policy, ComponentPolicy::FailureUnion);
        assert_eq!(selector.granularity, Granularity::Files);
    }

    #[test]
    fn test_experiment_used_without_flags() {
        let a = args(Path::new("."));
        let base = SelectorConfig::builder().policy(ComponentPolicy::FailureUnion).build();
        assert_eq!(selector_config(base, &a).policy, ComponentPolicy::FailureUnion);
    }

    #[test]
    fn test_localizable_run_writes_planning_file() {
        let dir = fixture(r#"["pkg.Foo.baz()"]"#);
        execute_matrix(&quiet(), &args(dir.path())).unwrap();

        let work = dir.path().join("work");
        assert!(work.join("test_details_sanity.json").exists());
        assert!(work.join("test_details_sanity.json2").exists());
        let planning: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(work.join("matrix_sanity.json")).unwrap()).unwrap();
        assert_eq!(planning["bugs"], serde_json::json!(["pkg.foo.baz()"]));
        assert_eq!(planning["initial_tests"], serde_json::json!(["pkg.FooTest.testBar()"]));
    }

    #[test]
    fn test_unlocalizable_run_skips_planning_file() {
        let dir = fixture(r#"["pkg.Foo.qux()"]"#);
        execute_matrix(&quiet(), &args(dir.path())).unwrap();

        let work = dir.path().join("work");
        assert!(work.join("test_details_sanity.json").exists());
        assert!(!work.join("matrix_sanity.json").exists());
    }

    #[test]
    fn test_full_pass_uses_index() {
        let dir = fixture(r#"["pkg.Foo.baz()"]"#);
        let mut a = args(dir.path());
        a.pass = Some(crate::commands::PassArg::Full);
        a.index = Some(4);
        execute_matrix(&quiet(), &a).unwrap();
        assert!(dir.path().join("work/matrix_4_full.json").exists());
    }

    #[test]
    fn test_work_dir_from_experiment() {
        let dir = fixture(r#"["pkg.Foo.baz()"]"#);
        let mut a = args(dir.path());
        a.out_dir = None;
        let config = quiet().with_experiment(ExperimentConfig {
            work_dir: Some(dir.path().join("exp")),
            ..ExperimentConfig::default()
        });
        execute_matrix(&config, &a).unwrap();
        assert!(dir.path().join("exp/matrix_sanity.json").exists());
    }

    #[test]
    fn test_delete_dumps_removes_directory() {
        let dir = fixture(r#"["pkg.Foo.baz()"]"#);
        let dumps = dir.path().join("dumps");
        std::fs::create_dir(&dumps).unwrap();
        std::fs::rename(dir.path().join("result.xml"), dumps.join("result.xml")).unwrap();

        let mut a = args(dir.path());
        a.dump = dumps.clone();
        a.delete_dumps = true;
        execute_matrix(&quiet(), &a).unwrap();
        assert!(!dumps.exists());
        assert!(dir.path().join("work/matrix_sanity.json").exists());
    }

    #[test]
    fn test_delete_dumps_from_experiment() {
        let dir = fixture(r#"["pkg.Foo.baz()"]"#);
        let dumps = dir.path().join("dumps");
        std::fs::create_dir(&dumps).unwrap();
        std::fs::rename(dir.path().join("result.xml"), dumps.join("result.xml")).unwrap();

        let mut a = args(dir.path());
        a.dump = dumps.clone();
        let config = quiet().with_experiment(ExperimentConfig {
            delete_dumps: true,
            ..ExperimentConfig::default()
        });
        execute_matrix(&config, &a).unwrap();
        assert!(!dumps.exists());
    }

    #[test]
    fn test_dumps_kept_by_default() {
        let dir = fixture(r#"["pkg.Foo.baz()"]"#);
        execute_matrix(&quiet(), &args(dir.path())).unwrap();
        assert!(dir.path().join("result.xml").exists());
    }

    #[test]
    fn test_missing_bugs_file() {
        let dir = fixture("[]");
        let mut a = args(dir.path());
        a.bugs = PathBuf::from("/nonexistent/bugs.json");
        assert!(execute_matrix(&quiet(), &a).is_err());
    }
}
