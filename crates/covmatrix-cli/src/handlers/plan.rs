//! Plan command handler

use covmatrix::layout::{ArtifactLayout, TracePass};
use covmatrix::plan::{plan_from_layout, RunSelection};
use covmatrix::TraceError;

use super::resolve_dir;
use crate::commands::PlanArgs;
use crate::config::CliConfig;
use crate::error::CliResult;

/// Execute the plan command
pub fn execute_plan(config: &CliConfig, args: &PlanArgs) -> CliResult<()> {
    let experiment = &config.experiment;
    let layout = ArtifactLayout::new(resolve_dir(args.work_dir.as_deref(), experiment, "--work-dir")?);
    let pass: TracePass = args.pass.map(Into::into).or(experiment.pass).unwrap_or_default();

    let selection = plan_from_layout(&layout, pass)?;
    if args.json {
        let json = serde_json::to_string_pretty(&selection).map_err(TraceError::from)?;
        println!("{json}");
    } else {
        print!("{}", render_selection(&selection));
    }
    Ok(())
}

/// Human-readable run selection
#[must_use]
pub fn render_selection(selection: &RunSelection) -> String {
    let mut out = format!("Pass: {}\n", selection.pass);
    if !selection.is_restricted() {
        out.push_str("Unrestricted: trace every class and run every test\n");
    }
    let sections = [
        ("Classes to trace", &selection.classes_to_trace),
        ("Tests to run", &selection.tests_to_run),
        ("Tests to exclude", &selection.tests_to_exclude),
    ];
    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        out.push_str(&format!("{title} ({}):\n", items.len()));
        for item in items {
            out.push_str(&format!("  {item}\n"));
        }
    }
    out
}
