//! Text rendering for CLI output.
//!
//! Each builder returns pre-formatted lines; the CLI decides where they go.

use crate::format::{DisplayRun, MISSING_TIMESTAMP};
use crate::model::{figure_name, format_arguments, RunInit};
use crate::session::{Catalog, RunDetailView, RunListView};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn catalog_summary(catalog: &Catalog) -> TextSummary {
    let mut lines = Vec::new();
    if catalog.is_empty() {
        lines.push("No processes available.".to_string());
    } else {
        lines.push("Processes:".to_string());
        let width = catalog.proc_names().map(str::len).max().unwrap_or(0);
        for p in catalog.proc_inits() {
            let args = format_arguments(&p.arguments);
            if args.is_empty() {
                lines.push(format!("  {}", p.proc_name));
            } else {
                lines.push(format!("  {:<width$}  {}", p.proc_name, args));
            }
        }
    }
    if !catalog.environment_names().is_empty() {
        lines.push(format!(
            "Environments: {}",
            catalog.environment_names().join(", ")
        ));
    }
    TextSummary { lines }
}

pub(crate) fn run_init_summary(run: &RunInit) -> TextSummary {
    let mut lines = Vec::new();
    if !run.description.trim().is_empty() {
        lines.push(format!("Description: {}", run.description));
    }
    lines.push(format!("Environment: {}", run.environment_name));
    for entry in &run.proc_inits {
        lines.push(format!(
            "  {}. {} ({})",
            entry.run_order(),
            entry.proc_name(),
            entry.arguments_str()
        ));
    }
    if run.proc_inits.is_empty() {
        lines.push("  (no processes)".to_string());
    }
    TextSummary { lines }
}

fn run_id_label(run: &DisplayRun) -> String {
    run.id
        .map(|id| id.to_string())
        .unwrap_or_else(|| MISSING_TIMESTAMP.to_string())
}

pub(crate) fn run_list_summary(view: &RunListView) -> TextSummary {
    let mut lines = Vec::new();
    if view.run_results.is_empty() {
        lines.push("No runs.".to_string());
        return TextSummary { lines };
    }
    lines.push(format!(
        "{:>5}  {:<19}  {:<19}  {:<9}  {}",
        "ID", "STARTED", "STOPPED", "STATUS", "DESCRIPTION"
    ));
    for run in &view.run_results {
        lines.push(format!(
            "{:>5}  {:<19}  {:<19}  {:<9}  {}",
            run_id_label(run),
            run.timestamp_start,
            run.timestamp_stop,
            run.status,
            run.description
        ));
    }
    TextSummary { lines }
}

pub(crate) fn run_detail_summary(view: &RunDetailView, include_log: bool) -> TextSummary {
    let mut lines = Vec::new();
    let Some(id) = view.run_id.as_ref() else {
        lines.push("No run selected (missing runid).".to_string());
        return TextSummary { lines };
    };

    match view.run_result.as_ref() {
        Some(run) => {
            lines.push(format!("Run {}: {}", id, run.description));
            if let Some(env) = run.environment_name.as_deref() {
                lines.push(format!("Environment: {env}"));
            }
            if !run.status.is_empty() {
                lines.push(format!("Status: {}", run.status));
            }
            lines.push(format!(
                "Time: {} -> {}",
                run.timestamp_start, run.timestamp_stop
            ));
            if !run.proc_results.is_empty() {
                lines.push("Results:".to_string());
                for (p, line) in run.proc_results.iter().zip(run.result_lines()) {
                    lines.push(format!(
                        "  {line}  [{} -> {}]",
                        p.timestamp_start, p.timestamp_stop
                    ));
                    if !p.arguments_str.is_empty() {
                        lines.push(format!("    args: {}", p.arguments_str));
                    }
                }
            }
        }
        None => lines.push(format!("Run {id}: not available")),
    }

    if !view.figures.is_empty() {
        lines.push("Figures:".to_string());
        for f in &view.figures {
            lines.push(format!("  {}  {}", figure_name(f), f));
        }
    }

    if include_log && !view.log.is_empty() {
        lines.push("Log:".to_string());
        lines.extend(view.log.lines().map(|l| format!("  {l}")));
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{format_run, TimestampFormat};
    use crate::model::{ProcResult, ProcessArgument, ProcessInit, RunId, RunResult};
    use crate::session::RunBuilder;

    #[test]
    fn catalog_lists_processes_and_environments() {
        let catalog = Catalog::new(
            vec![
                ProcessInit {
                    proc_name: "train".into(),
                    arguments: vec![ProcessArgument::new("lr", "0.1")],
                },
                ProcessInit {
                    proc_name: "eval".into(),
                    arguments: vec![],
                },
            ],
            vec!["default".into(), "gpu".into()],
        );
        let lines = catalog_summary(&catalog).lines;
        assert_eq!(lines[0], "Processes:");
        assert_eq!(lines[1], "  train  lr:0.1");
        assert_eq!(lines[2], "  eval");
        assert_eq!(lines[3], "Environments: default, gpu");

        let empty = catalog_summary(&Catalog::default()).lines;
        assert_eq!(empty, vec!["No processes available."]);
    }

    #[test]
    fn run_init_lists_entries_in_order() {
        let catalog = Catalog::new(
            vec![ProcessInit {
                proc_name: "train".into(),
                arguments: vec![ProcessArgument::new("lr", "0.1")],
            }],
            vec![],
        );
        let mut builder = RunBuilder::new();
        builder.set_description("sweep");
        builder.select(&catalog, "train");
        builder.add_working();
        let lines = run_init_summary(&builder.to_run_init()).lines;
        assert_eq!(
            lines,
            vec!["Description: sweep", "Environment: default", "  0. train (lr:0.1)"]
        );
    }

    #[test]
    fn detail_without_id_says_so() {
        let lines = run_detail_summary(&RunDetailView::default(), true).lines;
        assert_eq!(lines, vec!["No run selected (missing runid)."]);
    }

    #[test]
    fn detail_shows_results_figures_and_log() {
        let raw = RunResult {
            id: Some(3),
            description: "baseline".into(),
            status: "complete".into(),
            timestamp_start: Some(0.0),
            timestamp_stop: Some(1.0),
            proc_results: vec![ProcResult {
                proc_name: "fit".into(),
                result: "ok".into(),
                timestamp_start: Some(0.0),
                timestamp_stop: Some(1.0),
                ..Default::default()
            }],
            ..Default::default()
        };
        let view = RunDetailView {
            run_id: RunId::new("3"),
            run_result: Some(format_run(&raw, &TimestampFormat::utc())),
            log: "line one\nline two".into(),
            figures: vec!["http://h/api/figure/3/loss.png".into()],
        };
        let lines = run_detail_summary(&view, true).lines;
        assert_eq!(lines[0], "Run 3: baseline");
        assert!(lines.contains(&"Time: 1970-01-01 00:00:00 -> 1970-01-01 00:00:01".to_string()));
        assert!(lines.contains(
            &"  fit: ok  [1970-01-01 00:00:00 -> 1970-01-01 00:00:01]".to_string()
        ));
        assert!(lines.contains(&"  loss.png  http://h/api/figure/3/loss.png".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("  line two"));

        let without_log = run_detail_summary(&view, false).lines;
        assert!(!without_log.iter().any(|l| l == "Log:"));
    }
}
