use crate::cli::DockArgs;
use crate::config;
use crate::error::Result;
use crate::ui::{CliProgressHandler, UiEvent};
use pairdock::engine::progress::ProgressReporter;
use pairdock::engine::scheduler::JobStatus;
use pairdock::workflows::{self, dock::DockResult};
use std::fmt::Write;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn run(args: DockArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let config = config::build_dock_config(&args)?;

    let progress_handler = CliProgressHandler::new(ui_sender);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Running {} over {:?}...", config.tool.source(), config.pair_list_path);
    let result = tokio::task::block_in_place(|| workflows::dock::run(&config, &reporter))?;

    for outcome in result.report.outcomes.iter().filter(|o| o.is_failed()) {
        if let JobStatus::Failed(reason) = &outcome.status {
            warn!(pair = %outcome.pair, "Pair failed: {}", reason);
        }
    }
    print!("{}", render_summary(&result));
    Ok(())
}

fn render_summary(result: &DockResult) -> String {
    let mut text = String::new();
    let report = &result.report;
    let _ = writeln!(
        text,
        "{} pairs processed: {}.",
        report.summary.total(),
        report.summary
    );
    if result.malformed_lines > 0 || result.duplicate_lines > 0 {
        let _ = writeln!(
            text,
            "Pair list: {} malformed and {} duplicate line(s) ignored.",
            result.malformed_lines, result.duplicate_lines
        );
    }
    let failures: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|o| match &o.status {
            JobStatus::Failed(reason) => Some((&o.pair, reason)),
            _ => None,
        })
        .collect();
    if !failures.is_empty() {
        let _ = writeln!(text, "Failed pairs:");
        for (pair, reason) in failures {
            let _ = writeln!(text, "  {}: {}", pair, reason);
        }
    }
    let _ = writeln!(text, "Results written to: {}", result.result_file.display());
    text
}
