use crate::cli::MergeArgs;
use crate::config;
use crate::error::Result;
use crate::ui::{CliProgressHandler, UiEvent};
use pairdock::engine::progress::ProgressReporter;
use pairdock::workflows;
use tokio::sync::mpsc;
use tracing::info;

pub async fn run(args: MergeArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    let config = config::build_merge_config(&args);
    info!(
        sources = config.sources.len(),
        "Merging score tables into {:?}.", config.output_path
    );

    let progress_handler = CliProgressHandler::new(ui_sender);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let merged = tokio::task::block_in_place(|| workflows::merge::run(&config, &reporter))?;

    println!(
        "Merged {} pair(s) from {} source(s) ({}) into: {}",
        merged.rows.len(),
        merged.sources.len(),
        merged.columns().join(", "),
        config.output_path.display()
    );
    Ok(())
}
