mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod ui;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use crate::ui::{UiEvent, UiManager};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    if let Err(e) = run_app().await {
        // Give the progress renderer a moment to release the terminal.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        eprintln!("\nerror: {}", e);
        std::process::exit(1);
    }
}

fn install_error_hooks() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |info| {
        error!("{}", panic_hook.panic_report(info));
    }));
    Ok(())
}

async fn dispatch(command: Commands, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    match command {
        Commands::Dock(args) => {
            debug!(tool = ?args.tool, "Running dock command.");
            commands::dock::run(args, ui_sender).await
        }
        Commands::Merge(args) => {
            debug!("Running merge command.");
            commands::merge::run(args, ui_sender).await
        }
    }
}

async fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;
    install_error_hooks()?;

    info!(version = env!("CARGO_PKG_VERSION"), "pairdock starting.");
    debug!(?cli, "Parsed command line.");

    let (ui_manager, ui_sender, shutdown_sender) = UiManager::new();
    let ui_handle = task::spawn(ui_manager.run());

    let outcome = dispatch(cli.command, ui_sender).await;

    if shutdown_sender.send(true).is_err() {
        warn!("Progress renderer exited before the shutdown signal.");
    }
    if let Err(e) = ui_handle.await {
        return Err(CliError::Other(anyhow::anyhow!("progress renderer panicked: {}", e)));
    }

    if let Err(e) = &outcome {
        error!("Command failed: {}", e);
    }
    outcome
}
