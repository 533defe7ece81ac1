use crate::core::io::catalog::{EntityCatalog, SequenceCatalog, StructureCatalog};
use crate::core::io::pair_list::PairList;
use crate::core::io::score_table::write_tool_table;
use crate::engine::config::{DockConfig, ToolConfig};
use crate::engine::error::EngineError;
use crate::engine::invoker::{ProcessInvoker, SharedLink, ToolInvoker};
use crate::engine::probe::FsProbe;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::scheduler::{BatchReport, JobScheduler};
use crate::engine::tools::{
    AlphaFoldTool, DockingTool, HdockTool, MegadockTool, STRUCTURE_LINK_NAME,
};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct DockResult {
    pub report: BatchReport,
    /// Pair-list lines skipped as malformed or invalid.
    pub malformed_lines: usize,
    /// Pair-list lines naming an already listed pair.
    pub duplicate_lines: usize,
    pub result_file: PathBuf,
}

/// Runs the configured tool over every unique pair with child processes.
#[instrument(skip_all, name = "dock_workflow")]
pub fn run(config: &DockConfig, reporter: &ProgressReporter) -> Result<DockResult, EngineError> {
    let mut invoker = ProcessInvoker::new(config.scheduler.stage_timeout);
    let uses_structures = !matches!(config.tool, ToolConfig::AlphaFold(_));
    if uses_structures && config.tool.runtime().is_native() {
        invoker = invoker.with_shared_link(SharedLink::new(
            config.output_dir.join(STRUCTURE_LINK_NAME),
            config.entity_input_path.clone(),
        ));
    }
    run_with(config, &invoker, reporter)
}

/// As [`run`], with stages executed by `invoker`.
pub fn run_with(
    config: &DockConfig,
    invoker: &dyn ToolInvoker,
    reporter: &ProgressReporter,
) -> Result<DockResult, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let pair_list =
        PairList::read_from_path(&config.pair_list_path).map_err(|source| EngineError::PairList {
            path: config.pair_list_path.clone(),
            source,
        })?;
    info!(
        pairs = pair_list.len(),
        malformed = pair_list.malformed_lines,
        duplicates = pair_list.duplicates,
        "Read pair list {:?}.",
        config.pair_list_path
    );
    if pair_list.is_empty() {
        warn!("The pair list names no valid pair; nothing to dock.");
    }

    fs::create_dir_all(&config.output_dir).map_err(|source| EngineError::Io {
        path: config.output_dir.clone(),
        source,
    })?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Docking" });
    let input = config.entity_input_path.as_path();
    let report = match &config.tool {
        ToolConfig::Megadock(tool_config) => {
            let catalog = StructureCatalog::open(input)?;
            let tool = MegadockTool::new(tool_config.clone(), &catalog, &config.output_dir);
            schedule(config, &tool, invoker, &catalog, &pair_list, reporter)?
        }
        ToolConfig::Hdock(tool_config) => {
            let catalog = StructureCatalog::open(input)?;
            let tool = HdockTool::new(tool_config.clone(), &catalog, &config.output_dir);
            schedule(config, &tool, invoker, &catalog, &pair_list, reporter)?
        }
        ToolConfig::AlphaFold(tool_config) => {
            let catalog = SequenceCatalog::read_from_path(input)?;
            let tool = AlphaFoldTool::new(tool_config.clone(), &catalog, &config.output_dir);
            schedule(config, &tool, invoker, &catalog, &pair_list, reporter)?
        }
    };
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Writing results",
    });
    write_results(&config.result_file, &report)?;
    report_unscored(&report, reporter);
    reporter.report(Progress::PhaseFinish);

    info!(
        "Docking finished ({}). Results saved to {:?}.",
        report.summary, config.result_file
    );
    Ok(DockResult {
        report,
        malformed_lines: pair_list.malformed_lines,
        duplicate_lines: pair_list.duplicates,
        result_file: config.result_file.clone(),
    })
}

fn schedule(
    config: &DockConfig,
    tool: &dyn DockingTool,
    invoker: &dyn ToolInvoker,
    catalog: &dyn EntityCatalog,
    pair_list: &PairList,
    reporter: &ProgressReporter,
) -> Result<BatchReport, EngineError> {
    JobScheduler::new(tool, invoker, &FsProbe, catalog, config.scheduler.workers)
        .run(&pair_list.requests, reporter)
}

fn report_unscored(report: &BatchReport, reporter: &ProgressReporter) {
    let records = report.records();
    let unscored: Vec<String> = records
        .iter()
        .filter(|r| r.score.is_none())
        .map(|r| r.pair.to_string())
        .collect();
    reporter.report(Progress::Message(format!(
        "{} of {} pair(s) scored by {}.",
        records.len() - unscored.len(),
        records.len(),
        report.source
    )));
    if !unscored.is_empty() {
        reporter.report(Progress::Message(format!(
            "No {} score for: {}",
            report.source,
            unscored.join(", ")
        )));
    }
}

fn write_results(path: &Path, report: &BatchReport) -> Result<(), EngineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| EngineError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = File::create(path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_tool_table(BufWriter::new(file), report.source, &report.tool_rows()).map_err(
        |source| EngineError::Output {
            path: path.to_path_buf(),
            source,
        },
    )
}
