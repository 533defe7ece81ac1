use crate::core::io::score_table::{ScoreTable, write_merged_table};
use crate::engine::aggregate::{self, LEGEND, MergedTable};
use crate::engine::config::MergeConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use std::fs::{self, File};
use std::io::BufWriter;
use tracing::{info, instrument, warn};

/// Outer-joins the configured score tables and writes the merged table.
///
/// Sources whose file does not exist are skipped. Nothing is written unless at least
/// one remaining source has a row.
#[instrument(skip_all, name = "merge_workflow")]
pub fn run(config: &MergeConfig, reporter: &ProgressReporter) -> Result<MergedTable, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Reading score tables",
    });
    let mut tables = Vec::with_capacity(config.sources.len());
    for (source, path) in &config.sources {
        if !path.exists() {
            warn!(source = %source, "Score table {:?} not found; skipping it.", path);
            continue;
        }
        let table = ScoreTable::read_from_path(path, *source)?;
        info!(source = %source, rows = table.len(), "Loaded score table {:?}.", path);
        tables.push(table);
    }
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Merging" });
    let merged = aggregate::merge(&tables)?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Writing merged table",
    });
    let output = &config.output_path;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| EngineError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = File::create(output).map_err(|source| EngineError::Io {
        path: output.clone(),
        source,
    })?;
    let legend = config.write_legend.then_some(LEGEND);
    write_merged_table(BufWriter::new(file), &merged.columns(), &merged.rows, legend).map_err(
        |source| EngineError::Output {
            path: output.clone(),
            source,
        },
    )?;
    reporter.report(Progress::PhaseFinish);

    info!(
        rows = merged.rows.len(),
        sources = merged.sources.len(),
        "Merged table saved to {:?}.",
        output
    );
    Ok(merged)
}
