use thiserror::Error;

use super::config::ConfigError;
use super::invoker::Stage;
use crate::core::io::catalog::CatalogError;
use crate::core::io::score_table::TableError;
use crate::core::models::score::SourceKind;
use std::path::PathBuf;

/// Errors fatal to a whole `dock` or `merge` run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Failed to read pair list '{path}': {source}", path = path.display())]
    PairList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Entity catalog error: {source}")]
    Catalog {
        #[from]
        source: CatalogError,
    },

    #[error("Score table error: {source}")]
    Table {
        #[from]
        source: TableError,
    },

    #[error("Failed to write table '{path}': {source}", path = path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("No usable score source: at least one non-empty table is required")]
    AggregationUsage,

    #[error("Score source '{0}' was given more than once")]
    DuplicateSource(SourceKind),

    #[error("Tool '{tool}' has no '{stage}' stage")]
    UnsupportedStage { tool: SourceKind, stage: Stage },

    #[error("Failed to start the worker pool: {0}")]
    WorkerPool(String),

    #[error("I/O error for '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
