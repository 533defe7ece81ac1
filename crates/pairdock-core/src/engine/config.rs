use crate::core::models::score::SourceKind;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

/// Where an external tool's executables live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Runtime {
    /// Executables on the host, optionally under `bin_dir` instead of `PATH`.
    Native { bin_dir: Option<PathBuf> },
    /// Executables inside a container image launched with `engine run --rm`.
    Container {
        engine: String,
        image: String,
        gpus: bool,
    },
}

impl Runtime {
    pub fn is_native(&self) -> bool {
        matches!(self, Runtime::Native { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MegadockConfig {
    pub runtime: Runtime,
    pub decoys: u32,
    pub fft_threads: u32,
    pub omp_threads: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HdockConfig {
    pub runtime: Runtime,
    pub spacing: f64,
    pub angle: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlphaFoldConfig {
    pub runtime: Runtime,
    pub model_dir: PathBuf,
    pub database_dir: PathBuf,
    pub model_seeds: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolConfig {
    Megadock(MegadockConfig),
    Hdock(HdockConfig),
    AlphaFold(AlphaFoldConfig),
}

impl ToolConfig {
    pub fn source(&self) -> SourceKind {
        match self {
            ToolConfig::Megadock(_) => SourceKind::Megadock,
            ToolConfig::Hdock(_) => SourceKind::Hdock,
            ToolConfig::AlphaFold(_) => SourceKind::AlphaFold,
        }
    }

    pub fn runtime(&self) -> &Runtime {
        match self {
            ToolConfig::Megadock(c) => &c.runtime,
            ToolConfig::Hdock(c) => &c.runtime,
            ToolConfig::AlphaFold(c) => &c.runtime,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub workers: usize,
    pub stage_timeout: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            stage_timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DockConfig {
    pub pair_list_path: PathBuf,
    /// A structure directory for the docking tools, a FASTA file for AlphaFold.
    pub entity_input_path: PathBuf,
    pub output_dir: PathBuf,
    pub result_file: PathBuf,
    pub tool: ToolConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Default)]
pub struct DockConfigBuilder {
    pair_list_path: Option<PathBuf>,
    entity_input_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    result_file: Option<PathBuf>,
    tool: Option<ToolConfig>,
    workers: Option<usize>,
    stage_timeout: Option<Duration>,
}

impl DockConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pair_list_path(mut self, path: PathBuf) -> Self {
        self.pair_list_path = Some(path);
        self
    }
    pub fn entity_input_path(mut self, path: PathBuf) -> Self {
        self.entity_input_path = Some(path);
        self
    }
    pub fn output_dir(mut self, path: PathBuf) -> Self {
        self.output_dir = Some(path);
        self
    }
    pub fn result_file(mut self, path: PathBuf) -> Self {
        self.result_file = Some(path);
        self
    }
    pub fn tool(mut self, tool: ToolConfig) -> Self {
        self.tool = Some(tool);
        self
    }
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }
    pub fn stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<DockConfig, ConfigError> {
        let workers = self.workers.unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "workers",
                reason: "at least one worker is required".to_string(),
            });
        }
        if self.stage_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::InvalidValue {
                parameter: "stage_timeout",
                reason: "a zero timeout would fail every stage; omit it instead".to_string(),
            });
        }

        Ok(DockConfig {
            pair_list_path: self
                .pair_list_path
                .ok_or(ConfigError::MissingParameter("pair_list_path"))?,
            entity_input_path: self
                .entity_input_path
                .ok_or(ConfigError::MissingParameter("entity_input_path"))?,
            output_dir: self
                .output_dir
                .ok_or(ConfigError::MissingParameter("output_dir"))?,
            result_file: self
                .result_file
                .ok_or(ConfigError::MissingParameter("result_file"))?,
            tool: self.tool.ok_or(ConfigError::MissingParameter("tool"))?,
            scheduler: SchedulerConfig {
                workers,
                stage_timeout: self.stage_timeout,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    /// Candidate sources in column order; paths that do not exist are skipped.
    pub sources: Vec<(SourceKind, PathBuf)>,
    pub output_path: PathBuf,
    pub write_legend: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hdock() -> ToolConfig {
        ToolConfig::Hdock(HdockConfig {
            runtime: Runtime::Native { bin_dir: None },
            spacing: 1.2,
            angle: 15.0,
        })
    }

    fn complete_builder() -> DockConfigBuilder {
        DockConfigBuilder::new()
            .pair_list_path("pairs.txt".into())
            .entity_input_path("pdb".into())
            .output_dir("out".into())
            .result_file("hdock_result.txt".into())
            .tool(hdock())
    }

    #[test]
    fn build_applies_scheduler_defaults() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.scheduler, SchedulerConfig::default());
        assert_eq!(config.scheduler.workers, DEFAULT_WORKERS);
        assert_eq!(config.tool.source(), SourceKind::Hdock);
    }

    #[test]
    fn build_reports_the_first_missing_parameter() {
        let result = DockConfigBuilder::new()
            .entity_input_path("pdb".into())
            .build();
        assert_eq!(result, Err(ConfigError::MissingParameter("pair_list_path")));

        let result = DockConfigBuilder::new()
            .pair_list_path("pairs.txt".into())
            .entity_input_path("pdb".into())
            .output_dir("out".into())
            .result_file("r.txt".into())
            .build();
        assert_eq!(result, Err(ConfigError::MissingParameter("tool")));
    }

    #[test]
    fn build_rejects_zero_workers_and_zero_timeout() {
        assert!(matches!(
            complete_builder().workers(0).build(),
            Err(ConfigError::InvalidValue { parameter: "workers", .. })
        ));
        assert!(matches!(
            complete_builder().stage_timeout(Some(Duration::ZERO)).build(),
            Err(ConfigError::InvalidValue { parameter: "stage_timeout", .. })
        ));
    }
}
