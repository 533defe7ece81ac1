use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub scheduler: Option<FileSchedulerConfig>,
    pub megadock: Option<FileMegadockConfig>,
    pub hdock: Option<FileHdockConfig>,
    pub alphafold: Option<FileAlphaFoldConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSchedulerConfig {
    pub workers: Option<usize>,
    pub timeout_secs: Option<u64>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RuntimeKind {
    Native,
    Container,
}

impl FromStr for RuntimeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "native" => Ok(RuntimeKind::Native),
            "container" => Ok(RuntimeKind::Container),
            other => Err(format!(
                "unknown runtime '{}', expected 'native' or 'container'",
                other
            )),
        }
    }
}

/// `[<tool>.runtime]`: how the tool's executables are launched.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileRuntimeConfig {
    pub kind: Option<RuntimeKind>,
    pub bin_dir: Option<PathBuf>,
    pub engine: Option<String>,
    pub image: Option<String>,
    pub gpus: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileMegadockConfig {
    pub decoys: Option<u32>,
    pub fft_threads: Option<u32>,
    pub omp_threads: Option<u32>,
    pub runtime: Option<FileRuntimeConfig>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileHdockConfig {
    pub spacing: Option<f64>,
    pub angle: Option<f64>,
    pub runtime: Option<FileRuntimeConfig>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileAlphaFoldConfig {
    pub model_dir: Option<PathBuf>,
    pub database_dir: Option<PathBuf>,
    pub model_seeds: Option<Vec<u32>>,
    pub runtime: Option<FileRuntimeConfig>,
}
