use super::{DockingTool, Launcher, Volume, absolute, unsupported};
use crate::core::io::catalog::SequenceCatalog;
use crate::core::models::ids::EntityId;
use crate::core::models::roles::RoleAssignment;
use crate::core::models::score::SourceKind;
use crate::engine::config::{AlphaFoldConfig, Runtime};
use crate::engine::error::EngineError;
use crate::engine::invoker::{CommandSpec, Stage};
use crate::engine::probe::JobPaths;
use serde::Serialize;
use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_IMAGE: &str = "alphafold3";
pub const DEFAULT_MODEL_SEEDS: &[u32] = &[1];

pub const INPUT_DIR_NAME: &str = "inputs";
pub const MSA_DIR_NAME: &str = "msa";

const SCRIPT: &str = "run_alphafold.py";
const CONTAINER_PYTHON: &str = "python";
const NATIVE_PYTHON: &str = "python3";

const INPUTS: usize = 0;
const OUTPUT: usize = 1;
const MODELS: usize = 2;
const DATABASES: usize = 3;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FoldInput<'a> {
    model_seeds: &'a [u32],
    dialect: &'static str,
    version: u32,
    name: String,
    sequences: [ChainEntry<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChainEntry<'a> {
    protein: ProteinChain<'a>,
}

#[derive(Debug, Serialize)]
struct ProteinChain<'a> {
    id: [&'static str; 1],
    sequence: &'a str,
}

/// AlphaFold3 complex prediction, split into the data pipeline (`Msa`) and structure
/// inference (`Inference`).
///
/// The data pipeline writes into `<output>/msa/<name>/` and inference into
/// `<output>/<name>/`, where `<name>` is the lower-cased `<R>-<L>`. The two must not
/// share a directory: AlphaFold moves inference into a timestamped directory when
/// `<name>/` already exists.
#[derive(Debug)]
pub struct AlphaFoldTool<'a> {
    config: AlphaFoldConfig,
    sequences: &'a SequenceCatalog,
    output_dir: PathBuf,
    launcher: Launcher,
}

impl<'a> AlphaFoldTool<'a> {
    pub fn new(config: AlphaFoldConfig, sequences: &'a SequenceCatalog, output_dir: &Path) -> Self {
        let output = absolute(output_dir);
        let launcher = Launcher::new(
            config.runtime.clone(),
            vec![
                Volume::new(output.join(INPUT_DIR_NAME), "/root/af_input"),
                Volume::new(output, "/root/af_output"),
                Volume::new(absolute(&config.model_dir), "/root/models"),
                Volume::new(absolute(&config.database_dir), "/root/public_databases"),
            ],
        );
        Self {
            config,
            sequences,
            output_dir: output_dir.to_path_buf(),
            launcher,
        }
    }

    fn input_file(roles: &RoleAssignment) -> String {
        format!("{}.json", roles.job_name())
    }

    fn start(&self) -> CommandSpec {
        let python = match self.launcher.runtime() {
            Runtime::Native { .. } => NATIVE_PYTHON,
            Runtime::Container { .. } => CONTAINER_PYTHON,
        };
        self.launcher.script(python, SCRIPT, None)
    }

    fn fold_input<'s>(&'s self, roles: &RoleAssignment) -> io::Result<FoldInput<'s>> {
        let chain = |id: &'static str, entity: &EntityId| {
            self.sequences
                .sequence_of(entity)
                .map(|sequence| ChainEntry {
                    protein: ProteinChain { id: [id], sequence },
                })
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("no sequence for '{entity}'"),
                    )
                })
        };
        Ok(FoldInput {
            model_seeds: &self.config.model_seeds,
            dialect: "alphafold3",
            version: 1,
            name: roles.job_name(),
            sequences: [chain("A", &roles.reference)?, chain("B", &roles.mobile)?],
        })
    }
}

/// The directory name AlphaFold derives from a job name.
pub fn output_name(roles: &RoleAssignment) -> String {
    roles.job_name().to_lowercase()
}

fn flag(name: &str, value: impl AsRef<OsStr>) -> OsString {
    let mut flag = OsString::from(format!("--{name}="));
    flag.push(value.as_ref());
    flag
}

impl DockingTool for AlphaFoldTool<'_> {
    fn source(&self) -> SourceKind {
        SourceKind::AlphaFold
    }

    fn pipeline(&self) -> &'static [Stage] {
        &[Stage::Msa, Stage::Inference]
    }

    fn job_paths(&self, roles: &RoleAssignment) -> JobPaths {
        let name = output_name(roles);
        JobPaths {
            workspace: self.output_dir.clone(),
            intermediate: self
                .output_dir
                .join(MSA_DIR_NAME)
                .join(&name)
                .join(format!("{name}_data.json")),
            final_artifact: self
                .output_dir
                .join(&name)
                .join(format!("{name}_summary_confidences.json")),
        }
    }

    fn command(
        &self,
        stage: Stage,
        roles: &RoleAssignment,
        _paths: &JobPaths,
    ) -> Result<CommandSpec, EngineError> {
        let models = flag("model_dir", self.launcher.root(MODELS));
        match stage {
            Stage::Msa => Ok(self
                .start()
                .arg(flag(
                    "json_path",
                    self.launcher.path(INPUTS, Self::input_file(roles)),
                ))
                .arg(models)
                .arg(flag("db_dir", self.launcher.root(DATABASES)))
                .arg(flag(
                    "output_dir",
                    self.launcher.path(OUTPUT, MSA_DIR_NAME),
                ))
                .arg("--run_inference=false")),
            Stage::Inference => {
                let name = output_name(roles);
                let data_json = Path::new(MSA_DIR_NAME)
                    .join(&name)
                    .join(format!("{name}_data.json"));
                Ok(self
                    .start()
                    .arg(flag("json_path", self.launcher.path(OUTPUT, data_json)))
                    .arg(models)
                    .arg(flag("output_dir", self.launcher.root(OUTPUT)))
                    .arg("--run_data_pipeline=false"))
            }
            other => Err(unsupported(self.source(), other)),
        }
    }

    /// Writes the AlphaFold3 input JSON for the pair, chains `A`/`B` in role order.
    fn prepare(&self, roles: &RoleAssignment, paths: &JobPaths) -> io::Result<()> {
        fs::create_dir_all(&paths.workspace)?;
        let input_dir = self.output_dir.join(INPUT_DIR_NAME);
        fs::create_dir_all(&input_dir)?;

        let input = self.fold_input(roles)?;
        let mut writer = BufWriter::new(File::create(input_dir.join(Self::input_file(roles)))?);
        serde_json::to_writer_pretty(&mut writer, &input).map_err(io::Error::other)?;
        writer.flush()
    }
}
