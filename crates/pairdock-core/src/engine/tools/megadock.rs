use super::{
    DockingTool, Launcher, Volume, absolute, structure_file, structure_volume, unsupported,
};
use crate::core::io::catalog::StructureCatalog;
use crate::core::models::roles::RoleAssignment;
use crate::core::models::score::SourceKind;
use crate::engine::config::MegadockConfig;
use crate::engine::error::EngineError;
use crate::engine::invoker::{CommandSpec, Stage};
use crate::engine::probe::JobPaths;
use std::path::{Path, PathBuf};

pub const DEFAULT_DECOYS: u32 = 10800;
pub const DEFAULT_FFT_THREADS: u32 = 3;
pub const DEFAULT_OMP_THREADS: u32 = 32;
pub const DEFAULT_IMAGE: &str = "akiyamalab/megadock:gpu";

const DOCK_PROGRAM: &str = "megadock-gpu";
const SCORE_PROGRAM: &str = "ppiscore";
const STRUCTURES: usize = 0;
const OUTPUT: usize = 1;

/// GPU rigid-body docking (`megadock-gpu`) followed by `ppiscore` re-scoring.
///
/// `ppiscore` prints its result instead of writing a file, so the job persists the
/// captured text as `<R>-<L>.ppiscore`, the final artifact. It runs on the CPU, so
/// containerised scoring is started without GPUs.
#[derive(Debug)]
pub struct MegadockTool<'a> {
    config: MegadockConfig,
    structures: &'a StructureCatalog,
    output_dir: PathBuf,
    launcher: Launcher,
    scoring: Launcher,
}

impl<'a> MegadockTool<'a> {
    pub fn new(config: MegadockConfig, structures: &'a StructureCatalog, output_dir: &Path) -> Self {
        let launcher = Launcher::new(
            config.runtime.clone(),
            vec![
                structure_volume(
                    &config.runtime,
                    structures,
                    output_dir,
                    "/opt/MEGADOCK/data",
                ),
                Volume::new(absolute(output_dir), "/opt/MEGADOCK/out"),
            ],
        );
        let scoring = launcher.without_gpus();
        Self {
            config,
            structures,
            output_dir: output_dir.to_path_buf(),
            launcher,
            scoring,
        }
    }

    fn docking_output(roles: &RoleAssignment) -> String {
        format!("{}.out", roles.job_name())
    }
}

impl DockingTool for MegadockTool<'_> {
    fn source(&self) -> SourceKind {
        SourceKind::Megadock
    }

    fn pipeline(&self) -> &'static [Stage] {
        &[Stage::Dock, Stage::Score]
    }

    fn job_paths(&self, roles: &RoleAssignment) -> JobPaths {
        let name = roles.job_name();
        JobPaths {
            workspace: self.output_dir.clone(),
            intermediate: self.output_dir.join(Self::docking_output(roles)),
            final_artifact: self.output_dir.join(format!("{name}.ppiscore")),
        }
    }

    fn command(
        &self,
        stage: Stage,
        roles: &RoleAssignment,
        _paths: &JobPaths,
    ) -> Result<CommandSpec, EngineError> {
        let docking_output = self.launcher.path(OUTPUT, Self::docking_output(roles));
        let decoys = self.config.decoys.to_string();

        match stage {
            Stage::Dock => {
                let env = [("OMP_NUM_THREADS", self.config.omp_threads.to_string())];
                Ok(self
                    .launcher
                    .command(DOCK_PROGRAM, &env, None)
                    .arg("-R")
                    .arg(self.launcher.path(
                        STRUCTURES,
                        structure_file(self.structures, &roles.reference),
                    ))
                    .arg("-L")
                    .arg(
                        self.launcher
                            .path(STRUCTURES, structure_file(self.structures, &roles.mobile)),
                    )
                    .arg("-o")
                    .arg(docking_output)
                    .arg("-N")
                    .arg(&decoys)
                    .arg("-t")
                    .arg(self.config.fft_threads.to_string()))
            }
            Stage::Score => Ok(self
                .scoring
                .command(SCORE_PROGRAM, &[], None)
                .arg(docking_output)
                .arg(decoys)),
            other => Err(unsupported(self.source(), other)),
        }
    }

    fn captures_output(&self, stage: Stage) -> bool {
        stage == Stage::Score
    }
}
