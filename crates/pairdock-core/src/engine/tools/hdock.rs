use super::{
    DockingTool, Launcher, Volume, absolute, structure_file, structure_volume, unsupported,
};
use crate::core::io::catalog::StructureCatalog;
use crate::core::models::roles::RoleAssignment;
use crate::core::models::score::SourceKind;
use crate::engine::config::HdockConfig;
use crate::engine::error::EngineError;
use crate::engine::invoker::{CommandSpec, Stage};
use crate::engine::probe::JobPaths;
use std::path::{Path, PathBuf};

pub const DEFAULT_SPACING: f64 = 1.2;
pub const DEFAULT_ANGLE: f64 = 15.0;

const STRUCTURES: usize = 0;
const OUTPUT: usize = 1;

/// FFT docking with `hdock`, then `createpl` to write the top-ranked complex with its
/// score. Both stages run inside the output directory.
#[derive(Debug)]
pub struct HdockTool<'a> {
    config: HdockConfig,
    structures: &'a StructureCatalog,
    output_dir: PathBuf,
    launcher: Launcher,
}

impl<'a> HdockTool<'a> {
    pub fn new(config: HdockConfig, structures: &'a StructureCatalog, output_dir: &Path) -> Self {
        let launcher = Launcher::new(
            config.runtime.clone(),
            vec![
                structure_volume(&config.runtime, structures, output_dir, "/data"),
                Volume::new(absolute(output_dir), "/work"),
            ],
        );
        Self {
            config,
            structures,
            output_dir: output_dir.to_path_buf(),
            launcher,
        }
    }
}

fn docking_output(roles: &RoleAssignment) -> String {
    format!("{}.out", roles.job_name())
}

fn complex_output(roles: &RoleAssignment) -> String {
    format!("{}.out.pdb", roles.job_name())
}

impl DockingTool for HdockTool<'_> {
    fn source(&self) -> SourceKind {
        SourceKind::Hdock
    }

    fn pipeline(&self) -> &'static [Stage] {
        &[Stage::Dock, Stage::Score]
    }

    fn job_paths(&self, roles: &RoleAssignment) -> JobPaths {
        JobPaths {
            workspace: self.output_dir.clone(),
            intermediate: self.output_dir.join(docking_output(roles)),
            final_artifact: self.output_dir.join(complex_output(roles)),
        }
    }

    fn command(
        &self,
        stage: Stage,
        roles: &RoleAssignment,
        _paths: &JobPaths,
    ) -> Result<CommandSpec, EngineError> {
        match stage {
            Stage::Dock => Ok(self
                .launcher
                .command("hdock", &[], Some(OUTPUT))
                .arg(
                    self.launcher
                        .path(STRUCTURES, structure_file(self.structures, &roles.reference)),
                )
                .arg(
                    self.launcher
                        .path(STRUCTURES, structure_file(self.structures, &roles.mobile)),
                )
                .arg("-spacing")
                .arg(self.config.spacing.to_string())
                .arg("-angle")
                .arg(self.config.angle.to_string())
                .arg("-out")
                .arg(docking_output(roles))),
            Stage::Score => Ok(self
                .launcher
                .command("createpl", &[], Some(OUTPUT))
                .arg(docking_output(roles))
                .arg(complex_output(roles))
                .args(["-nmax", "1", "-complex"])),
            other => Err(unsupported(self.source(), other)),
        }
    }
}
