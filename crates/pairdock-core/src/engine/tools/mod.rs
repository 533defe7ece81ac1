//! Back-ends for the external docking and structure-prediction tools.
//!
//! Each back-end maps a [`RoleAssignment`] to the job's artifact paths and a fixed
//! argument vector per [`Stage`]. The same argument vector runs either on the host or
//! inside a container image, depending on the configured [`Runtime`]; see
//! [`Launcher`].

pub mod alphafold;
pub mod hdock;
pub mod megadock;

use crate::core::io::catalog::StructureCatalog;
use crate::core::models::ids::EntityId;
use crate::core::models::roles::RoleAssignment;
use crate::core::models::score::SourceKind;
use crate::engine::config::Runtime;
use crate::engine::error::EngineError;
use crate::engine::invoker::{CommandSpec, Stage};
use crate::engine::probe::{JobPaths, JobState};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

pub use alphafold::AlphaFoldTool;
pub use hdock::HdockTool;
pub use megadock::MegadockTool;

/// Name of the link to the structure directory created inside the output directory
/// for natively run structure tools.
pub const STRUCTURE_LINK_NAME: &str = "structures";

pub trait DockingTool: Send + Sync {
    fn source(&self) -> SourceKind;

    /// Every stage of a fresh run, in order. The first stage writes the intermediate
    /// artifact, the last one the final artifact.
    fn pipeline(&self) -> &'static [Stage];

    fn job_paths(&self, roles: &RoleAssignment) -> JobPaths;

    fn command(
        &self,
        stage: Stage,
        roles: &RoleAssignment,
        paths: &JobPaths,
    ) -> Result<CommandSpec, EngineError>;

    /// Runs once before the first dispatched stage of a job.
    fn prepare(&self, _roles: &RoleAssignment, paths: &JobPaths) -> io::Result<()> {
        std::fs::create_dir_all(&paths.workspace)
    }

    /// Whether the score text of `stage` is the process's standard output rather
    /// than the final artifact written by the tool.
    fn captures_output(&self, _stage: Stage) -> bool {
        false
    }

    /// The stages still to run for a job in `state`.
    fn stages_for(&self, state: JobState) -> &'static [Stage] {
        let pipeline = self.pipeline();
        match state {
            JobState::NoArtifact => pipeline,
            JobState::PartialArtifact => pipeline.get(1..).unwrap_or_default(),
            JobState::FinalArtifact => &[],
        }
    }
}

pub(crate) fn unsupported(tool: SourceKind, stage: Stage) -> EngineError {
    EngineError::UnsupportedStage { tool, stage }
}

/// A host directory made visible to the tool. Native runs see it at `host`,
/// containerised runs at `container`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub host: PathBuf,
    pub container: &'static str,
}

impl Volume {
    pub fn new(host: PathBuf, container: &'static str) -> Self {
        Self { host, container }
    }
}

/// Builds per-stage argument vectors for one [`Runtime`].
#[derive(Debug, Clone)]
pub struct Launcher {
    runtime: Runtime,
    volumes: Vec<Volume>,
}

impl Launcher {
    pub fn new(runtime: Runtime, volumes: Vec<Volume>) -> Self {
        Self { runtime, volumes }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// The same launcher for CPU-only programs: containers start without `--gpus`.
    pub fn without_gpus(&self) -> Self {
        let mut launcher = self.clone();
        if let Runtime::Container { gpus, .. } = &mut launcher.runtime {
            *gpus = false;
        }
        launcher
    }

    /// `relative` inside volume `volume`, as the tool process sees it.
    pub fn path(&self, volume: usize, relative: impl AsRef<Path>) -> PathBuf {
        self.root(volume).join(relative)
    }

    pub fn root(&self, volume: usize) -> PathBuf {
        match (&self.runtime, self.volumes.get(volume)) {
            (Runtime::Native { .. }, Some(v)) => v.host.clone(),
            (Runtime::Container { .. }, Some(v)) => PathBuf::from(v.container),
            (_, None) => PathBuf::new(),
        }
    }

    /// Starts the command for `program`. Arguments appended to the returned spec are
    /// passed to the tool itself.
    pub fn command(
        &self,
        program: &str,
        env: &[(&str, String)],
        working_volume: Option<usize>,
    ) -> CommandSpec {
        match &self.runtime {
            Runtime::Native { bin_dir } => {
                let program = match bin_dir {
                    Some(dir) => dir.join(program).into_os_string(),
                    None => OsString::from(program),
                };
                let mut spec = CommandSpec::new(program);
                for (key, value) in env {
                    spec = spec.env(key, value);
                }
                if let Some(volume) = working_volume {
                    spec = spec.current_dir(self.root(volume));
                }
                spec
            }
            Runtime::Container {
                engine,
                image,
                gpus,
            } => {
                let mut spec = CommandSpec::new(engine).args(["run", "--rm"]);
                if *gpus {
                    spec = spec.args(["--gpus", "all"]);
                }
                for (key, value) in env {
                    spec = spec.arg("-e").arg(format!("{key}={value}"));
                }
                for volume in &self.volumes {
                    let mut mount = volume.host.clone().into_os_string();
                    mount.push(":");
                    mount.push(volume.container);
                    spec = spec.arg("-v").arg(mount);
                }
                if let Some(volume) = working_volume {
                    spec = spec.arg("-w").arg(self.root(volume));
                }
                spec.arg(image).arg(program)
            }
        }
    }

    /// Starts the command running `script` with `interpreter`. Native scripts are
    /// looked up in `bin_dir`; containerised ones are resolved by the image.
    pub fn script(
        &self,
        interpreter: &str,
        script: &str,
        working_volume: Option<usize>,
    ) -> CommandSpec {
        match &self.runtime {
            Runtime::Native { bin_dir } => {
                let script = bin_dir
                    .as_ref()
                    .map_or_else(|| PathBuf::from(script), |dir| dir.join(script));
                let mut spec = CommandSpec::new(interpreter).arg(script);
                if let Some(volume) = working_volume {
                    spec = spec.current_dir(self.root(volume));
                }
                spec
            }
            Runtime::Container { .. } => self
                .command(interpreter, &[], working_volume)
                .arg(script),
        }
    }
}

/// The structure directory as seen by a structure tool: the shared link inside the
/// output directory for native runs, the directory itself for containers.
pub(crate) fn structure_volume(
    runtime: &Runtime,
    structures: &StructureCatalog,
    output_dir: &Path,
    container: &'static str,
) -> Volume {
    let host = if runtime.is_native() {
        absolute(output_dir).join(STRUCTURE_LINK_NAME)
    } else {
        absolute(structures.dir())
    };
    Volume::new(host, container)
}

/// The on-disk file name of `id`, preserving the original case.
pub(crate) fn structure_file(structures: &StructureCatalog, id: &EntityId) -> String {
    structures
        .file_name_of(id)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{id}.pdb"))
}

/// Absolute form of `path`, falling back to `path` itself when the working directory
/// is unavailable.
pub(crate) fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volumes() -> Vec<Volume> {
        vec![
            Volume::new(PathBuf::from("/host/pdb"), "/data"),
            Volume::new(PathBuf::from("/host/out"), "/work"),
        ]
    }

    fn args_of(spec: &CommandSpec) -> Vec<String> {
        spec.arguments()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn native_launcher_uses_host_paths_and_bin_dir() {
        let launcher = Launcher::new(
            Runtime::Native {
                bin_dir: Some(PathBuf::from("/opt/hdock")),
            },
            volumes(),
        );
        let spec = launcher
            .command("hdock", &[("OMP_NUM_THREADS", "8".to_string())], Some(1))
            .arg(launcher.path(0, "A.pdb"));

        assert_eq!(spec.program(), "/opt/hdock/hdock");
        assert_eq!(args_of(&spec), ["/host/pdb/A.pdb"]);
        assert_eq!(spec.working_dir(), Some(Path::new("/host/out")));
        assert_eq!(spec.environment().len(), 1);
    }

    #[test]
    fn container_launcher_wraps_the_tool_in_a_run_command() {
        let launcher = Launcher::new(
            Runtime::Container {
                engine: "docker".to_string(),
                image: "hdock:latest".to_string(),
                gpus: true,
            },
            volumes(),
        );
        let spec = launcher
            .command("hdock", &[("OMP_NUM_THREADS", "8".to_string())], Some(1))
            .arg(launcher.path(0, "A.pdb"));

        assert_eq!(spec.program(), "docker");
        assert_eq!(
            args_of(&spec),
            [
                "run",
                "--rm",
                "--gpus",
                "all",
                "-e",
                "OMP_NUM_THREADS=8",
                "-v",
                "/host/pdb:/data",
                "-v",
                "/host/out:/work",
                "-w",
                "/work",
                "hdock:latest",
                "hdock",
                "/data/A.pdb",
            ]
        );
        assert!(spec.environment().is_empty());
        assert_eq!(spec.working_dir(), None);
    }

    struct TwoStage;

    impl DockingTool for TwoStage {
        fn source(&self) -> SourceKind {
            SourceKind::Hdock
        }
        fn pipeline(&self) -> &'static [Stage] {
            &[Stage::Dock, Stage::Score]
        }
        fn job_paths(&self, _roles: &RoleAssignment) -> JobPaths {
            JobPaths {
                workspace: PathBuf::new(),
                intermediate: PathBuf::new(),
                final_artifact: PathBuf::new(),
            }
        }
        fn command(
            &self,
            stage: Stage,
            _roles: &RoleAssignment,
            _paths: &JobPaths,
        ) -> Result<CommandSpec, EngineError> {
            Err(unsupported(self.source(), stage))
        }
    }

    #[test]
    fn partial_jobs_resume_after_the_first_stage() {
        assert_eq!(
            TwoStage.stages_for(JobState::NoArtifact),
            &[Stage::Dock, Stage::Score]
        );
        assert_eq!(TwoStage.stages_for(JobState::PartialArtifact), &[Stage::Score]);
        assert!(TwoStage.stages_for(JobState::FinalArtifact).is_empty());
    }
}
