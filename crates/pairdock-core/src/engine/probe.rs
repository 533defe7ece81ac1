use std::path::PathBuf;

/// On-disk locations of one job's artifacts.
///
/// Every path is derived from the job's role assignment (`<reference>-<mobile>`), so
/// concurrently running jobs never share a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    pub workspace: PathBuf,
    /// Written by the first pipeline stage.
    pub intermediate: PathBuf,
    /// Written on completion; the score is read from it.
    pub final_artifact: PathBuf,
}

/// A job's progress as recorded on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    NoArtifact,
    PartialArtifact,
    FinalArtifact,
}

pub trait ArtifactProbe: Send + Sync {
    fn classify(&self, paths: &JobPaths) -> JobState;
}

/// Classifies jobs by the existence of their artifact files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl ArtifactProbe for FsProbe {
    fn classify(&self, paths: &JobPaths) -> JobState {
        if paths.final_artifact.is_file() {
            JobState::FinalArtifact
        } else if paths.intermediate.is_file() {
            JobState::PartialArtifact
        } else {
            JobState::NoArtifact
        }
    }
}
