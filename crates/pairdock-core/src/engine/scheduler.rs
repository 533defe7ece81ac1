use crate::core::io::catalog::EntityCatalog;
use crate::core::io::pair_list::PairRequest;
use crate::core::io::score_table::{ScoreTable, ToolRow};
use crate::core::models::ids::{EntityId, PairKey};
use crate::core::models::roles::{RoleAssignment, assign_roles};
use crate::core::models::score::{Score, ScoreRecord, SourceKind};
use crate::engine::error::EngineError;
use crate::engine::extract::{ExtractionFailure, parse_score};
use crate::engine::invoker::{InvokeError, Stage, ToolFailure, ToolInvoker};
use crate::engine::probe::{ArtifactProbe, JobPaths, JobState};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tools::DockingTool;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::mpsc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    MissingInput(EntityId),
    InvalidInput(String),
    Tool(ToolFailure),
    Timeout { stage: Stage },
    Launch(String),
    Extraction(ExtractionFailure),
    Io(String),
    Panicked,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::MissingInput(id) => write!(f, "missing input for '{}'", id),
            FailureReason::InvalidInput(reason) => write!(f, "invalid input: {}", reason),
            FailureReason::Tool(failure) => write!(f, "{}", failure),
            FailureReason::Timeout { stage } => write!(f, "stage '{}' timed out", stage),
            FailureReason::Launch(reason) => write!(f, "launch failed: {}", reason),
            FailureReason::Extraction(failure) => write!(f, "{}", failure),
            FailureReason::Io(reason) => write!(f, "I/O error: {}", reason),
            FailureReason::Panicked => f.write_str("the job panicked"),
        }
    }
}

impl From<ToolFailure> for FailureReason {
    fn from(failure: ToolFailure) -> Self {
        FailureReason::Tool(failure)
    }
}

impl From<ExtractionFailure> for FailureReason {
    fn from(failure: ExtractionFailure) -> Self {
        FailureReason::Extraction(failure)
    }
}

impl From<InvokeError> for FailureReason {
    fn from(error: InvokeError) -> Self {
        match error {
            InvokeError::Timeout { stage, .. } => FailureReason::Timeout { stage },
            InvokeError::Launch { .. } => FailureReason::Launch(error.to_string()),
            InvokeError::Workspace(reason) => FailureReason::Io(reason),
            InvokeError::Io { .. } => FailureReason::Io(error.to_string()),
        }
    }
}

/// Terminal state of one job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// The final artifact already existed; its score was read, nothing ran.
    Skipped,
    Completed,
    Failed(FailureReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub pair: PairKey,
    /// `None` when the job failed before roles could be assigned.
    pub roles: Option<RoleAssignment>,
    pub status: JobStatus,
    pub score: Option<Score>,
    pub stages_run: Vec<Stage>,
}

impl JobOutcome {
    fn new(pair: PairKey) -> Self {
        Self {
            pair,
            roles: None,
            status: JobStatus::Failed(FailureReason::Panicked),
            score: None,
            stages_run: Vec::new(),
        }
    }

    fn failed(mut self, reason: FailureReason) -> Self {
        self.status = JobStatus::Failed(reason);
        self.score = None;
        self
    }

    fn settled(mut self, status: JobStatus, score: Score) -> Self {
        self.status = status;
        self.score = Some(score);
        self
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, JobStatus::Failed(_))
    }

    pub fn record(&self, source: SourceKind) -> ScoreRecord {
        ScoreRecord {
            pair: self.pair.clone(),
            source,
            score: self.score.map(|s| s.value()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    fn count(&mut self, status: &JobStatus) {
        match status {
            JobStatus::Completed => self.succeeded += 1,
            JobStatus::Skipped => self.skipped += 1,
            JobStatus::Failed(_) => self.failed += 1,
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} skipped, {} failed",
            self.succeeded, self.skipped, self.failed
        )
    }
}

/// Every job's terminal outcome, sorted by pair key.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub source: SourceKind,
    pub outcomes: Vec<JobOutcome>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn records(&self) -> Vec<ScoreRecord> {
        self.outcomes.iter().map(|o| o.record(self.source)).collect()
    }

    /// Scored jobs in role order, for the per-tool result table.
    pub fn tool_rows(&self) -> Vec<ToolRow> {
        self.outcomes
            .iter()
            .filter_map(|o| match (&o.roles, o.score) {
                (Some(roles), Some(score)) => Some(ToolRow {
                    roles: roles.clone(),
                    score,
                }),
                _ => None,
            })
            .collect()
    }

    pub fn score_table(&self) -> ScoreTable {
        let mut table = ScoreTable::new(self.source);
        table.rows = self
            .records()
            .into_iter()
            .filter_map(|r| r.score.map(|score| (r.pair, score)))
            .collect();
        table
    }
}

/// Drives every requested pair to a terminal state on a fixed-size worker pool.
///
/// Jobs share nothing but the result channel: each worker sends exactly one
/// [`JobOutcome`] to the collector on the calling thread. A failing or panicking job
/// only settles its own outcome.
pub struct JobScheduler<'a> {
    tool: &'a dyn DockingTool,
    invoker: &'a dyn ToolInvoker,
    probe: &'a dyn ArtifactProbe,
    catalog: &'a dyn EntityCatalog,
    workers: usize,
}

impl<'a> JobScheduler<'a> {
    pub fn new(
        tool: &'a dyn DockingTool,
        invoker: &'a dyn ToolInvoker,
        probe: &'a dyn ArtifactProbe,
        catalog: &'a dyn EntityCatalog,
        workers: usize,
    ) -> Self {
        Self {
            tool,
            invoker,
            probe,
            catalog,
            workers: workers.max(1),
        }
    }

    #[instrument(skip_all, name = "job_scheduler", fields(source = %self.tool.source()))]
    pub fn run(
        &self,
        requests: &[PairRequest],
        reporter: &ProgressReporter,
    ) -> Result<BatchReport, EngineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("pairdock-worker-{i}"))
            .build()
            .map_err(|e| EngineError::WorkerPool(e.to_string()))?;

        info!(
            jobs = requests.len(),
            workers = self.workers,
            "Scheduling docking jobs."
        );
        reporter.report(Progress::TaskStart {
            total: requests.len() as u64,
        });

        let mut outcomes = Vec::with_capacity(requests.len());
        let mut summary = BatchSummary::default();

        pool.in_place_scope(|scope| {
            let (sender, receiver) = mpsc::channel::<JobOutcome>();
            for request in requests {
                let sender = sender.clone();
                scope.spawn(move |_| {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_job(request)))
                        .unwrap_or_else(|_| {
                            warn!(pair = %request.key, "Job panicked.");
                            JobOutcome::new(request.key.clone())
                        });
                    let _ = sender.send(outcome);
                });
            }
            drop(sender);

            for outcome in receiver {
                summary.count(&outcome.status);
                let verdict = match &outcome.status {
                    JobStatus::Completed => "completed".to_string(),
                    JobStatus::Skipped => "skipped".to_string(),
                    JobStatus::Failed(reason) => format!("failed ({})", reason),
                };
                reporter.report(Progress::StatusUpdate {
                    text: format!("{}: {}", outcome.pair, verdict),
                });
                reporter.report(Progress::TaskIncrement { amount: 1 });
                outcomes.push(outcome);
            }
        });

        reporter.report(Progress::TaskFinish);
        outcomes.sort_by(|a, b| a.pair.cmp(&b.pair));

        info!("Batch settled: {}.", summary);
        Ok(BatchReport {
            source: self.tool.source(),
            outcomes,
            summary,
        })
    }

    fn run_job(&self, request: &PairRequest) -> JobOutcome {
        let mut outcome = JobOutcome::new(request.key.clone());

        for id in [&request.first, &request.second] {
            if !self.catalog.contains(id) {
                warn!(pair = %request.key, "No input for '{}'; not dispatching.", id);
                return outcome.failed(FailureReason::MissingInput(id.clone()));
            }
        }

        let roles = match assign_roles(&request.first, &request.second, |id| {
            self.catalog.size_of(id)
        }) {
            Ok(roles) => roles,
            Err(e) => return outcome.failed(FailureReason::InvalidInput(e.to_string())),
        };
        outcome.roles = Some(roles.clone());

        let paths = self.tool.job_paths(&roles);
        let state = self.probe.classify(&paths);
        debug!(job = %roles.job_name(), ?state, "Classified job.");

        if state == JobState::FinalArtifact {
            info!(job = %roles.job_name(), "Final artifact present; skipping.");
            return match self.read_artifact(&paths) {
                Ok(score) => outcome.settled(JobStatus::Skipped, score),
                Err(reason) => {
                    warn!(job = %roles.job_name(), "Existing artifact is unusable: {}", reason);
                    outcome.failed(reason)
                }
            };
        }

        match self.dispatch(&roles, &paths, state, &mut outcome.stages_run) {
            Ok(score) => {
                info!(job = %roles.job_name(), score = score.value(), "Job completed.");
                outcome.settled(JobStatus::Completed, score)
            }
            Err(reason) => {
                warn!(job = %roles.job_name(), "Job failed: {}", reason);
                outcome.failed(reason)
            }
        }
    }

    fn dispatch(
        &self,
        roles: &RoleAssignment,
        paths: &JobPaths,
        state: JobState,
        stages_run: &mut Vec<Stage>,
    ) -> Result<Score, FailureReason> {
        self.tool
            .prepare(roles, paths)
            .map_err(|e| FailureReason::Io(e.to_string()))?;

        let mut captured = None;
        for &stage in self.tool.stages_for(state) {
            let command = self
                .tool
                .command(stage, roles, paths)
                .map_err(|e| FailureReason::InvalidInput(e.to_string()))?;

            info!(job = %roles.job_name(), stage = %stage, "Running stage.");
            let exit = self.invoker.run(stage, &command)?;
            stages_run.push(stage);

            if !exit.success() {
                debug!(stage = %stage, "stderr: {}", exit.stderr.trim_end());
                return Err(ToolFailure {
                    stage,
                    exit_code: exit.exit_code,
                }
                .into());
            }
            if self.tool.captures_output(stage) {
                captured = Some(exit.stdout);
            }
        }

        match captured {
            Some(text) => {
                let score = parse_score(self.tool.source(), &text)?;
                persist(&paths.final_artifact, &text)
                    .map_err(|e| FailureReason::Io(e.to_string()))?;
                Ok(score)
            }
            None => self.read_artifact(paths),
        }
    }

    fn read_artifact(&self, paths: &JobPaths) -> Result<Score, FailureReason> {
        let text = fs::read_to_string(&paths.final_artifact).map_err(|e| {
            FailureReason::Io(format!("{}: {}", paths.final_artifact.display(), e))
        })?;
        Ok(parse_score(self.tool.source(), &text)?)
    }
}

/// Writes `text` to `path` through a temporary sibling so a partial write is never
/// mistaken for a final artifact.
fn persist(path: &Path, text: &str) -> std::io::Result<()> {
    let mut temporary = path.as_os_str().to_os_string();
    temporary.push(".tmp");
    fs::write(&temporary, text)?;
    fs::rename(&temporary, path)
}
