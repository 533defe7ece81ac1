use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::OnceLock;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

const TIMEOUT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The closed set of pipeline stages a tool can be invoked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// The docking search itself (`megadock-gpu`, `hdock`).
    Dock,
    /// Re-scoring / complex generation from the docking output (`ppiscore`, `createpl`).
    Score,
    /// AlphaFold3 data pipeline (MSA and template search).
    Msa,
    /// AlphaFold3 structure inference from the data pipeline output.
    Inference,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Dock => "dock",
            Stage::Score => "score",
            Stage::Msa => "msa",
            Stage::Inference => "inference",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An explicit argument vector for one process invocation. Arguments are never
/// joined into a shell string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: OsString,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    pub fn environment(&self) -> &[(OsString, OsString)] {
        &self.envs
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command.envs(self.envs.iter().map(|(k, v)| (k, v)));
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitOutcome {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A stage that ran but exited unsuccessfully.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Stage '{stage}' exited with {}", .exit_code.map_or("a signal".to_string(), |c| format!("code {c}")))]
pub struct ToolFailure {
    pub stage: Stage,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Stage '{stage}' timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },

    #[error("Failed to prepare the shared structure link: {0}")]
    Workspace(String),

    #[error("I/O error while running stage '{stage}': {source}")]
    Io {
        stage: Stage,
        #[source]
        source: io::Error,
    },
}

/// Runs one pipeline stage of an external tool and reports its exit status and
/// captured output. Implementations block the calling worker until the stage ends.
pub trait ToolInvoker: Send + Sync {
    fn run(&self, stage: Stage, command: &CommandSpec) -> Result<ExitOutcome, InvokeError>;
}

/// A read-only link from the job workspace to the shared structure directory,
/// created lazily on first use.
#[derive(Debug)]
pub struct SharedLink {
    link: PathBuf,
    target: PathBuf,
    state: OnceLock<Result<(), String>>,
}

impl SharedLink {
    pub fn new(link: PathBuf, target: PathBuf) -> Self {
        Self {
            link,
            target,
            state: OnceLock::new(),
        }
    }

    /// Creates the link at most once; an existing entry at the link path is accepted.
    pub fn ensure(&self) -> Result<(), String> {
        self.state
            .get_or_init(|| create_link(&self.link, &self.target).map_err(|e| e.to_string()))
            .clone()
    }
}

fn create_link(link: &Path, target: &Path) -> io::Result<()> {
    if link.symlink_metadata().is_ok() {
        debug!("Shared link {:?} already exists.", link);
        return Ok(());
    }
    if let Some(parent) = link.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let target = std::path::absolute(target)?;

    #[cfg(unix)]
    let result = std::os::unix::fs::symlink(&target, link);
    #[cfg(windows)]
    let result = std::os::windows::fs::symlink_dir(&target, link);
    #[cfg(not(any(unix, windows)))]
    let result: io::Result<()> = Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are not supported on this platform",
    ));

    match result {
        Ok(()) => {
            info!("Linked {:?} -> {:?}.", link, target);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Invokes tools as child processes with piped output and an optional per-stage timeout.
#[derive(Debug, Default)]
pub struct ProcessInvoker {
    timeout: Option<Duration>,
    shared_link: Option<SharedLink>,
}

impl ProcessInvoker {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            shared_link: None,
        }
    }

    pub fn with_shared_link(mut self, link: SharedLink) -> Self {
        self.shared_link = Some(link);
        self
    }

    fn wait(&self, stage: Stage, child: &mut Child) -> Result<ExitStatus, InvokeError> {
        let io_err = |source| InvokeError::Io { stage, source };
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(io_err);
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait().map_err(io_err)? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                warn!(stage = %stage, "Stage exceeded {:?}; killing process group.", timeout);
                terminate(child);
                let _ = child.wait();
                return Err(InvokeError::Timeout {
                    stage,
                    after: timeout,
                });
            }
            thread::sleep(TIMEOUT_POLL_INTERVAL);
        }
    }
}

impl ToolInvoker for ProcessInvoker {
    fn run(&self, stage: Stage, command: &CommandSpec) -> Result<ExitOutcome, InvokeError> {
        if let Some(link) = &self.shared_link {
            link.ensure().map_err(InvokeError::Workspace)?;
        }

        debug!(stage = %stage, "Running: {}", command);
        let mut process = command.to_command();
        if self.timeout.is_some() {
            isolate_process_group(&mut process);
        }
        let mut child = process
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| InvokeError::Launch {
                program: command.program().to_string_lossy().into_owned(),
                source,
            })?;

        let stdout_reader = spawn_pipe_reader(child.stdout.take());
        let stderr_reader = spawn_pipe_reader(child.stderr.take());

        // On timeout the readers are left detached; a grandchild that escaped the
        // group kill may still hold the pipes open.
        let status = self.wait(stage, &mut child)?;
        let stdout = join_pipe_reader(stdout_reader);
        let stderr = join_pipe_reader(stderr_reader);

        trace!(stage = %stage, "stderr: {}", stderr.trim_end());
        Ok(ExitOutcome {
            exit_code: status.code(),
            stdout,
            stderr,
        })
    }
}

/// Starts the child as the leader of a new process group so a timeout can take
/// down wrapper scripts together with the tools they launch.
#[cfg(unix)]
fn isolate_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate_process_group(_command: &mut Command) {}

fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        match Command::new("kill")
            .args(["-KILL", "--", &group])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => return,
            Ok(status) => debug!("kill for process group {} exited with {}", group, status),
            Err(e) => debug!("Could not signal process group {}: {}", group, e),
        }
    }
    if let Err(e) = child.kill() {
        warn!("Failed to kill timed-out process: {}", e);
    }
}

fn spawn_pipe_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            if let Err(e) = pipe.read_to_end(&mut buffer) {
                warn!("Failed to read child output: {}", e);
            }
            String::from_utf8_lossy(&buffer).into_owned()
        })
    })
}

fn join_pipe_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
