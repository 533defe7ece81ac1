use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use pairdock::engine::progress::{Progress, ProgressCallback};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

#[derive(Debug)]
pub enum UiEvent {
    Progress(Progress),
    Log(String),
}

pub struct UiManager {
    mp: Arc<MultiProgress>,
    phase: Option<ActivePhase>,
    event_receiver: mpsc::Receiver<UiEvent>,
    shutdown_receiver: watch::Receiver<bool>,
    sentinel_bar: ProgressBar,
}

/// The phase currently on screen and its spinner or job bar.
struct ActivePhase {
    name: &'static str,
    bar: ProgressBar,
    started: Instant,
}

impl UiManager {
    pub fn new() -> (Self, mpsc::Sender<UiEvent>, watch::Sender<bool>) {
        let (event_sender, event_receiver) = mpsc::channel(1024);
        let (shutdown_sender, shutdown_receiver) = watch::channel(false);
        let mp = Arc::new(MultiProgress::with_draw_target(
            ProgressDrawTarget::stderr_with_hz(10),
        ));
        let sentinel_bar = mp.add(ProgressBar::hidden());
        let manager = Self {
            mp,
            phase: None,
            event_receiver,
            shutdown_receiver,
            sentinel_bar,
        };

        (manager, event_sender, shutdown_sender)
    }

    /// Renders events until shutdown is signalled, then drains what is already queued.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(event) = self.event_receiver.recv() => self.handle_event(event),
                changed = self.shutdown_receiver.changed() => {
                    if changed.is_err() || *self.shutdown_receiver.borrow() {
                        break;
                    }
                }
            }
        }
        while let Ok(event) = self.event_receiver.try_recv() {
            self.handle_event(event);
        }
        if let Some(phase) = self.phase.take() {
            phase.bar.finish_and_clear();
        }
        self.sentinel_bar.finish_and_clear();
    }

    fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Log(line) => self.print(line),
            UiEvent::Progress(progress) => self.handle_progress(progress),
        }
    }

    fn print(&self, line: String) {
        if self.mp.println(line).is_err() {
            debug!("Progress output is not attached to a terminal.");
        }
    }

    fn handle_progress(&mut self, progress: Progress) {
        match progress {
            Progress::PhaseStart { name } => {
                if let Some(previous) = self.phase.take() {
                    previous.bar.finish_and_clear();
                }
                let bar = self.mp.add(ProgressBar::new_spinner().with_style(spinner_style()));
                bar.set_message(name);
                bar.enable_steady_tick(Duration::from_millis(100));
                self.phase = Some(ActivePhase {
                    name,
                    bar,
                    started: Instant::now(),
                });
            }
            Progress::PhaseFinish => {
                if let Some(phase) = self.phase.take() {
                    phase.bar.finish_and_clear();
                    self.print(format!(
                        "✓ {} ({:.1}s)",
                        phase.name,
                        phase.started.elapsed().as_secs_f64()
                    ));
                }
            }
            Progress::TaskStart { total } => {
                if let Some(phase) = &self.phase {
                    phase.bar.disable_steady_tick();
                    phase.bar.set_style(job_bar_style());
                    phase.bar.set_length(total);
                    phase.bar.set_position(0);
                }
            }
            Progress::TaskIncrement { amount } => {
                if let Some(phase) = &self.phase {
                    phase.bar.inc(amount);
                }
            }
            Progress::TaskFinish => {
                if let Some(phase) = &self.phase {
                    phase.bar.finish();
                }
            }
            Progress::StatusUpdate { text } => {
                if let Some(phase) = &self.phase {
                    phase.bar.set_message(format!("{} | {}", phase.name, text));
                }
            }
            Progress::Message(text) => self.print(format!("  {}", text)),
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn job_bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{bar:36.green/white} {pos:>5}/{len:5} pairs [{elapsed_precise}] {wide_msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Forwards core progress events into the UI channel without blocking the workers.
#[derive(Clone)]
pub struct CliProgressHandler {
    sender: mpsc::Sender<UiEvent>,
}

impl CliProgressHandler {
    pub fn new(sender: mpsc::Sender<UiEvent>) -> Self {
        Self { sender }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let sender = self.sender.clone();
        Box::new(move |progress: Progress| {
            if let Err(e) = sender.try_send(UiEvent::Progress(progress)) {
                warn!("Failed to send progress update to UI channel: {}", e);
            }
        })
    }
}
