//! Runs one long command on a background task and forwards its progress.

use crate::log_buffer::InstallLog;
use crate::protocol::{parse_progress_line, ProgressEvent};
use icenet_executor::{CommandRunner, CommandSpec};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TerminalEvent {
    pub success: bool,
    pub exit_code: i32,
}

impl TerminalEvent {
    pub fn from_exit_code(exit_code: i32) -> Self {
        Self {
            success: exit_code == 0,
            exit_code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    Progress(ProgressEvent),
    Finished(TerminalEvent),
}

pub struct ProgressStreamer {
    runner: Arc<dyn CommandRunner>,
}

impl ProgressStreamer {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Spawn the command on a worker task. Must be called inside a tokio
    /// runtime. The returned subscription yields progress events in output
    /// order, then exactly one `Finished`.
    pub fn start(&self, spec: CommandSpec) -> ProgressSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let log = InstallLog::new();
        let worker = tokio::spawn(pump(Arc::clone(&self.runner), spec, log.clone(), tx));

        ProgressSubscription {
            events: rx,
            log,
            worker,
            finished: false,
        }
    }
}

/// Reads output line by line. Every line lands in the log before any event
/// derived from it is sent, so a consumer that sees an event can also see
/// its line in the log.
async fn pump(
    runner: Arc<dyn CommandRunner>,
    spec: CommandSpec,
    log: InstallLog,
    tx: mpsc::UnboundedSender<StreamEvent>,
) {
    info!(
        "Starting {} with {} arguments",
        spec.program(),
        spec.arguments().len()
    );

    let mut stream = runner.stream(&spec).await;
    let mut consumer_gone = false;

    while let Some(line) = stream.next_line().await {
        let progress = parse_progress_line(&line);
        log.push(line);

        let Some(event) = progress else {
            continue;
        };
        debug!("Progress {}%: {}", event.percent, event.message);
        if tx.send(StreamEvent::Progress(event)).is_err() && !consumer_gone {
            // The install keeps running; there is no cancellation.
            warn!("Progress consumer went away, continuing without it");
            consumer_gone = true;
        }
    }

    let terminal = TerminalEvent::from_exit_code(stream.wait().await);
    if terminal.success {
        info!("{} finished successfully", spec.program());
    } else {
        warn!("{} failed with exit code {}", spec.program(), terminal.exit_code);
    }
    // Nobody left to tell is fine here.
    let _ = tx.send(StreamEvent::Finished(terminal));
}

/// Caller's end of a running stream.
pub struct ProgressSubscription {
    events: mpsc::UnboundedReceiver<StreamEvent>,
    log: InstallLog,
    worker: JoinHandle<()>,
    finished: bool,
}

impl ProgressSubscription {
    pub fn log(&self) -> &InstallLog {
        &self.log
    }

    /// Next event, or `None` once `Finished` has been delivered.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }

        match self.events.recv().await {
            Some(event) => {
                self.finished = matches!(event, StreamEvent::Finished(_));
                Some(event)
            }
            None => {
                // The worker dropped its sender without a terminal event,
                // which only happens if it panicked.
                self.finished = true;
                let reason = match (&mut self.worker).await {
                    Err(e) if e.is_panic() => "worker panicked",
                    _ => "worker stopped early",
                };
                warn!("Progress stream ended without an exit status: {}", reason);
                Some(StreamEvent::Finished(TerminalEvent::from_exit_code(
                    icenet_executor::EXIT_ABNORMAL,
                )))
            }
        }
    }

    /// Single consumer loop: hands every event to `handler` one at a time,
    /// in order, and returns the terminal event.
    pub async fn drain<F>(mut self, mut handler: F) -> TerminalEvent
    where
        F: FnMut(&StreamEvent),
    {
        loop {
            match self.next_event().await {
                Some(event) => {
                    handler(&event);
                    if let StreamEvent::Finished(terminal) = event {
                        return terminal;
                    }
                }
                None => {
                    return TerminalEvent::from_exit_code(icenet_executor::EXIT_ABNORMAL);
                }
            }
        }
    }
}
