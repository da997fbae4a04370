//! Process execution. The only module in the workspace that touches the OS
//! process API.

use crate::spec::CommandSpec;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use std::io;
use std::os::fd::OwnedFd;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::unix::pipe;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

/// Exit code reported when the program could not be found, matching shells.
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;
/// Exit code for spawn errors, signals and timeouts.
pub const EXIT_ABNORMAL: i32 = -1;

const LINE_CHANNEL_CAPACITY: usize = 256;

/// Captured outcome of one execution. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandResult {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            timed_out: false,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    pub fn spawn_failure(program: &str, err: &io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::new(
                EXIT_COMMAND_NOT_FOUND,
                "",
                format!("{}: command not found", program),
            )
        } else {
            Self::new(EXIT_ABNORMAL, "", format!("Failed to launch {}: {}", program, err))
        }
    }

    pub fn timed_out(program: &str, limit: Duration) -> Self {
        Self {
            exit_code: EXIT_ABNORMAL,
            stdout: String::new(),
            stderr: format!("{} timed out after {}s", program, limit.as_secs()),
            timed_out: true,
        }
    }
}

/// Incremental view of a running command's combined stdout and stderr.
#[async_trait]
pub trait LineStream: Send {
    /// Next output line with its terminator stripped; `None` once the
    /// process has closed its output.
    async fn next_line(&mut self) -> Option<String>;

    /// Wait for the process to exit and return its exit code.
    async fn wait(&mut self) -> i32;
}

/// Seam between the orchestrator and the OS.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion. Never fails: every failure mode is folded into the
    /// returned result.
    async fn run(&self, spec: &CommandSpec) -> CommandResult;

    /// Start the command and hand back its output as it is produced.
    ///
    /// The default runs to completion and replays the captured output,
    /// which is what scripted runners in tests want.
    async fn stream(&self, spec: &CommandSpec) -> Box<dyn LineStream> {
        let result = self.run(spec).await;
        Box::new(ReplayStream::from_result(&result))
    }
}

/// Runs commands with `tokio::process`.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    c_locale: bool,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self { c_locale: true }
    }

    /// Keep the caller's locale instead of forcing `LC_ALL=C`. Failure
    /// classification matches English tool output, so only turn this off
    /// for commands whose output is shown but never classified.
    pub fn with_native_locale(mut self) -> Self {
        self.c_locale = false;
        self
    }

    fn command(&self, spec: &CommandSpec, stdout: Stdio, stderr: Stdio) -> Command {
        let mut cmd = Command::new(spec.program());
        cmd.args(spec.arguments())
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);
        if self.c_locale {
            cmd.env("LC_ALL", "C");
        }
        for (key, value) in spec.envs() {
            cmd.env(key, value);
        }
        cmd
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> CommandResult {
        debug!("Executing command: {:?}", spec);

        let mut cmd = self.command(spec, Stdio::piped(), Stdio::piped());
        cmd.kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn {}: {}", spec.program(), e);
                return CommandResult::spawn_failure(spec.program(), &e);
            }
        };

        let waited = match spec.timeout() {
            Some(limit) => match timeout(limit, child.wait_with_output()).await {
                Ok(waited) => waited,
                Err(_) => {
                    // Dropping the future drops the child, and kill_on_drop reaps it.
                    warn!("Command {} timed out after {:?}", spec.program(), limit);
                    return CommandResult::timed_out(spec.program(), limit);
                }
            },
            None => child.wait_with_output().await,
        };

        match waited {
            Ok(output) => {
                let result = CommandResult::new(
                    output.status.code().unwrap_or(EXIT_ABNORMAL),
                    String::from_utf8_lossy(&output.stdout),
                    String::from_utf8_lossy(&output.stderr),
                );
                debug!("Command {} exited with {}", spec.program(), result.exit_code);
                result
            }
            Err(e) => {
                warn!("Failed to collect output of {}: {}", spec.program(), e);
                CommandResult::new(EXIT_ABNORMAL, "", e.to_string())
            }
        }
    }

    async fn stream(&self, spec: &CommandSpec) -> Box<dyn LineStream> {
        debug!("Streaming command: {:?}", spec);

        let (output, stdout, stderr) = match merged_output() {
            Ok(parts) => parts,
            Err(e) => {
                warn!("Failed to create output pipe for {}: {}", spec.program(), e);
                let failure = CommandResult::new(
                    EXIT_ABNORMAL,
                    "",
                    format!("Failed to launch {}: {}", spec.program(), e),
                );
                return Box::new(ReplayStream::from_result(&failure));
            }
        };

        let mut cmd = self.command(spec, stdout, stderr);
        let spawned = cmd.spawn();
        // The command still owns the parent's write ends; the reader only
        // sees EOF once they are closed.
        drop(cmd);

        let child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn {}: {}", spec.program(), e);
                let failure = CommandResult::spawn_failure(spec.program(), &e);
                return Box::new(ReplayStream::from_result(&failure));
            }
        };

        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        forward_lines(output, tx);

        Box::new(ChildStream {
            program: spec.program().to_string(),
            child,
            lines: rx,
            deadline: spec.timeout().map(|limit| Instant::now() + limit),
            timed_out: false,
        })
    }
}

/// Decode one raw output line, substituting invalid UTF-8 and dropping the
/// `\n` / `\r\n` terminator.
pub fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

/// One pipe shared by stdout and stderr, so lines are read back in the
/// order the process wrote them.
fn merged_output() -> io::Result<(pipe::Receiver, Stdio, Stdio)> {
    let (reader, writer) = io::pipe()?;
    let stderr = writer.try_clone()?;
    let reader = pipe::Receiver::from_owned_fd(OwnedFd::from(reader))?;
    Ok((reader, Stdio::from(writer), Stdio::from(stderr)))
}

fn forward_lines(reader: pipe::Receiver, tx: mpsc::Sender<String>) {
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(decode_line(&buf)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!("Output pipe closed with error: {}", e);
                    break;
                }
            }
        }
    });
}

struct ChildStream {
    program: String,
    child: Child,
    lines: mpsc::Receiver<String>,
    deadline: Option<Instant>,
    timed_out: bool,
}

impl ChildStream {
    fn expire(&mut self) {
        warn!("Command {} exceeded its deadline, killing it", self.program);
        self.timed_out = true;
        if let Err(e) = self.child.start_kill() {
            debug!("Kill of {} failed: {}", self.program, e);
        }
    }
}

#[async_trait]
impl LineStream for ChildStream {
    async fn next_line(&mut self) -> Option<String> {
        if self.timed_out {
            return None;
        }
        match self.deadline {
            None => self.lines.recv().await,
            Some(deadline) => match timeout_at(deadline, self.lines.recv()).await {
                Ok(line) => line,
                Err(_) => {
                    self.expire();
                    None
                }
            },
        }
    }

    async fn wait(&mut self) -> i32 {
        if !self.timed_out {
            if let Some(deadline) = self.deadline {
                if timeout_at(deadline, self.child.wait()).await.is_err() {
                    self.expire();
                }
            }
        }

        match self.child.wait().await {
            Ok(_) if self.timed_out => EXIT_ABNORMAL,
            Ok(status) => status.code().unwrap_or(EXIT_ABNORMAL),
            Err(e) => {
                warn!("Failed to wait for {}: {}", self.program, e);
                EXIT_ABNORMAL
            }
        }
    }
}

/// Pre-recorded output. Used for spawn failures and as a fake process.
#[derive(Debug, Clone)]
pub struct ReplayStream {
    lines: VecDeque<String>,
    exit_code: i32,
}

impl ReplayStream {
    /// Lines may carry their terminators; they are stripped like real output.
    pub fn new<I, S>(lines: I, exit_code: i32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            lines: lines
                .into_iter()
                .map(|l| decode_line(l.as_ref().as_bytes()))
                .collect(),
            exit_code,
        }
    }

    pub fn from_result(result: &CommandResult) -> Self {
        let lines = result.stdout.lines().chain(result.stderr.lines());
        Self::new(lines, result.exit_code)
    }
}

#[async_trait]
impl LineStream for ReplayStream {
    async fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    async fn wait(&mut self) -> i32 {
        self.exit_code
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_line_strips_terminators() {
        assert_eq!(decode_line(b"PROGRESS:10:start\n"), "PROGRESS:10:start");
        assert_eq!(decode_line(b"dos line\r\n"), "dos line");
        assert_eq!(decode_line(b"no newline"), "no newline");
    }

    #[test]
    fn test_decode_line_substitutes_invalid_utf8() {
        let decoded = decode_line(b"bad \xff byte\n");
        assert_eq!(decoded, "bad \u{FFFD} byte");
    }

    #[test]
    fn test_spawn_failure_not_found() {
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file or directory");
        let result = CommandResult::spawn_failure("systemctl", &err);
        assert_eq!(result.exit_code, EXIT_COMMAND_NOT_FOUND);
        assert!(result.stderr.contains("not found"));
        assert!(!result.timed_out);
    }

    #[test]
    fn test_spawn_failure_other() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let result = CommandResult::spawn_failure("systemctl", &err);
        assert_eq!(result.exit_code, EXIT_ABNORMAL);
        assert!(result.stderr.contains("Failed to launch systemctl"));
    }

    #[tokio::test]
    async fn test_replay_stream() {
        let mut stream = ReplayStream::new(["one\n", "two"], 3);
        assert_eq!(stream.next_line().await.as_deref(), Some("one"));
        assert_eq!(stream.next_line().await.as_deref(), Some("two"));
        assert_eq!(stream.next_line().await, None);
        assert_eq!(stream.wait().await, 3);
    }

    #[tokio::test]
    async fn test_run_captures_stdout_and_exit_code() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]);
        let result = runner.run(&spec).await;
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout.trim(), "out");
        assert_eq!(result.stderr.trim(), "err");
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::new("icenet-definitely-missing-binary");
        let result = runner.run(&spec).await;
        assert_eq!(result.exit_code, EXIT_COMMAND_NOT_FOUND);
        assert!(result.stderr.contains("not found"));
    }
}
