//! Background execution of long-running external commands.
//!
//! A [`TaskHandle`] owns a child process whose stdout and stderr are drained
//! line by line into a shared [`OutputLog`]. The caller can read the log while
//! the command runs, cancel it at any time, and await a single terminal
//! [`TaskStatus`].

use crate::error::RunnerError;
use serde::Serialize;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long drain tasks may take to finish once the child is gone.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Stdout,
    Stderr,
}

/// One line of child output, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLine {
    pub stream: Stream,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Default)]
struct Progress {
    len: usize,
    closed: bool,
}

#[derive(Debug, Default)]
struct LogState {
    lines: Vec<OutputLine>,
    closed: bool,
}

#[derive(Debug)]
struct LogInner {
    state: RwLock<LogState>,
    progress: watch::Sender<Progress>,
}

/// Append-only log shared between drain tasks and readers.
///
/// Lines of one stream keep their order; interleaving between streams follows
/// arrival. Once closed, further appends are dropped.
#[derive(Debug, Clone)]
pub struct OutputLog {
    inner: Arc<LogInner>,
}

impl Default for OutputLog {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputLog {
    pub fn new() -> Self {
        let (progress, _) = watch::channel(Progress::default());
        Self {
            inner: Arc::new(LogInner {
                state: RwLock::new(LogState::default()),
                progress,
            }),
        }
    }

    async fn push(&self, stream: Stream, text: String) -> bool {
        let mut state = self.inner.state.write().await;
        if state.closed {
            return false;
        }
        state.lines.push(OutputLine { stream, text });
        self.inner.progress.send_replace(Progress {
            len: state.lines.len(),
            closed: false,
        });
        true
    }

    async fn close(&self) {
        let mut state = self.inner.state.write().await;
        state.closed = true;
        self.inner.progress.send_replace(Progress {
            len: state.lines.len(),
            closed: true,
        });
    }

    /// Number of lines appended so far.
    pub async fn len(&self) -> usize {
        self.inner.state.read().await.lines.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// True once the task has completed and no more lines will arrive.
    pub async fn is_closed(&self) -> bool {
        self.inner.state.read().await.closed
    }

    /// Copy of every line appended so far.
    pub async fn snapshot(&self) -> Vec<OutputLine> {
        self.inner.state.read().await.lines.clone()
    }

    /// Lines from position `start` onwards.
    pub async fn lines_from(&self, start: usize) -> Vec<OutputLine> {
        let state = self.inner.state.read().await;
        state.lines.get(start..).map(<[_]>::to_vec).unwrap_or_default()
    }

    /// Wait until the log holds more than `seen` lines or is closed.
    ///
    /// Returns false when the log closed without growing past `seen`.
    pub async fn wait_for_more(&self, seen: usize) -> bool {
        let mut rx = self.inner.progress.subscribe();
        let more = match rx.wait_for(|p| p.len > seen || p.closed).await {
            Ok(progress) => progress.len > seen,
            Err(_) => false,
        };
        more
    }
}

/// Terminal state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// The child exited on its own.
    Exited(ExitStatus),
    /// The task was cancelled and the child killed.
    Cancelled,
}

impl TaskStatus {
    /// True for a zero exit status.
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited(status) if status.success())
    }
}

/// Spawns commands as cancellable background tasks.
#[derive(Debug, Clone)]
pub struct TaskRunner {
    drain_timeout: Duration,
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRunner {
    pub fn new() -> Self {
        Self {
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// Override the bound on waiting for output pipes after exit or cancel.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Start `command` with `args`. Must be called inside a tokio runtime.
    pub fn run(&self, command: &str, args: &[String]) -> Result<TaskHandle, RunnerError> {
        let command_line = std::iter::once(command)
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                command: command_line.clone(),
                source,
            })?;

        info!(command = %command_line, pid = ?child.id(), "Started task");

        let log = OutputLog::new();
        let mut drains = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            drains.push(tokio::spawn(drain(stdout, Stream::Stdout, log.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            drains.push(tokio::spawn(drain(stderr, Stream::Stderr, log.clone())));
        }

        let cancel = CancellationToken::new();
        let supervisor = tokio::spawn(supervise(Supervised {
            command: command_line.clone(),
            child,
            drains,
            log: log.clone(),
            cancel: cancel.clone(),
            drain_timeout: self.drain_timeout,
        }));

        Ok(TaskHandle {
            command: command_line,
            log,
            cancel,
            supervisor,
        })
    }
}

/// Start `command` with the default drain timeout.
pub fn run(command: &str, args: &[String]) -> Result<TaskHandle, RunnerError> {
    TaskRunner::new().run(command, args)
}

/// A running (or finished) background command.
#[derive(Debug)]
pub struct TaskHandle {
    command: String,
    log: OutputLog,
    cancel: CancellationToken,
    supervisor: JoinHandle<Result<TaskStatus, RunnerError>>,
}

impl TaskHandle {
    /// The command line being run.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn log(&self) -> &OutputLog {
        &self.log
    }

    /// Request termination. Has no effect once the task has finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this task, for wiring to signal handlers.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.supervisor.is_finished()
    }

    /// Wait for the terminal status. The log is closed by the time this returns.
    pub async fn wait(self) -> Result<TaskStatus, RunnerError> {
        self.supervisor
            .await
            .map_err(|e| RunnerError::Join(e.to_string()))?
    }
}

struct Supervised {
    command: String,
    child: Child,
    drains: Vec<JoinHandle<()>>,
    log: OutputLog,
    cancel: CancellationToken,
    drain_timeout: Duration,
}

async fn supervise(task: Supervised) -> Result<TaskStatus, RunnerError> {
    let Supervised {
        command,
        mut child,
        mut drains,
        log,
        cancel,
        drain_timeout,
    } = task;

    // A child that already exited reports its real status even if cancelled.
    let status = tokio::select! {
        biased;
        result = child.wait() => result
            .map(TaskStatus::Exited)
            .map_err(|source| RunnerError::Wait {
                command: command.clone(),
                source,
            }),
        () = cancel.cancelled() => {
            info!(command = %command, "Cancelling task");
            if let Err(e) = child.start_kill() {
                warn!("Failed to signal {}: {}", command, e);
            }
            if tokio::time::timeout(drain_timeout, child.wait()).await.is_err() {
                warn!(command = %command, "Child did not exit after kill");
            }
            Ok(TaskStatus::Cancelled)
        }
    };

    let drained = tokio::time::timeout(drain_timeout, async {
        for drain in drains.iter_mut() {
            let _ = drain.await;
        }
    })
    .await;
    if drained.is_err() {
        warn!(
            command = %command,
            timeout_ms = drain_timeout.as_millis() as u64,
            "Output drains did not finish, abandoning them"
        );
        for drain in &drains {
            drain.abort();
        }
    }

    log.close().await;
    match &status {
        Ok(s) => info!(command = %command, status = ?s, "Task finished"),
        Err(e) => warn!(command = %command, "Task failed: {}", e),
    }
    status
}

async fn drain<R>(reader: R, stream: Stream, log: OutputLog)
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(reader).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(mut bytes)) => {
                if bytes.last() == Some(&b'\r') {
                    bytes.pop();
                }
                let text = String::from_utf8_lossy(&bytes).into_owned();
                if !log.push(stream, text).await {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!(stream = ?stream, "Stopped reading output: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    fn texts(lines: &[OutputLine], stream: Stream) -> Vec<&str> {
        lines
            .iter()
            .filter(|l| l.stream == stream)
            .map(|l| l.text.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_collects_both_streams_in_order() {
        let handle = run("sh", &sh("echo one; echo two; echo oops >&2; echo three")).unwrap();
        let log = handle.log().clone();

        let status = handle.wait().await.unwrap();
        assert!(status.success());

        let lines = log.snapshot().await;
        assert_eq!(texts(&lines, Stream::Stdout), ["one", "two", "three"]);
        assert_eq!(texts(&lines, Stream::Stderr), ["oops"]);
        assert!(log.is_closed().await);
    }

    #[tokio::test]
    async fn test_command_line_joins_args() {
        let handle = run("sh", &sh("exit 0")).unwrap();
        assert_eq!(handle.command(), "sh -c exit 0");
        assert!(handle.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn test_cancel_after_exit_keeps_exit_status() {
        let handle = run("sh", &sh("exit 4")).unwrap();
        // Block the runtime so the supervisor first sees both the exit and the cancel.
        std::thread::sleep(Duration::from_millis(300));
        handle.cancel();
        match handle.wait().await.unwrap() {
            TaskStatus::Exited(status) => assert_eq!(status.code(), Some(4)),
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reports_exit_code() {
        let handle = run("sh", &sh("exit 3")).unwrap();
        match handle.wait().await.unwrap() {
            TaskStatus::Exited(status) => assert_eq!(status.code(), Some(3)),
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_log_is_readable_while_running() {
        let handle = run("sh", &sh("echo first; exec sleep 30")).unwrap();

        assert!(handle.log().wait_for_more(0).await);
        assert_eq!(handle.log().lines_from(0).await[0].text, "first");
        assert!(!handle.is_finished());

        handle.cancel();
        assert_eq!(handle.wait().await.unwrap(), TaskStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_is_bounded_by_drain_timeout() {
        // The backgrounded sleep keeps stdout open after sh is killed.
        let runner = TaskRunner::new().with_drain_timeout(Duration::from_millis(200));
        let handle = runner
            .run("sh", &sh("sleep 5 & echo started; wait"))
            .unwrap();
        assert!(handle.log().wait_for_more(0).await);

        let started = Instant::now();
        handle.cancel();
        let log = handle.log().clone();
        assert_eq!(handle.wait().await.unwrap(), TaskStatus::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(log.is_closed().await);
    }

    #[tokio::test]
    async fn test_no_lines_after_completion() {
        let handle = run("sh", &sh("echo done")).unwrap();
        let log = handle.log().clone();
        handle.wait().await.unwrap();

        let len = log.len().await;
        assert!(!log.push(Stream::Stdout, "late".to_string()).await);
        assert_eq!(log.len().await, len);
        assert!(!log.wait_for_more(len).await);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let err = run("/nonexistent/snapback-test-binary", &[]).unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { .. }));
    }

    #[test]
    fn test_cancelled_is_not_success() {
        assert!(!TaskStatus::Cancelled.success());
    }
}
