//! Process Supervisor
//!
//! Launches and owns long-running external processes (the emulator, the
//! device log stream) as independently cancellable background tasks. At most
//! one live process per [`ProcessKind`] may exist at a time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::command::DeviceCommand;

/// Lines buffered between the pipe readers and the log-file sink. A full
/// buffer drops lines rather than stalling the supervised process.
const SINK_CAPACITY: usize = 1024;

/// Kind of background process the supervisor owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessKind {
    Emulator,
    Logcat,
}

impl ProcessKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProcessKind::Emulator => "emulator",
            ProcessKind::Logcat => "logcat",
        }
    }
}

/// Supervision errors
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("a {0:?} process is already running")]
    AlreadyRunning(ProcessKind),
    #[error("failed to spawn {kind:?} (`{command}`): {source}")]
    Spawn {
        kind: ProcessKind,
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Owned handle to a spawned background process
pub struct BackgroundProcess {
    kind: ProcessKind,
    child: Child,
}

impl BackgroundProcess {
    /// OS process id, if the process has not been reaped
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Liveness, observed fresh from the OS
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            debug!("{} already exited: {}", self.kind.label(), e);
        } else {
            info!("Stopped {} process", self.kind.label());
        }
    }
}

/// Process supervisor
///
/// Owned by the lifecycle orchestrator; not shared between concurrent
/// `start` calls for the same kind.
#[derive(Default)]
pub struct ProcessSupervisor {
    processes: HashMap<ProcessKind, BackgroundProcess>,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a background process of the given kind.
    ///
    /// Stdout and stderr are captured line by line into the trace log for
    /// the life of the process, and appended to `log_file` when one is
    /// given. Rejects a second start for a kind whose handle is still live;
    /// a dead handle of the same kind is replaced.
    pub async fn start(
        &mut self,
        kind: ProcessKind,
        command: DeviceCommand,
        log_file: Option<&Path>,
    ) -> Result<(), SupervisorError> {
        if let Some(existing) = self.processes.get_mut(&kind) {
            if existing.is_running() {
                return Err(SupervisorError::AlreadyRunning(kind));
            }
            self.processes.remove(&kind);
        }

        info!("Starting {}: {}", kind.label(), command);

        let mut child = Command::new(command.program())
            .args(command.argv())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                kind,
                command: command.to_string(),
                source,
            })?;

        let sink = log_file.map(|path| {
            let (tx, rx) = mpsc::channel::<String>(SINK_CAPACITY);
            spawn_file_sink(kind, path.to_path_buf(), rx);
            tx
        });

        if let Some(stdout) = child.stdout.take() {
            spawn_line_pump(kind, stdout, sink.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_pump(kind, stderr, sink);
        }

        self.processes.insert(kind, BackgroundProcess { kind, child });
        Ok(())
    }

    /// Liveness of the process of the given kind
    pub fn is_running(&mut self, kind: ProcessKind) -> bool {
        self.processes
            .get_mut(&kind)
            .map(|p| p.is_running())
            .unwrap_or(false)
    }

    /// Stop the process of the given kind.
    ///
    /// Idempotent: stopping an already-stopped or never-started kind is a
    /// no-op, so teardown paths are safe after a partial startup.
    pub async fn stop(&mut self, kind: ProcessKind) {
        match self.processes.remove(&kind) {
            Some(mut process) => process.kill().await,
            None => debug!("No {} process to stop", kind.label()),
        }
    }

    /// Forget the handle of the given kind, leaving the process running
    pub fn detach(&mut self, kind: ProcessKind) {
        if let Some(process) = self.processes.remove(&kind) {
            info!(
                "Detached {} (pid {:?}), leaving it running",
                kind.label(),
                process.id()
            );
        }
    }

    /// Stop every owned process
    pub async fn stop_all(&mut self) {
        let kinds: Vec<ProcessKind> = self.processes.keys().copied().collect();
        for kind in kinds {
            self.stop(kind).await;
        }
    }
}

fn spawn_line_pump<R>(kind: ProcessKind, stream: R, sink: Option<mpsc::Sender<String>>)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!("{}: {}", kind.label(), line);
            if let Some(ref tx) = sink {
                // best-effort: a full sink drops the line
                let _ = tx.try_send(line);
            }
        }
    });
}

fn spawn_file_sink(kind: ProcessKind, path: PathBuf, mut rx: mpsc::Receiver<String>) {
    tokio::spawn(async move {
        let mut file = match tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
        {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open {} log file {:?}: {}", kind.label(), path, e);
                while rx.recv().await.is_some() {}
                return;
            }
        };

        while let Some(line) = rx.recv().await {
            if file.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if file.write_all(b"\n").await.is_err() {
                break;
            }
        }
        let _ = file.flush().await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[cfg(unix)]
    fn long_running() -> DeviceCommand {
        DeviceCommand::new("sleep").arg("30")
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_rejects_live_duplicate() {
        let mut supervisor = ProcessSupervisor::new();
        supervisor
            .start(ProcessKind::Logcat, long_running(), None)
            .await
            .unwrap();

        let err = supervisor
            .start(ProcessKind::Logcat, long_running(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::AlreadyRunning(ProcessKind::Logcat)));

        supervisor.stop(ProcessKind::Logcat).await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut supervisor = ProcessSupervisor::new();

        // Never started: no-op
        supervisor.stop(ProcessKind::Emulator).await;

        supervisor
            .start(ProcessKind::Emulator, long_running(), None)
            .await
            .unwrap();
        assert!(supervisor.is_running(ProcessKind::Emulator));

        supervisor.stop(ProcessKind::Emulator).await;
        assert!(!supervisor.is_running(ProcessKind::Emulator));

        // Already stopped: still a no-op
        supervisor.stop(ProcessKind::Emulator).await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dead_handle_is_replaced() {
        let mut supervisor = ProcessSupervisor::new();
        let short_lived = DeviceCommand::new("sh").args(["-c", "exit 0"]);
        supervisor
            .start(ProcessKind::Logcat, short_lived, None)
            .await
            .unwrap();

        // Give the child time to exit, then a fresh start must succeed.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!supervisor.is_running(ProcessKind::Logcat));

        supervisor
            .start(ProcessKind::Logcat, long_running(), None)
            .await
            .unwrap();
        assert!(supervisor.is_running(ProcessKind::Logcat));
        supervisor.stop(ProcessKind::Logcat).await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_reaches_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("capture.log");

        let mut supervisor = ProcessSupervisor::new();
        let chatty = DeviceCommand::new("sh").args(["-c", "echo hello; echo world"]);
        supervisor
            .start(ProcessKind::Logcat, chatty, Some(&log_path))
            .await
            .unwrap();

        let mut captured = String::new();
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(40)).await;
            captured = tokio::fs::read_to_string(&log_path)
                .await
                .unwrap_or_default();
            if captured.contains("world") {
                break;
            }
        }
        assert!(captured.contains("hello"));
        assert!(captured.contains("world"));

        supervisor.stop(ProcessKind::Logcat).await;
    }
}
