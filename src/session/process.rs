//! Flutter process management
//!
//! Owns one spawned `flutter run` child. The `Child` handle is moved into a
//! dedicated `wait_for_exit` background task that calls `child.wait()`, so
//! the real exit code is captured and emitted as
//! `ProcessEvent::Exited { code: Some(N) }` rather than always `None`.

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

use crate::events::ProcessEvent;
use crate::prelude::*;
use crate::project::MANIFEST_FILENAME;

/// External toolchain binary
const FLUTTER_BIN: &str = "flutter";

/// Handle to a live `flutter run` process.
///
/// Retains a kill channel to request a force-kill and an atomic flag for
/// synchronous `has_exited()` checks; the child itself lives in the wait
/// task.
pub struct RunProcess {
    /// Sender for stdin directives
    stdin_tx: mpsc::Sender<String>,
    /// Process ID for logging
    pid: Option<u32>,
    /// One-shot sender that tells the wait task to force-kill the process.
    /// Consumed on first use (or on drop).
    kill_tx: Option<oneshot::Sender<()>>,
    /// Set to `true` by the wait task once the child has exited
    exited: Arc<AtomicBool>,
}

impl RunProcess {
    /// Spawn `flutter` with pre-built arguments in the project directory.
    ///
    /// The caller builds the complete argument list (`run`, `-t`, `-d`,
    /// flags); arguments are passed as a discrete list, no shell.
    pub fn spawn(
        project_path: &Path,
        args: &[String],
        event_tx: mpsc::Sender<ProcessEvent>,
    ) -> Result<Self> {
        let manifest = project_path.join(MANIFEST_FILENAME);
        if !manifest.exists() {
            return Err(Error::NoProject {
                path: project_path.to_path_buf(),
            });
        }

        info!("Spawning Flutter: flutter {}", args.join(" "));

        let mut child = Command::new(FLUTTER_BIN)
            .args(args)
            .current_dir(project_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::FlutterNotFound
                } else {
                    Error::ProcessSpawn {
                        reason: e.to_string(),
                    }
                }
            })?;

        let pid = child.id();
        info!("Flutter process started with PID: {:?}", pid);

        let stdin = child.stdin.take().expect("stdin was configured");
        let (stdin_tx, stdin_rx) = mpsc::channel::<String>(32);
        tokio::spawn(Self::stdin_writer(stdin, stdin_rx));

        let stdout = child.stdout.take().expect("stdout was configured");
        tokio::spawn(Self::stdout_reader(stdout, event_tx.clone()));

        let stderr = child.stderr.take().expect("stderr was configured");
        tokio::spawn(Self::stderr_reader(stderr, event_tx.clone()));

        let exited = Arc::new(AtomicBool::new(false));
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        // The wait task takes ownership of `child`
        tokio::spawn(Self::wait_for_exit(
            child,
            kill_rx,
            event_tx,
            Arc::clone(&exited),
        ));

        Ok(Self {
            stdin_tx,
            pid,
            kill_tx: Some(kill_tx),
            exited,
        })
    }

    /// Background task: owns `child`, waits for exit, emits `Exited`.
    ///
    /// Two ways the task can end: the process exits naturally, or `kill_rx`
    /// fires and we kill the child first, then wait for it.
    async fn wait_for_exit(
        mut child: Child,
        kill_rx: oneshot::Receiver<()>,
        event_tx: mpsc::Sender<ProcessEvent>,
        exited: Arc<AtomicBool>,
    ) {
        let code: Option<i32> = tokio::select! {
            result = child.wait() => {
                match result {
                    Ok(status) => {
                        info!("Flutter process exited with status: {:?}", status);
                        status.code()
                    }
                    Err(e) => {
                        error!("Error waiting for Flutter process: {}", e);
                        None
                    }
                }
            }
            _ = kill_rx => {
                info!("Kill signal received, terminating Flutter process");
                if let Err(e) = child.kill().await {
                    error!("Failed to kill Flutter process: {}", e);
                }
                match child.wait().await {
                    Ok(status) => status.code(),
                    Err(e) => {
                        error!("Error waiting after kill: {}", e);
                        None
                    }
                }
            }
        };

        // Mark exited before emitting the event so `has_exited()` is true
        // by the time callers observe it.
        exited.store(true, Ordering::Release);

        debug!("Sending ProcessEvent::Exited {{ code: {:?} }}", code);
        let _ = event_tx.send(ProcessEvent::Exited { code }).await;
    }

    /// Read lines from stdout and send as `ProcessEvent::Stdout`.
    ///
    /// Does NOT emit `Exited`; that is the wait task's job.
    async fn stdout_reader(stdout: tokio::process::ChildStdout, tx: mpsc::Sender<ProcessEvent>) {
        let mut reader = BufReader::new(stdout).lines();

        while let Ok(Some(line)) = reader.next_line().await {
            trace!("stdout: {}", line);
            if tx.send(ProcessEvent::Stdout(line)).await.is_err() {
                debug!("stdout channel closed");
                break;
            }
        }

        debug!("stdout reader finished");
    }

    /// Read lines from stderr and send as `ProcessEvent::Stderr`
    async fn stderr_reader(stderr: tokio::process::ChildStderr, tx: mpsc::Sender<ProcessEvent>) {
        let mut reader = BufReader::new(stderr).lines();

        while let Ok(Some(line)) = reader.next_line().await {
            trace!("stderr: {}", line);
            if tx.send(ProcessEvent::Stderr(line)).await.is_err() {
                debug!("stderr channel closed");
                break;
            }
        }

        debug!("stderr reader finished");
    }

    /// Write directives to stdin, newline-terminated
    async fn stdin_writer(mut stdin: tokio::process::ChildStdin, mut rx: mpsc::Receiver<String>) {
        while let Some(directive) = rx.recv().await {
            debug!("Writing directive: {:?}", directive);

            if let Err(e) = stdin.write_all(directive.as_bytes()).await {
                error!("Failed to write to stdin: {}", e);
                break;
            }
            if let Err(e) = stdin.write_all(b"\n").await {
                error!("Failed to write newline: {}", e);
                break;
            }
            if let Err(e) = stdin.flush().await {
                error!("Failed to flush stdin: {}", e);
                break;
            }
        }

        debug!("stdin writer finished");
    }

    /// Send a single directive to the process's input stream
    pub async fn send(&self, directive: &str) -> Result<()> {
        self.stdin_tx
            .send(directive.to_string())
            .await
            .map_err(|_| Error::channel_send("stdin channel closed"))
    }

    /// Signal the wait task to kill the process.
    ///
    /// The wait task calls `child.kill()` and then `child.wait()`, so the
    /// OS reaps the process before `Exited` is emitted.
    pub fn kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            // Send error just means the wait task already finished
            let _ = tx.send(());
        }
    }

    /// Non-blocking check backed by the atomic set by the wait task
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        !self.has_exited()
    }

    pub fn id(&self) -> Option<u32> {
        self.pid
    }
}

impl Drop for RunProcess {
    fn drop(&mut self) {
        if !self.has_exited() {
            warn!("RunProcess dropped while process may still be running");
            if let Some(tx) = self.kill_tx.take() {
                let _ = tx.send(());
            }
        }
        // kill_on_drop(true) on the Child is the final safety net
        debug!("RunProcess dropped");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Spawn real short-lived `sh` children through the internal machinery

    use super::*;

    /// Stand-in for a Flutter process: `sh -c <script>` wired through the
    /// same reader/writer/wait tasks.
    pub(crate) fn spawn_sh(script: &str, event_tx: mpsc::Sender<ProcessEvent>) -> RunProcess {
        let mut child = Command::new("sh")
            .args(["-c", script])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .expect("sh must be available in test environment");

        let pid = child.id();

        let stdin = child.stdin.take().expect("stdin");
        let (stdin_tx, stdin_rx) = mpsc::channel::<String>(4);
        tokio::spawn(RunProcess::stdin_writer(stdin, stdin_rx));

        let stdout = child.stdout.take().expect("stdout");
        tokio::spawn(RunProcess::stdout_reader(stdout, event_tx.clone()));

        let stderr = child.stderr.take().expect("stderr");
        tokio::spawn(RunProcess::stderr_reader(stderr, event_tx.clone()));

        let exited = Arc::new(AtomicBool::new(false));
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        tokio::spawn(RunProcess::wait_for_exit(
            child,
            kill_rx,
            event_tx,
            Arc::clone(&exited),
        ));

        RunProcess {
            stdin_tx,
            pid,
            kill_tx: Some(kill_tx),
            exited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::spawn_sh;
    use super::*;

    #[tokio::test]
    async fn test_spawn_no_project() {
        let (tx, _rx) = mpsc::channel(16);
        let result = RunProcess::spawn(Path::new("/nonexistent/path"), &["run".to_string()], tx);

        assert!(matches!(result, Err(Error::NoProject { .. })));
    }

    #[tokio::test]
    async fn test_exit_code_captured_on_normal_exit() {
        let (tx, mut rx) = mpsc::channel(16);
        let _process = spawn_sh("exit 0", tx);

        let mut found = false;
        for _ in 0..50 {
            match tokio::time::timeout(std::time::Duration::from_millis(100), rx.recv()).await {
                Ok(Some(ProcessEvent::Exited { code })) => {
                    assert_eq!(code, Some(0), "expected exit code 0, got {:?}", code);
                    found = true;
                    break;
                }
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(_) => break,
            }
        }
        assert!(found, "ProcessEvent::Exited was not received");
    }

    #[tokio::test]
    async fn test_exit_code_captured_on_error_exit() {
        let (tx, mut rx) = mpsc::channel(16);
        let _process = spawn_sh("exit 42", tx);

        let mut found = false;
        for _ in 0..50 {
            match tokio::time::timeout(std::time::Duration::from_millis(100), rx.recv()).await {
                Ok(Some(ProcessEvent::Exited { code })) => {
                    assert_eq!(code, Some(42), "expected exit code 42, got {:?}", code);
                    found = true;
                    break;
                }
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(_) => break,
            }
        }
        assert!(found, "ProcessEvent::Exited was not received");
    }

    #[tokio::test]
    async fn test_stdout_lines_forwarded() {
        let (tx, mut rx) = mpsc::channel(16);
        let _process = spawn_sh("echo hello; echo world", tx);

        let mut lines = Vec::new();
        for _ in 0..50 {
            match tokio::time::timeout(std::time::Duration::from_millis(100), rx.recv()).await {
                Ok(Some(ProcessEvent::Stdout(line))) => lines.push(line),
                Ok(Some(ProcessEvent::Exited { .. })) => break,
                Ok(Some(_)) => continue,
                _ => break,
            }
        }
        assert_eq!(lines, vec!["hello", "world"]);
    }

    #[tokio::test]
    async fn test_has_exited_becomes_true_after_exit() {
        let (tx, mut rx) = mpsc::channel(16);
        let process = spawn_sh("exit 0", tx);

        loop {
            match tokio::time::timeout(std::time::Duration::from_millis(200), rx.recv()).await {
                Ok(Some(ProcessEvent::Exited { .. })) => break,
                Ok(Some(_)) => continue,
                _ => panic!("did not receive Exited event in time"),
            }
        }

        assert!(process.has_exited());
        assert!(!process.is_running());
    }

    #[tokio::test]
    async fn test_kill_terminates_long_running_process() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut process = spawn_sh("sleep 60", tx);

        assert!(!process.has_exited());
        process.kill();

        let mut got_exited = false;
        for _ in 0..30 {
            match tokio::time::timeout(std::time::Duration::from_millis(100), rx.recv()).await {
                Ok(Some(ProcessEvent::Exited { .. })) => {
                    got_exited = true;
                    break;
                }
                Ok(Some(_)) => continue,
                _ => break,
            }
        }
        assert!(got_exited, "ProcessEvent::Exited should follow kill()");
    }

    #[tokio::test]
    async fn test_send_writes_directive_to_stdin() {
        let (tx, mut rx) = mpsc::channel(16);
        // `cat` echoes stdin back to stdout
        let process = spawn_sh("cat", tx);

        process.send("r").await.expect("send should succeed");

        let mut echoed = false;
        for _ in 0..50 {
            match tokio::time::timeout(std::time::Duration::from_millis(100), rx.recv()).await {
                Ok(Some(ProcessEvent::Stdout(line))) => {
                    assert_eq!(line, "r");
                    echoed = true;
                    break;
                }
                Ok(Some(_)) => continue,
                _ => break,
            }
        }
        assert!(echoed, "directive was not written to stdin");
    }
}
