use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::channel::LineChannel;
use crate::config::ServerCommand;
use crate::error::{ChannelError, LaunchError};

/// Maximum bytes per JSON-RPC message (1 MiB).
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// How the server process ended during teardown.
#[derive(Debug)]
pub enum Termination {
    /// The process had already exited before teardown began.
    AlreadyExited(ExitStatus),
    /// The process exited after stdin was closed and SIGTERM was sent.
    Graceful(ExitStatus),
    /// The process outlived the shutdown timeout and was killed.
    Killed,
}

/// A running MCP server child process with piped stdio.
///
/// The child is spawned with `kill_on_drop`, so even if [`ServerProcess::shutdown`]
/// never runs (panic, dropped future) the process does not outlive the harness.
pub struct ServerProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    shutdown_timeout: Duration,
    command: String,
}

impl ServerProcess {
    /// Launch the server. Must be called from within a tokio runtime.
    pub fn start(server: &ServerCommand, shutdown_timeout: Duration) -> Result<Self, LaunchError> {
        let shown = server.display();
        let launch_error = |source| LaunchError {
            command: shown.clone(),
            source,
        };

        let mut command = Command::new(&server.program);
        command
            .args(&server.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &server.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(launch_error)?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take().ok_or_else(|| {
            launch_error(std::io::Error::new(
                std::io::ErrorKind::Other,
                "child stdout was not captured",
            ))
        })?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        info!(command = %shown, pid = ?child.id(), "server process started");

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            shutdown_timeout,
            command: shown,
        })
    }

    /// Process ID, or `None` once the child has been reaped.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Close stdin, send SIGTERM, wait up to the shutdown timeout, then kill.
    pub async fn shutdown(mut self) -> std::io::Result<Termination> {
        // EOF on stdin is enough for most stdio servers to exit on their own.
        drop(self.stdin.take());

        if let Some(status) = self.child.try_wait()? {
            return Ok(Termination::AlreadyExited(status));
        }

        #[cfg(unix)]
        {
            if let Some(pid) = self.child.id() {
                send_sigterm(pid).await;
            }
        }

        match tokio::time::timeout(self.shutdown_timeout, self.child.wait()).await {
            Ok(status) => Ok(Termination::Graceful(status?)),
            Err(_) => {
                warn!(
                    command = %self.command,
                    timeout = ?self.shutdown_timeout,
                    "server did not exit in time, killing"
                );
                self.child.kill().await?;
                Ok(Termination::Killed)
            }
        }
    }

    async fn next_line(&mut self) -> Result<Option<String>, ChannelError> {
        let mut raw = Vec::new();
        loop {
            raw.clear();
            // One byte past the limit tells an oversized line from one that fits.
            let mut bounded = (&mut self.stdout).take(MAX_MESSAGE_BYTES as u64 + 1);
            let n = bounded.read_until(b'\n', &mut raw).await?;
            if n == 0 {
                return Ok(None);
            }

            let content = raw.strip_suffix(b"\n").unwrap_or(&raw[..]);
            if content.len() > MAX_MESSAGE_BYTES {
                return Err(ChannelError::MessageTooLarge {
                    max: MAX_MESSAGE_BYTES,
                });
            }

            let trimmed = std::str::from_utf8(content)
                .map_err(|_| ChannelError::InvalidUtf8)?
                .trim();
            if trimmed.is_empty() {
                continue;
            }
            return Ok(Some(trimmed.to_string()));
        }
    }
}

impl LineChannel for ServerProcess {
    async fn write_line(&mut self, line: &str) -> Result<(), ChannelError> {
        let stdin = self.stdin.as_mut().ok_or(ChannelError::Closed)?;
        stdin.write_all(line.as_bytes()).await.map_err(write_error)?;
        stdin.write_all(b"\n").await.map_err(write_error)?;
        stdin.flush().await.map_err(write_error)?;
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, ChannelError> {
        match tokio::time::timeout(timeout, self.next_line()).await {
            Ok(line) => line,
            Err(_) => Err(ChannelError::Timeout(timeout)),
        }
    }

    async fn terminate(self) {
        let command = self.command.clone();
        match self.shutdown().await {
            Ok(termination) => info!(%command, ?termination, "server process terminated"),
            Err(e) => warn!(%command, error = %e, "failed to terminate server process"),
        }
    }
}

/// A write to an exited child surfaces as a broken pipe.
fn write_error(e: std::io::Error) -> ChannelError {
    if e.kind() == std::io::ErrorKind::BrokenPipe {
        ChannelError::Closed
    } else {
        ChannelError::Io(e)
    }
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => debug!(target: "mcp_conformance::server_stderr", "{line}"),
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "stopped reading server stderr");
                break;
            }
        }
    }
}

#[cfg(unix)]
async fn send_sigterm(pid: u32) {
    let status = Command::new("kill")
        .arg("-TERM")
        .arg(pid.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(s) if s.success() => debug!(pid, "sent SIGTERM"),
        Ok(s) => debug!(pid, status = %s, "kill -TERM did not succeed"),
        Err(e) => warn!(pid, error = %e, "failed to send SIGTERM"),
    }
}
