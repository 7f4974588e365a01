//! External tool command builder and runner.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Stderr lines kept for the failure log.
const STDERR_TAIL_LINES: usize = 20;

/// Builder for an external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Short program name for logs and errors.
    pub fn name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    pub fn build_args(&self) -> &[String] {
        &self.args
    }
}

/// Runs a [`ToolCommand`], streaming stdout line by line.
#[derive(Debug, Clone, Default)]
pub struct ToolRunner {
    timeout: Option<Duration>,
}

impl ToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the process if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run to completion, discarding stdout.
    pub async fn run(&self, cmd: &ToolCommand) -> MediaResult<ExitStatus> {
        self.run_with_lines(cmd, |_| {}).await
    }

    /// Run to completion, passing every stdout line to `on_line`.
    ///
    /// Stderr is logged, never returned. A spawn failure yields
    /// [`MediaError::SpawnFailed`]; exceeding the timeout kills the child and
    /// yields [`MediaError::Timeout`]. Any exit status is returned as-is.
    pub async fn run_with_lines<F>(&self, cmd: &ToolCommand, mut on_line: F) -> MediaResult<ExitStatus>
    where
        F: FnMut(&str),
    {
        let name = cmd.name();
        debug!("Running {}: {} {}", name, cmd.program.display(), cmd.args.join(" "));

        let mut child = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::spawn_failed(&name, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::spawn_failed(&name, pipe_error("stdout")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::spawn_failed(&name, pipe_error("stderr")))?;

        // Drain stderr concurrently so the child never blocks on a full pipe.
        let stderr_name = name.clone();
        let stderr_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            let mut tail = Vec::new();
            while let Ok(Some(line)) = reader.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                debug!(tool = %stderr_name, "{}", line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.remove(0);
                }
                tail.push(line);
            }
            tail
        });

        let status = match self.timeout {
            Some(limit) => {
                let waited =
                    tokio::time::timeout(limit, drive(&mut child, stdout, &mut on_line)).await;
                match waited {
                    Ok(result) => result?,
                    Err(_) => {
                        warn!(tool = %name, timeout = ?limit, "Tool timed out, killing process");
                        if let Err(e) = child.kill().await {
                            warn!(tool = %name, error = %e, "Failed to kill timed out process");
                        }
                        stderr_task.abort();
                        return Err(MediaError::Timeout(limit));
                    }
                }
            }
            None => drive(&mut child, stdout, &mut on_line).await?,
        };

        let tail = stderr_task.await.unwrap_or_default();
        if !status.success() {
            warn!(
                tool = %name,
                exit_code = ?status.code(),
                stderr = %tail.join("\n"),
                "Tool exited with failure"
            );
        } else {
            debug!(tool = %name, "Tool exited successfully");
        }

        Ok(status)
    }
}

/// Read stdout to EOF, then reap the child.
async fn drive<F>(child: &mut Child, stdout: ChildStdout, on_line: &mut F) -> std::io::Result<ExitStatus>
where
    F: FnMut(&str),
{
    let mut lines = BufReader::new(stdout).lines();
    while let Some(line) = lines.next_line().await? {
        on_line(&line);
    }
    child.wait().await
}

fn pipe_error(stream: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::BrokenPipe, format!("{} not captured", stream))
}
