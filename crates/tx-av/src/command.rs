//! Builder for executing external tool commands.
//!
//! Two execution modes exist: [`ToolCommand::execute`] captures everything
//! and treats a non-zero exit as an error (probes), while
//! [`ToolCommand::execute_streaming`] hands each output line to a callback
//! as it arrives and reports the exit status to the caller (long-running
//! recode/mux steps, which decide for themselves whether a failure is
//! fatal).

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Which output stream a streamed execution reads. Tool-dependent: the
/// extraction and merge tools report on stdout, the recode tools on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    Stdout,
    Stderr,
}

/// Output captured from a buffered tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// Result of a line-streamed tool execution.
#[derive(Debug, Clone)]
pub struct StreamedOutput {
    /// Process exit status. A non-zero status is *not* an error here; the
    /// pipeline step decides how to treat it.
    pub status: ExitStatus,
    /// Every line read from the captured stream, newline-joined.
    pub transcript: String,
}

impl StreamedOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// A builder for constructing and executing external tool invocations.
///
/// The working directory defaults to the tool's own directory, since some
/// of the legacy tools resolve auxiliary files relative to their install
/// location.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    current_dir: Option<PathBuf>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let current_dir = program
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf());
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            current_dir,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Override the working directory.
    pub fn current_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // The child must never outlive the step that spawned it.
        cmd.kill_on_drop(true);
        cmd
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - Returns [`tx_core::Error::Tool`] if the process times out, exits
    ///   with a non-zero status (message includes stderr), or fails to
    ///   spawn.
    pub async fn execute(&self) -> tx_core::Result<ToolOutput> {
        let program_name = self.program_name();
        debug!(tool = %program_name, args = ?self.args, "executing");

        let mut cmd = self.base_command();
        let child = cmd.spawn().map_err(|e| tx_core::Error::Tool {
            tool: program_name.clone(),
            message: format!("failed to spawn: {e}"),
        })?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        match result {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !output.status.success() {
                    return Err(tx_core::Error::Tool {
                        tool: program_name,
                        message: format!(
                            "exited with status {}: {}",
                            output.status,
                            tool_output.stderr.trim()
                        ),
                    });
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(tx_core::Error::Tool {
                tool: program_name,
                message: format!("I/O error waiting for process: {e}"),
            }),
            Err(_elapsed) => Err(tx_core::Error::Tool {
                tool: program_name,
                message: format!("timed out after {:?}", self.timeout),
            }),
        }
    }

    /// Execute the command, feeding each line of the chosen stream to
    /// `on_line` as it arrives.
    ///
    /// The line loop has no deadline (encodes run for hours); `timeout`
    /// bounds only the wait for process exit after the stream closes.
    /// Cancelling `cancel` kills the child and returns
    /// [`tx_core::Error::Cancelled`].
    ///
    /// A non-zero exit status is returned in [`StreamedOutput`], not as an
    /// error.
    pub async fn execute_streaming(
        &self,
        capture: Capture,
        mut on_line: impl FnMut(&str),
        cancel: &CancellationToken,
    ) -> tx_core::Result<StreamedOutput> {
        let program_name = self.program_name();
        debug!(tool = %program_name, args = ?self.args, ?capture, "executing (streamed)");

        let mut cmd = self.base_command();
        let mut child = cmd.spawn().map_err(|e| tx_core::Error::Tool {
            tool: program_name.clone(),
            message: format!("failed to spawn: {e}"),
        })?;

        let stream: Box<dyn AsyncRead + Unpin + Send> = match capture {
            Capture::Stdout => Box::new(child.stdout.take().ok_or_else(|| {
                tx_core::Error::Tool {
                    tool: program_name.clone(),
                    message: "stdout not captured".into(),
                }
            })?),
            Capture::Stderr => Box::new(child.stderr.take().ok_or_else(|| {
                tx_core::Error::Tool {
                    tool: program_name.clone(),
                    message: "stderr not captured".into(),
                }
            })?),
        };

        let mut lines = BufReader::new(stream).lines();
        let mut transcript = String::new();

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        on_line(&line);
                        transcript.push_str(&line);
                        transcript.push('\n');
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = child.kill().await;
                        return Err(tx_core::Error::Tool {
                            tool: program_name,
                            message: format!("I/O error reading output: {e}"),
                        });
                    }
                },
                _ = cancel.cancelled() => {
                    let _ = child.kill().await;
                    return Err(tx_core::Error::Cancelled);
                }
            }
        }

        let status = tokio::time::timeout(self.timeout, child.wait())
            .await
            .map_err(|_| tx_core::Error::Tool {
                tool: program_name.clone(),
                message: format!("did not exit within {:?} after closing output", self.timeout),
            })?
            .map_err(|e| tx_core::Error::Tool {
                tool: program_name,
                message: format!("I/O error waiting for process: {e}"),
            })?;

        Ok(StreamedOutput { status, transcript })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_echo() {
        // `echo` should be universally available.
        let output = ToolCommand::new("echo").arg("hello").execute().await;

        match output {
            Ok(out) => {
                assert!(out.status.success());
                assert!(out.stdout.trim().contains("hello"));
            }
            Err(_) => {
                // On some minimal environments echo may not exist; skip.
            }
        }
    }

    #[tokio::test]
    async fn execute_nonexistent_tool() {
        let result = ToolCommand::new("nonexistent_tool_xyz_12345").execute().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn timeout_fires() {
        // `sleep 10` should be killed well before 10 seconds.
        let result = ToolCommand::new("sleep")
            .arg("10")
            .timeout(Duration::from_millis(100))
            .execute()
            .await;
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("timed out"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn streaming_collects_lines() {
        let cancel = CancellationToken::new();
        let mut seen = Vec::new();
        let result = ToolCommand::new("sh")
            .arg("-c")
            .arg("echo one; echo two")
            .execute_streaming(Capture::Stdout, |line| seen.push(line.to_string()), &cancel)
            .await;

        match result {
            Ok(out) => {
                assert!(out.success());
                assert_eq!(seen, vec!["one", "two"]);
                assert_eq!(out.transcript, "one\ntwo\n");
            }
            Err(_) => {
                // Minimal environment without sh; skip.
            }
        }
    }

    #[tokio::test]
    async fn streaming_reports_nonzero_exit_as_status() {
        let cancel = CancellationToken::new();
        let result = ToolCommand::new("sh")
            .arg("-c")
            .arg("echo oops; exit 3")
            .execute_streaming(Capture::Stdout, |_| {}, &cancel)
            .await;

        if let Ok(out) = result {
            assert!(!out.success());
            assert!(out.transcript.contains("oops"));
        }
    }

    #[tokio::test]
    async fn streaming_cancellation_kills_child() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = ToolCommand::new("sleep")
            .arg("10")
            .execute_streaming(Capture::Stdout, |_| {}, &cancel)
            .await;
        assert!(matches!(result, Err(tx_core::Error::Cancelled)));
    }
}
